//! This module contains the [`Value`] type that task bodies bind to their
//! locals, pass as arguments, and return.

use std::{collections::BTreeMap, fmt::Display};

use itertools::Itertools;

use crate::{
    error::execution::{Error, Result},
    scheduler::state::StateId,
    task::TaskId,
    term::Term,
};

/// A runtime value manipulated by a task.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Value {
    /// The absence of a value.
    #[default]
    Unit,

    Bool(bool),

    Int(i64),

    Str(String),

    /// A symbolic or concrete bit-vector term.
    Term(Term),

    /// A handle to an execution state, as returned by invoking a task.
    State(StateId),

    /// A handle to a registered task definition.
    Task(TaskId),

    List(Vec<Value>),

    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Gets a name for the kind of the value, for use in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "str",
            Self::Term(_) => "term",
            Self::State(_) => "state handle",
            Self::Task(_) => "task handle",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Gets the value as a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is not a [`Value::Bool`].
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(self.mismatch("bool")),
        }
    }

    /// Gets the value as an integer.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is not a [`Value::Int`].
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(i) => Ok(*i),
            _ => Err(self.mismatch("int")),
        }
    }

    /// Gets the value as a string slice.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is not a [`Value::Str`].
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Self::Str(s) => Ok(s.as_str()),
            _ => Err(self.mismatch("str")),
        }
    }

    /// Gets the value as a term.
    ///
    /// Booleans convert to one-bit constants.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is neither a [`Value::Term`] nor a
    /// [`Value::Bool`].
    pub fn as_term(&self) -> Result<Term> {
        match self {
            Self::Term(t) => Ok(t.clone()),
            Self::Bool(b) => Ok(Term::bool(*b)),
            _ => Err(self.mismatch("term")),
        }
    }

    /// Gets the value as an execution state handle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is not a [`Value::State`].
    pub fn as_state(&self) -> Result<StateId> {
        match self {
            Self::State(id) => Ok(*id),
            _ => Err(self.mismatch("state handle")),
        }
    }

    /// Gets the value as a task handle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is not a [`Value::Task`].
    pub fn as_task(&self) -> Result<TaskId> {
        match self {
            Self::Task(id) => Ok(*id),
            _ => Err(self.mismatch("task handle")),
        }
    }

    /// Gets the value as a list.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is not a [`Value::List`].
    pub fn as_list(&self) -> Result<&[Value]> {
        match self {
            Self::List(items) => Ok(items.as_slice()),
            _ => Err(self.mismatch("list")),
        }
    }

    /// Gets the value as a map.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is not a [`Value::Map`].
    pub fn as_map(&self) -> Result<&BTreeMap<String, Value>> {
        match self {
            Self::Map(entries) => Ok(entries),
            _ => Err(self.mismatch("map")),
        }
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unit => write!(f, "()"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Term(t) => write!(f, "{t}"),
            Self::State(id) => write!(f, "{id}"),
            Self::Task(id) => write!(f, "{id}"),
            Self::List(items) => write!(f, "[{}]", items.iter().join(", ")),
            Self::Map(entries) => write!(
                f,
                "{{{}}}",
                entries.iter().map(|(k, v)| format!("{k}: {v}")).join(", ")
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Term> for Value {
    fn from(value: Term) -> Self {
        Self::Term(value)
    }
}

impl From<StateId> for Value {
    fn from(value: StateId) -> Self {
        Self::State(value)
    }
}

impl From<TaskId> for Value {
    fn from(value: TaskId) -> Self {
        Self::Task(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

#[cfg(test)]
mod test {
    use crate::{error::execution::Error, task::Value, term::Term};

    #[test]
    fn accessors_report_mismatched_kinds() {
        let value = Value::Int(3);

        assert_eq!(value.as_int(), Ok(3));
        assert_eq!(
            value.as_str(),
            Err(Error::TypeMismatch {
                expected: "str",
                found:    "int",
            })
        );
    }

    #[test]
    fn booleans_convert_to_terms() {
        assert_eq!(Value::Bool(true).as_term(), Ok(Term::bool(true)));
    }

    #[test]
    fn displays_nested_values() {
        let value = Value::List(vec![Value::Int(1), Value::from("a"), Value::Unit]);

        assert_eq!(value.to_string(), r#"[1, "a", ()]"#);
    }
}
