//! This module contains the formal parameter table of a task and the rules for
//! binding invocation arguments against it.

use std::collections::BTreeMap;

use crate::{
    error::execution::{Error, Result},
    task::Value,
};

/// The formal parameters of a task, built once when the task is defined.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Params {
    /// Required parameters, bound by position or by keyword.
    positional: Vec<String>,

    /// The parameter that collects positional arguments beyond `positional`.
    variadic: Option<String>,

    /// Parameters that may only be bound by keyword, with their defaults.
    keyword: Vec<(String, Option<Value>)>,

    /// The parameter that collects keyword arguments matching no other
    /// parameter.
    catch_all: Option<String>,
}

impl Params {
    /// Constructs an empty parameter table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required positional parameter named `name`.
    #[must_use]
    pub fn positional(mut self, name: impl Into<String>) -> Self {
        self.positional.push(name.into());
        self
    }

    /// Collects excess positional arguments into a list bound to `name`.
    #[must_use]
    pub fn variadic(mut self, name: impl Into<String>) -> Self {
        self.variadic = Some(name.into());
        self
    }

    /// Adds a keyword-only parameter named `name`, which is required if it has
    /// no `default`.
    #[must_use]
    pub fn keyword(mut self, name: impl Into<String>, default: Option<Value>) -> Self {
        self.keyword.push((name.into(), default));
        self
    }

    /// Collects unmatched keyword arguments into a map bound to `name`.
    #[must_use]
    pub fn catch_all(mut self, name: impl Into<String>) -> Self {
        self.catch_all = Some(name.into());
        self
    }

    /// Gets the number of required positional parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.positional.len()
    }

    /// Binds `args` to the parameters of the task named `task`, producing the
    /// initial locals of an execution of that task.
    ///
    /// Positional parameters are filled in order and then by keyword. Excess
    /// positional arguments go to the variadic parameter, keyword-only
    /// parameters take their keyword argument or default, and any remaining
    /// keyword arguments go to the catch-all parameter. A declared variadic or
    /// catch-all parameter is always bound, possibly to an empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the arguments cannot be bound.
    pub fn bind(&self, task: &str, args: &Arguments) -> Result<BTreeMap<String, Value>> {
        let mut locals = BTreeMap::new();
        let mut keywords = args.keyword.clone();

        for (ix, name) in self.positional.iter().enumerate() {
            let value = match (args.positional.get(ix), keywords.remove(name)) {
                (Some(_), Some(_)) => {
                    return Err(Error::DuplicateArgument {
                        task:      task.into(),
                        parameter: name.clone(),
                    })
                }
                (Some(value), None) => value.clone(),
                (None, Some(value)) => value,
                (None, None) => {
                    return Err(Error::MissingArgument {
                        task:      task.into(),
                        parameter: name.clone(),
                    })
                }
            };
            locals.insert(name.clone(), value);
        }

        let extra = args
            .positional
            .get(self.positional.len()..)
            .unwrap_or_default();
        match &self.variadic {
            Some(name) => {
                locals.insert(name.clone(), Value::List(extra.to_vec()));
            }
            None if !extra.is_empty() => {
                return Err(Error::TooManyArguments {
                    task:     task.into(),
                    expected: self.positional.len(),
                    given:    args.positional.len(),
                });
            }
            None => (),
        }

        for (name, default) in &self.keyword {
            let value = keywords.remove(name).or_else(|| default.clone()).ok_or_else(|| {
                Error::MissingArgument {
                    task:      task.into(),
                    parameter: name.clone(),
                }
            })?;
            locals.insert(name.clone(), value);
        }

        match &self.catch_all {
            Some(name) => {
                locals.insert(name.clone(), Value::Map(keywords));
            }
            None => {
                if let Some(keyword) = keywords.into_keys().next() {
                    return Err(Error::UnexpectedKeyword {
                        task: task.into(),
                        keyword,
                    });
                }
            }
        }

        Ok(locals)
    }
}

/// The concrete arguments of one task invocation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Arguments {
    pub positional: Vec<Value>,
    pub keyword:    BTreeMap<String, Value>,
}

impl Arguments {
    /// Constructs an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` as the next positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Passes `value` as the keyword argument `name`.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Checks if there are no arguments at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}
