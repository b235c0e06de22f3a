//! This module contains the definitions of verification tasks: their
//! parameters, their statements, and the values they manipulate.
//!
//! A [`TaskDefinition`] is immutable once it is registered with the
//! [`crate::scheduler::Scheduler`], and is shared by every execution state
//! that is built from it.

pub mod params;
pub mod statement;
pub mod value;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub use crate::task::{
    params::{Arguments, Params},
    statement::Statement,
    value::Value,
};
use crate::{error::execution::Result, scheduler::context::TaskContext};

/// A handle to a task definition registered with the scheduler.
#[derive(
    Copy, Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct TaskId(u32);

impl TaskId {
    /// Constructs a task handle from the raw registry `index`.
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Gets the position of the task in the registry.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task #{}", self.0)
    }
}

/// A named, parameterized, sequence of statements.
#[derive(Debug)]
pub struct TaskDefinition {
    name:       String,
    params:     Params,
    statements: Vec<Statement>,
}

impl TaskDefinition {
    /// Constructs a new task named `name` that takes no parameters and has no
    /// statements.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name:       name.into(),
            params:     Params::default(),
            statements: Vec::new(),
        }
    }

    /// Sets the formal parameters of the task.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Appends a statement that runs `body` for its effects.
    #[must_use]
    pub fn exec(mut self, body: impl Fn(&mut TaskContext<'_>) -> Result<()> + 'static) -> Self {
        self.statements.push(Statement::exec(body));
        self
    }

    /// Appends a statement that finishes the task, returning the result of
    /// `body`.
    #[must_use]
    pub fn returns(
        mut self,
        body: impl Fn(&mut TaskContext<'_>) -> Result<Value> + 'static,
    ) -> Self {
        self.statements.push(Statement::ret(body));
        self
    }

    /// Appends an already-constructed `statement`.
    #[must_use]
    pub fn statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Gets the statement at position `pc`, if there is one.
    #[must_use]
    pub fn get(&self, pc: usize) -> Option<&Statement> {
        self.statements.get(pc)
    }

    /// Gets the number of statements in the task.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
