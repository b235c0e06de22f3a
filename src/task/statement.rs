//! This module contains the [`Statement`]s that make up the body of a task.

use derivative::Derivative;

use crate::{error::execution::Result, scheduler::context::TaskContext, task::Value};

/// The signature of a statement that runs for its effects.
pub type ExecBody = dyn Fn(&mut TaskContext<'_>) -> Result<()>;

/// The signature of a statement that produces the task's return value.
pub type ReturnBody = dyn Fn(&mut TaskContext<'_>) -> Result<Value>;

/// A single, position-addressed, statement of a task.
///
/// The stepper executes exactly one statement each time it steps an execution
/// state. Any wait primitive called by the body takes effect once the
/// statement completes.
#[derive(Derivative)]
#[derivative(Debug)]
pub enum Statement {
    /// Runs the body against the task context for its effects.
    Exec(#[derivative(Debug = "ignore")] Box<ExecBody>),

    /// Evaluates the body and finishes the task with the result as its return
    /// value.
    Return(#[derivative(Debug = "ignore")] Box<ReturnBody>),
}

impl Statement {
    /// Constructs a statement that runs `body` for its effects.
    pub fn exec(body: impl Fn(&mut TaskContext<'_>) -> Result<()> + 'static) -> Self {
        Self::Exec(Box::new(body))
    }

    /// Constructs a statement that returns the result of `body`.
    pub fn ret(body: impl Fn(&mut TaskContext<'_>) -> Result<Value> + 'static) -> Self {
        Self::Return(Box::new(body))
    }

    /// Checks if this statement finishes the task.
    #[must_use]
    pub fn is_return(&self) -> bool {
        matches!(self, Self::Return(_))
    }
}
