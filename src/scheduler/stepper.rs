//! This module contains the stepper, which advances a single execution state
//! by exactly one statement.

use std::rc::Rc;

use tracing::trace;

use crate::{
    error::execution::Result,
    scheduler::context::TaskContext,
    task::Statement,
};

/// What a single step did to the execution state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StepOutcome {
    /// The invocation arguments were bound.
    Bound,

    /// One statement was executed and the state may continue.
    Executed,

    /// The state finished, either by returning or by running off the end of
    /// its statements.
    Finished,

    /// The state had already finished, so nothing happened.
    Idle,
}

/// Steps the execution state of `ctx` once.
///
/// Binding the arguments of an unbound state counts as a step. Otherwise the
/// statement at the program counter is executed, and the program counter
/// moves on even if that statement left the state blocked.
///
/// # Errors
///
/// Returns [`Err`] if binding fails or the statement returns an error. The
/// program counter does not move in that case.
pub fn step(ctx: &mut TaskContext<'_>) -> Result<StepOutcome> {
    let state = ctx.state_mut();
    if state.is_finished() {
        return Ok(StepOutcome::Idle);
    }
    let Some(pc) = state.statement_index() else {
        state.bind_arguments()?;
        return Ok(StepOutcome::Bound);
    };

    let task = Rc::clone(state.task());
    trace!(state = %state.id(), task = task.name(), pc, "step");
    match task.get(pc) {
        None => {
            state.finish(None);
            Ok(StepOutcome::Finished)
        }
        Some(Statement::Return(body)) => {
            let value = body(ctx)?;
            ctx.state_mut().finish(Some(value));
            Ok(StepOutcome::Finished)
        }
        Some(Statement::Exec(body)) => {
            body(ctx)?;
            ctx.state_mut().advance();
            Ok(StepOutcome::Executed)
        }
    }
}
