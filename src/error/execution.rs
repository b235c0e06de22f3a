//! This module contains errors pertaining to the scheduling and execution of
//! verification tasks.

use itertools::Itertools;
use thiserror::Error;

use crate::{
    error::{container, simulation, solver},
    scheduler::state::StateId,
    task::TaskId,
    term::Term,
};

/// Errors that occur during the execution of tasks by the
/// [`crate::scheduler::Scheduler`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Task `{task}` takes {expected} positional arguments but {given} were given")]
    TooManyArguments {
        task:     String,
        expected: usize,
        given:    usize,
    },

    #[error("Task `{task}` is missing an argument for the parameter `{parameter}`")]
    MissingArgument { task: String, parameter: String },

    #[error("Task `{task}` got multiple values for the parameter `{parameter}`")]
    DuplicateArgument { task: String, parameter: String },

    #[error("Task `{task}` got the unexpected keyword argument `{keyword}`")]
    UnexpectedKeyword { task: String, keyword: String },

    #[error("No task is registered as {task}")]
    UnknownTask { task: TaskId },

    #[error("The handle {state} does not refer to an execution state")]
    DanglingHandle { state: StateId },

    #[error("An execution state cannot wait on its own completion")]
    SelfDependency,

    #[error("Cannot wait for {requested} cycles, as the count must be positive")]
    InvalidCycleCount { requested: usize },

    #[error("A wait condition must be one bit wide, but `{expr}` is {width} bits wide")]
    NotACondition { expr: Term, width: u32 },

    #[error("Expected a value of kind {expected} but found {found}")]
    TypeMismatch {
        expected: &'static str,
        found:    &'static str,
    },

    #[error("No local variable named `{name}` exists")]
    NoSuchLocal { name: String },

    #[error(
        "The condition `{condition}` can be neither true nor false under the path condition [{}]",
        .path.iter().join(", ")
    )]
    ModelContradiction { condition: Term, path: Vec<Term> },

    #[error(
        "The assertion `{expr}` has a counterexample under the path condition [{}]",
        .path.iter().join(", ")
    )]
    AssertionFailure { expr: Term, path: Vec<Term> },

    #[error("The primitive `{name}` is not implemented")]
    UnimplementedPrimitive { name: String },

    #[error("There is no constraint at position {index}, as only {count} are set")]
    NoSuchConstraint { index: usize, count: usize },

    #[error("Forking would exceed the limit of {limit} execution states")]
    StateLimitExceeded { limit: usize },

    #[error("Execution was stopped by the watchdog")]
    StoppedByWatchdog,

    #[error(transparent)]
    Simulation(#[from] simulation::Error),

    #[error(transparent)]
    Solver(#[from] solver::Error),
}

impl Error {
    /// Checks whether the error is a configuration error, namely one that
    /// stems from how the tasks were set up rather than from running them.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::TooManyArguments { .. }
                | Self::MissingArgument { .. }
                | Self::DuplicateArgument { .. }
                | Self::UnexpectedKeyword { .. }
                | Self::UnknownTask { .. }
        )
    }

    /// Checks whether the error must stop the whole run, rather than only
    /// faulting the execution state that raised it.
    ///
    /// Assertion failures and model contradictions only become errors at all
    /// when their policy asks for the run to abort, so they are always fatal
    /// when they are seen here.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.is_configuration()
            || matches!(
                self,
                Self::UnimplementedPrimitive { .. }
                    | Self::StateLimitExceeded { .. }
                    | Self::StoppedByWatchdog
                    | Self::AssertionFailure { .. }
                    | Self::ModelContradiction { .. }
            )
    }
}

/// An execution error with an associated execution state.
pub type LocatedError = container::Located<Error>;

/// A container of execution errors used for aggregation of errors during
/// execution.
pub type Errors = container::Errors<LocatedError>;

/// The result type for task bodies and other code that executes on behalf of
/// a single execution state.
pub type Result<T> = std::result::Result<T, Error>;

/// The result type for methods whose errors have already been attributed to
/// an execution state.
pub type LocatedResult<T> = std::result::Result<T, LocatedError>;

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, state: StateId) -> Self::Located {
        container::Located {
            location: state,
            payload:  self,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::{execution::Error, simulation},
        term::Term,
    };

    #[test]
    fn classifies_fatal_errors() {
        let configuration = Error::TooManyArguments {
            task:     "run".into(),
            expected: 1,
            given:    2,
        };
        assert!(configuration.is_configuration());
        assert!(configuration.is_fatal());

        let local = Error::from(simulation::Error::NotAnInput { name: "out".into() });
        assert!(!local.is_configuration());
        assert!(!local.is_fatal());

        assert!(Error::UnimplementedPrimitive {
            name: "wait_negedge".into(),
        }
        .is_fatal());
    }

    #[test]
    fn contradiction_lists_the_path_condition() {
        let x = Term::var("x", 4);
        let error = Error::ModelContradiction {
            condition: x.clone().equals(Term::constant(1, 4)),
            path:      vec![
                x.clone().equals(Term::constant(2, 4)),
                x.ult(Term::constant(8, 4)),
            ],
        };

        let text = error.to_string();
        assert!(text.contains("(x == 4'd2), (x < 4'd8)"), "{text}");
    }
}
