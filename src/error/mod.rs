//! This module contains the primary error type for the testbench's interface.
//! It also re-exports the more specific error types that are
//! subsystem-specific.

pub mod container;
pub mod execution;
pub mod simulation;
pub mod solver;

use thiserror::Error;

use crate::scheduler::state::StateId;

/// The interface result type for the library.
///
/// # Usage
///
/// Any function considered to be part of the public interface of the library
/// should return this result type. Subsystems should return the more-specific
/// child error types as appropriate.
pub type Result<T> = std::result::Result<T, Errors>;

/// The interface error type for the library.
///
/// All errors returned from the library interface (and hence encountered by the
/// clients of the library) should be members of this enum.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Errors from driving the device under test.
    #[error(transparent)]
    Simulation(#[from] simulation::Error),

    /// Errors from the satisfiability oracle.
    #[error(transparent)]
    Solver(#[from] solver::Error),

    /// Errors from the scheduling and execution of tasks.
    #[error(transparent)]
    Execution(#[from] execution::Error),

    /// An unknown error, represented as a string.
    #[error("Unknown Error: {_0:?}")]
    Other(String),
}

impl Error {
    /// Constructs an unknown error with the provided `message`.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

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

/// A library error with an associated execution state.
///
/// Errors that are not raised on behalf of any execution state, such as those
/// from initializing the device under test, are attributed to
/// [`StateId::HARNESS`].
pub type LocatedError = container::Located<Error>;

/// A container of errors that may occur in the testbench.
pub type Errors = container::Errors<LocatedError>;

/// Allow simple conversions from located execution errors by re-wrapping the
/// located error around the more general payload.
impl From<execution::LocatedError> for LocatedError {
    fn from(value: execution::LocatedError) -> Self {
        let state = value.location;
        let payload = Error::from(value.payload);
        Self {
            location: state,
            payload,
        }
    }
}

/// Allow simple conversions from located execution errors by re-wrapping the
/// located error around the more general payload in the Errors container.
impl From<execution::LocatedError> for Errors {
    fn from(value: execution::LocatedError) -> Self {
        let re_wrapped: LocatedError = value.into();
        re_wrapped.into()
    }
}

/// Allow conversion from the execution errors container to the general errors
/// container.
impl From<execution::Errors> for Errors {
    fn from(value: execution::Errors) -> Self {
        let errs: Vec<execution::LocatedError> = value.into();
        let new_errs: Vec<LocatedError> = errs.into_iter().map(std::convert::Into::into).collect();

        new_errs.into()
    }
}

/// Simulation errors raised outside of any task belong to the harness.
impl From<simulation::Error> for Errors {
    fn from(value: simulation::Error) -> Self {
        container::Locatable::locate(Error::from(value), StateId::HARNESS).into()
    }
}

/// Solver errors raised outside of any task belong to the harness.
impl From<solver::Error> for Errors {
    fn from(value: solver::Error) -> Self {
        container::Locatable::locate(Error::from(value), StateId::HARNESS).into()
    }
}

/// Execution errors raised outside of any task belong to the harness.
impl From<execution::Error> for Errors {
    fn from(value: execution::Error) -> Self {
        container::Locatable::locate(Error::from(value), StateId::HARNESS).into()
    }
}
