//! This module contains errors pertaining to the satisfiability oracle.

use thiserror::Error;

/// Errors that occur while the [`crate::solver::Oracle`] answers a query.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("The formula still references the uninstantiated signal `{name}`")]
    UninstantiatedSignal { name: String },

    #[error("The formula is {width} bits wide but a boolean was expected")]
    NotBoolean { width: u32 },

    #[error("The variable `{name}` is used with widths {first} and {second}")]
    InconsistentVariable {
        name:   String,
        first:  u32,
        second: u32,
    },

    #[error("The query has {requested} free bits, exceeding the limit of {limit}")]
    SearchSpaceExceeded { requested: u32, limit: u32 },

    #[error("The formula contains a value or variable of width zero")]
    ZeroWidth,

    #[error("The constant {value} does not fit in {width} bits")]
    UnrepresentableConstant { value: String, width: u32 },

    #[error("The solver could not decide the query: {reason}")]
    Unknown { reason: String },

    #[error("A scope was popped when none had been pushed")]
    UnbalancedPop,
}

/// The result type for methods that may have solver errors.
pub type Result<T> = std::result::Result<T, Error>;
