//! This module contains errors pertaining to driving the device under test.

use thiserror::Error;

/// Errors that occur while reading, writing, or stepping a [`crate::dut::Dut`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("The design has no signal named `{name}`")]
    NoSuchSignal { name: String },

    #[error("The signal `{name}` is not an input and cannot be driven")]
    NotAnInput { name: String },

    #[error("The signal `{name}` is not a state element and cannot be initialized")]
    NotAState { name: String },

    #[error("The initial value of `{name}` must not reference design signals")]
    NonConstantInit { name: String },

    #[error("The signal `{name}` is {expected} bits wide but was given a {actual} bit value")]
    WidthMismatch {
        name:     String,
        expected: u32,
        actual:   u32,
    },

    #[error("The signal `{name}` was declared more than once")]
    DuplicateSignal { name: String },

    #[error("A bit-vector of width {width} is not representable")]
    InvalidWidth { width: u32 },

    #[error("The signal `{name}` has no assignment to remove")]
    NoSuchAssignment { name: String },

    #[error("The simulator cannot be initialized twice")]
    AlreadyInitialized,

    #[error("The simulator has not been initialized")]
    NotInitialized,

    #[error("There is no previous cycle to step back to")]
    NothingToBacktrack,
}

/// The result type for methods that may have simulation errors.
pub type Result<T> = std::result::Result<T, Error>;
