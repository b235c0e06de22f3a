//! This module contains constants that are needed throughout the codebase.

/// The widest bit-vector that a [`crate::term::Term`] can represent.
pub const MAXIMUM_BIT_WIDTH: u32 = 256;

/// The width of a boolean term in bits.
pub const BOOL_WIDTH_BITS: u32 = 1;

/// The separator placed between an input's name and the cycle number when the
/// simulator creates the fresh symbolic variable for that input.
pub const CYCLE_VARIABLE_SEPARATOR: char = '@';

/// The default maximum number of execution states that the scheduler will hold
/// before refusing to fork any further.
///
/// This limit is enforced globally to prevent exponential blowup of states
/// when many symbolic conditions fork on every cycle.
pub const DEFAULT_MAXIMUM_STATES: usize = 4096;

/// The default maximum number of free variable bits that the enumerative
/// solver will search over for a single group of connected formulas.
pub const DEFAULT_MAXIMUM_FREE_BITS: u32 = 24;

/// The default number of macro-steps the scheduler will wait before polling
/// the watchdog.
pub const DEFAULT_WATCHDOG_POLL_MACRO_STEPS: usize = 16;

/// The default value for whether the scheduler records every branch decision
/// into its trace.
pub const DEFAULT_RECORD_TRACE: bool = true;
