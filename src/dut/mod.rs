//! This module contains the interface to the device under test (DUT) that the
//! scheduler drives, along with a reference implementation over an in-memory
//! transition system.
//!
//! # Signal Semantics
//!
//! Reads made through [`Dut::read_signal`] return [`Term`]s that are bound to
//! the current cycle. A read yields a constant when the signal is fully
//! determined, and otherwise a term over free variables.
//!
//! Writes made through [`Dut::write_signal`] are _staged_ and only take effect
//! when [`Dut::advance_one_cycle`] commits them. Until then, reading the input
//! back returns the staged value.

pub mod simulator;
pub mod system;

use std::fmt::Debug;

pub use crate::dut::{simulator::SymbolicSimulator, system::TransitionSystem};
use crate::{error::simulation::Result, term::Term};

/// A dynamically dispatched [`Dut`] instance.
pub type DynDut = Box<dyn Dut>;

/// The interface to a clocked device under test.
pub trait Dut
where
    Self: Debug,
{
    /// Commits the staged input assignments and moves the design forward by
    /// one clock cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the design cannot be stepped.
    fn advance_one_cycle(&mut self) -> Result<()>;

    /// Undoes the most recent advance, returning the design to the cycle
    /// before it.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no cycle has been committed.
    fn back_step(&mut self) -> Result<()>;

    /// Reads the value of the signal `name` on the current cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no such signal.
    fn read_signal(&self, name: &str) -> Result<Term>;

    /// Stages `value` to drive the input `name` when the design is next
    /// advanced.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` is not an input or `value` has the wrong
    /// width.
    fn write_signal(&mut self, name: &str, value: Term) -> Result<()>;

    /// Removes the staged assignment to the input `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` has no staged assignment.
    fn unset_signal(&mut self, name: &str) -> Result<()>;

    /// Sets `value` as the value that drives the input `name` on every cycle
    /// where it has no staged assignment.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` is not an input or `value` has the wrong
    /// width.
    fn write_default(&mut self, name: &str, value: Term) -> Result<()>;

    /// Removes the default assignment to the input `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` has no default assignment.
    fn unset_default(&mut self, name: &str) -> Result<()>;

    /// Gets the width of the signal `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no such signal.
    fn signal_width(&self, name: &str) -> Result<u32>;

    /// Checks whether the design has a signal named `name`.
    #[must_use]
    fn has_signal(&self, name: &str) -> bool {
        self.signal_width(name).is_ok()
    }

    /// Instantiates `expr` on the current cycle, replacing every reference to a
    /// design signal with that signal's current value.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `expr` references a signal that does not exist.
    fn instantiate(&self, expr: &Term) -> Result<Term> {
        expr.try_replace_signals(&mut |name, _| self.read_signal(name))
    }

    /// Gets the number of cycles that the design has been advanced by.
    #[must_use]
    fn cycle(&self) -> usize;

    /// Gets the assumptions that every satisfiability query about the design
    /// must respect, such as the instances of the design's constraints on
    /// every cycle simulated so far.
    #[must_use]
    fn assumptions(&self) -> Vec<Term>;

    /// Gets the properties that the design is expected to uphold, written over
    /// design signals.
    #[must_use]
    fn properties(&self) -> Vec<Term>;

    /// Checks whether the design has been given its initial state.
    #[must_use]
    fn is_initialized(&self) -> bool;
}
