//! This module contains the states that the testbench moves through over the
//! course of a verification run.

use std::fmt::Debug;

use crate::{
    dut::SymbolicSimulator,
    error::Errors,
    scheduler,
    scheduler::{RunOutcome, Scheduler},
    solver::DynOracle,
    watchdog::DynWatchdog,
};

/// A trait representing a state that the testbench can be in.
pub trait State
where
    Self: Debug + Sized,
{
}

/// The state before the design has been given its starting values.
#[derive(Debug)]
pub struct Uninitialized {
    /// The simulator for the design under test.
    pub simulator: SymbolicSimulator,

    /// The oracle that answers the scheduler's satisfiability queries.
    pub oracle: DynOracle,

    /// The configuration for the scheduler.
    pub config: scheduler::Config,

    /// The watchdog that can stop the run.
    pub watchdog: DynWatchdog,
}
impl State for Uninitialized {}

/// The state in which tasks can be registered and invoked, and constraints and
/// assertions can be set up, before the run.
#[derive(Debug)]
pub struct Ready {
    pub scheduler: Scheduler,
}
impl State for Ready {}

/// The state after the scheduler has stopped running.
#[derive(Debug)]
pub struct RunComplete {
    /// The scheduler, holding the final execution states and the trace.
    pub scheduler: Scheduler,

    /// How the run ended, or the errors that ended it or faulted states
    /// during it.
    pub outcome: Result<RunOutcome, Errors>,
}
impl State for RunComplete {}
