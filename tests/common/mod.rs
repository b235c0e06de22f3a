//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]

use symbolic_testbench as stb;
use symbolic_testbench::{
    dut::{SymbolicSimulator, TransitionSystem},
    scheduler::Config,
    solver::SmtSolver,
    term::Term,
    testbench::{state::Ready, Testbench},
    watchdog::{DynWatchdog, LazyWatchdog},
};

/// Constructs a testbench around `system` that is initialized from the
/// declared initial values, using the provided scheduler `config`.
#[allow(unused)] // It is actually
pub fn new_testbench(system: TransitionSystem, config: Config) -> anyhow::Result<Testbench<Ready>> {
    new_testbench_with_watchdog(system, config, LazyWatchdog.in_rc())
}

/// Constructs a testbench around `system` as [`new_testbench`] does, but
/// polling the provided `watchdog`.
#[allow(unused)] // It is actually
pub fn new_testbench_with_watchdog(
    system: TransitionSystem,
    config: Config,
    watchdog: DynWatchdog,
) -> anyhow::Result<Testbench<Ready>> {
    let bench = stb::new(
        "integration",
        SymbolicSimulator::new(system),
        SmtSolver::default().boxed(),
        config,
        watchdog,
    )
    .set_init(Vec::<(String, Term)>::new())?;
    Ok(bench)
}

/// A design with a single register `x` that takes the value of the input
/// `x_in` on every cycle, starting from zero.
#[allow(unused)] // It is actually
pub fn register_design(width: u32) -> anyhow::Result<TransitionSystem> {
    let mut system = TransitionSystem::new();
    let x_in = system.add_input("x_in", width)?;
    system.add_state("x", width)?;
    system.set_init("x", Term::constant(0, width))?;
    system.set_next("x", x_in)?;
    Ok(system)
}

/// A design whose only signal is the input `sym_in`, which is left free
/// unless a task drives it.
#[allow(unused)] // It is actually
pub fn free_input_design() -> anyhow::Result<TransitionSystem> {
    let mut system = TransitionSystem::new();
    system.add_input("sym_in", 2)?;
    Ok(system)
}

/// A two-stage pipeline that delays the input `data` by two cycles before it
/// appears on `out`. The wire `sum` adds both stages.
#[allow(unused)] // It is actually
pub fn pipeline_design() -> anyhow::Result<TransitionSystem> {
    let mut system = TransitionSystem::new();
    let data = system.add_input("data", 4)?;
    let first = system.add_state("first", 4)?;
    let out = system.add_state("out", 4)?;
    system.set_init("first", Term::constant(0, 4))?;
    system.set_init("out", Term::constant(0, 4))?;
    system.set_next("first", data)?;
    system.set_next("out", first.clone())?;
    system.add_wire("sum", first + out)?;
    Ok(system)
}
