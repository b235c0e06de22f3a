//! This module is an integration test for the ways in which a run can end
//! before every task has finished.
#![cfg(test)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use symbolic_testbench::{
    error::{execution, Error},
    scheduler::{state::StateId, Config, RunOutcome},
    task::{Arguments, TaskDefinition},
    watchdog::FlagWatchdog,
};

mod common;

fn sleeper() -> TaskDefinition {
    TaskDefinition::new("sleeper").exec(|ctx| ctx.wait_cycle(10))
}

#[test]
fn task_can_finish_the_simulation() -> anyhow::Result<()> {
    let mut bench = common::new_testbench(common::register_design(2)?, Config::default())?;
    let stopper = bench.register(
        TaskDefinition::new("stopper")
            .exec(|ctx| ctx.wait_cycle(2))
            .exec(|ctx| {
                ctx.finish_simulation();
                Ok(())
            }),
    );
    let sleeper = bench.register(sleeper());
    bench.invoke(stopper, Arguments::new())?;
    let sleeping = bench.invoke(sleeper, Arguments::new())?;

    let done = bench.run();
    assert_eq!(done.outcome(), Ok(RunOutcome::Stopped));
    assert_eq!(done.scheduler().macro_steps(), 3);
    assert!(!done.execution_state(sleeping).is_some_and(|s| s.is_finished()));

    Ok(())
}

#[test]
fn step_bound_ends_the_run() -> anyhow::Result<()> {
    let config = Config::default().with_step_bound(Some(4));
    let mut bench = common::new_testbench(common::register_design(2)?, config)?;
    let sleeper = bench.register(sleeper());
    bench.invoke(sleeper, Arguments::new())?;

    let done = bench.run();
    assert_eq!(done.outcome(), Ok(RunOutcome::BoundReached));
    assert_eq!(done.scheduler().dut().cycle(), 4);

    Ok(())
}

#[test]
fn watchdog_stops_the_run() -> anyhow::Result<()> {
    let flag = Arc::new(AtomicBool::new(false));
    let watchdog = FlagWatchdog::new(Arc::clone(&flag)).polling_every(1).in_rc();
    let mut bench = common::new_testbench_with_watchdog(
        common::register_design(2)?,
        Config::default(),
        watchdog,
    )?;
    let sleeper = bench.register(sleeper());
    bench.invoke(sleeper, Arguments::new())?;

    bench.macro_step()?;
    flag.store(true, Ordering::Relaxed);

    let done = bench.run();
    let errors = done.outcome().expect_err("Watchdog should stop the run");
    assert_eq!(errors.payloads()[0].location, StateId::HARNESS);
    assert!(matches!(
        errors.payloads()[0].payload,
        Error::Execution(execution::Error::StoppedByWatchdog)
    ));

    Ok(())
}
