//! This module is an integration test that checks immediate validity checks
//! made by a task against a small pipeline driven with a symbolic stimulus.
#![cfg(test)]

use symbolic_testbench::{
    error::{execution, Error},
    scheduler::{AssertionPolicy, Config, RunOutcome},
    task::{Arguments, TaskDefinition, Value},
    term::Term,
};

mod common;

/// A task that drives the pipeline with a free stimulus and then checks what
/// comes out two cycles later.
fn drive_and_check() -> TaskDefinition {
    TaskDefinition::new("drive_and_check")
        .exec(|ctx| {
            let stimulus = ctx.var("stim", 4);
            ctx.write("data", stimulus)
        })
        .exec(|ctx| ctx.wait_cycle(2))
        .returns(|ctx| {
            let out = Term::signal("out", 4);
            let stimulus = Term::var("stim", 4);
            let delayed = ctx.check_valid(out.clone().equals(stimulus.clone()))?;
            let summed = ctx.check_valid(
                Term::signal("sum", 4).equals(Term::var("data@1", 4) + stimulus),
            )?;
            let zero = ctx.check_valid(out.equals(Term::constant(0, 4)))?;
            Ok(vec![delayed.into(), summed.into(), zero.into()].into())
        })
}

#[test]
fn records_failed_checks_and_continues() -> anyhow::Result<()> {
    let mut bench = common::new_testbench(common::pipeline_design()?, Config::default())?;
    let task = bench.register(drive_and_check());
    let id = bench.invoke(task, Arguments::new())?;

    let done = bench.run();
    assert_eq!(done.outcome(), Ok(RunOutcome::Completed));
    assert!(!done.is_success());

    let results = done.return_value(id).expect("Task should have returned");
    assert_eq!(
        results,
        &Value::List(vec![Value::Bool(true), Value::Bool(true), Value::Bool(false)])
    );

    let failures = done.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures.payloads()[0].location, id);
    assert!(matches!(
        &failures.payloads()[0].payload,
        Error::Execution(execution::Error::AssertionFailure { .. })
    ));

    Ok(())
}

#[test]
fn constraints_make_checks_pass() -> anyhow::Result<()> {
    let mut bench = common::new_testbench(common::pipeline_design()?, Config::default())?;
    bench.add_constraint(Term::var("stim", 4).equals(Term::constant(0, 4)))?;
    let task = bench.register(drive_and_check());
    let id = bench.invoke(task, Arguments::new())?;

    let done = bench.run();
    assert!(done.is_success());
    assert_eq!(
        done.return_value(id),
        Some(&Value::List(vec![
            Value::Bool(true),
            Value::Bool(true),
            Value::Bool(true)
        ]))
    );

    Ok(())
}

#[test]
fn aborting_policy_stops_the_run() -> anyhow::Result<()> {
    let config = Config::default().with_assertion_policy(AssertionPolicy::Abort);
    let mut bench = common::new_testbench(common::pipeline_design()?, config)?;
    let task = bench.register(drive_and_check());
    let id = bench.invoke(task, Arguments::new())?;

    let done = bench.run();
    assert!(done.return_value(id).is_none());

    let errors = done.into_outcome().expect_err("Failed check should abort");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.payloads()[0].location, id);
    assert!(matches!(
        &errors.payloads()[0].payload,
        Error::Execution(execution::Error::AssertionFailure { .. })
    ));

    Ok(())
}
