//! This module is an integration test that checks tasks invoking and waiting
//! on other tasks from within a run.
#![cfg(test)]

use symbolic_testbench::{
    error::{execution, Error},
    scheduler::{Config, RunOutcome},
    task::{Arguments, Params, TaskDefinition, Value},
    term::Term,
};

mod common;

#[test]
fn waiting_task_reads_the_dependency_return_value() -> anyhow::Result<()> {
    let mut bench = common::new_testbench(common::register_design(4)?, Config::default())?;

    let run1 = bench.register(
        TaskDefinition::new("run1")
            .with_params(Params::new().positional("value"))
            .exec(|ctx| ctx.wait_cycle(2))
            .returns(|ctx| Ok(ctx.local("value")?.clone())),
    );
    let run2 = bench.register(
        TaskDefinition::new("run2")
            .exec(move |ctx| {
                let child = ctx.invoke(run1, Arguments::new().arg(42))?;
                ctx.set_local("child", child);
                ctx.wait_task(child)
            })
            .returns(|ctx| {
                let child = ctx.local("child")?.as_state()?;
                Ok(ctx.return_value(child)?.unwrap_or_default())
            }),
    );
    let parent = bench.invoke(run2, Arguments::new())?;

    let done = bench.run();
    assert_eq!(done.outcome(), Ok(RunOutcome::Completed));
    assert_eq!(done.states().len(), 2);

    let child = done.states()[1].id();
    assert_eq!(done.return_value(child), Some(&Value::Int(42)));
    assert_eq!(done.return_value(parent), done.return_value(child));

    // The child waited for two cycles and the parent finished in the same
    // macro-step as it did.
    assert_eq!(done.scheduler().dut().cycle(), 2);

    Ok(())
}

#[test]
fn keyword_arguments_reach_the_invoked_task() -> anyhow::Result<()> {
    let mut bench = common::new_testbench(common::register_design(4)?, Config::default())?;

    let drive = bench.register(
        TaskDefinition::new("drive")
            .with_params(
                Params::new()
                    .positional("signal")
                    .keyword("value", Some(Value::Int(3))),
            )
            .exec(|ctx| {
                let signal = ctx.local("signal")?.as_str()?.to_string();
                let value = u64::try_from(ctx.local("value")?.as_int()?).unwrap_or_default();
                ctx.write_value(&signal, value)
            })
            .exec(|ctx| ctx.wait_cycle(1))
            .returns(|ctx| Ok(ctx.signal("x")?.into())),
    );
    let defaulted = bench.invoke(drive, Arguments::new().arg("x_in"))?;

    let done = bench.run();
    let value = done.return_value(defaulted).expect("Task should have returned");
    assert_eq!(value.as_term()?, Term::constant(3, 4));

    Ok(())
}

#[test]
fn bad_arguments_are_refused_before_the_run() -> anyhow::Result<()> {
    let mut bench = common::new_testbench(common::register_design(4)?, Config::default())?;
    let task = bench.register(
        TaskDefinition::new("needs_one").with_params(Params::new().positional("value")),
    );

    let errors = bench
        .invoke(task, Arguments::new())
        .expect_err("Missing argument should be refused");
    assert!(matches!(
        &errors.payloads()[0].payload,
        Error::Execution(execution::Error::MissingArgument { parameter, .. }) if parameter == "value"
    ));
    assert!(bench.scheduler().states().is_empty());

    Ok(())
}

#[test]
fn waiting_on_itself_faults_only_that_task() -> anyhow::Result<()> {
    let mut bench = common::new_testbench(common::register_design(4)?, Config::default())?;
    let selfish = bench.register(TaskDefinition::new("selfish").exec(|ctx| {
        let me = ctx.id();
        ctx.wait_task(me)
    }));
    let fine = bench.register(TaskDefinition::new("fine").returns(|_| Ok(Value::Bool(true))));
    let faulty = bench.invoke(selfish, Arguments::new())?;
    let healthy = bench.invoke(fine, Arguments::new())?;

    let done = bench.run();
    let errors = done.outcome().expect_err("Fault should be reported");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.payloads()[0].location, faulty);
    assert!(done.execution_state(faulty).is_some_and(|s| s.is_faulted()));
    assert_eq!(done.return_value(healthy), Some(&Value::Bool(true)));

    Ok(())
}
