//! This module is an integration test that checks that a task waiting on a
//! design signal observes each cycle's value, and never a value staged for a
//! later cycle.
#![cfg(test)]

use symbolic_testbench::{
    scheduler::{Config, RunOutcome},
    task::{Arguments, TaskDefinition},
    term::Term,
};

mod common;

#[test]
fn waiter_is_released_before_the_next_write_lands() -> anyhow::Result<()> {
    let mut bench = common::new_testbench(common::register_design(2)?, Config::default())?;

    let writer = bench.register(
        TaskDefinition::new("writer")
            .exec(|ctx| ctx.write_value("x_in", 1))
            .exec(|ctx| ctx.wait_cycle(1))
            .exec(|ctx| ctx.write_value("x_in", 2)),
    );
    let waiter = bench.register(
        TaskDefinition::new("waiter")
            .exec(|ctx| ctx.wait_cond(|env| Ok(env.signal("x")?.equals(Term::constant(1, 2)))))
            .returns(|ctx| Ok(ctx.signal("x")?.into())),
    );
    bench.invoke(writer, Arguments::new())?;
    let waiting = bench.invoke(waiter, Arguments::new())?;

    let done = bench.run();
    assert_eq!(done.outcome(), Ok(RunOutcome::Completed));

    // The waiter saw the register at one, and the run completed before the
    // second write was ever clocked in.
    let seen = done.return_value(waiting).expect("Waiter should have returned");
    assert_eq!(seen.as_term()?, Term::constant(1, 2));
    assert_eq!(done.scheduler().dut().cycle(), 1);
    assert_eq!(done.scheduler().dut().read_signal("x")?, Term::constant(1, 2));

    // A condition that is already decided never forks.
    assert_eq!(done.trace().fork_count(), 0);
    assert_eq!(done.states().len(), 2);

    Ok(())
}

#[test]
fn writes_take_effect_on_the_next_cycle() -> anyhow::Result<()> {
    let mut bench = common::new_testbench(common::register_design(4)?, Config::default())?;

    let sampler = bench.register(
        TaskDefinition::new("sampler")
            .exec(|ctx| {
                let before = ctx.signal("x")?;
                ctx.set_local("before", before);
                ctx.write_value("x_in", 9)
            })
            .exec(|ctx| {
                // Staged writes are not visible on the cycle they are made.
                let still = ctx.signal("x")?;
                ctx.set_local("still", still);
                ctx.wait_cycle(1)
            })
            .returns(|ctx| {
                let after = ctx.signal("x")?;
                Ok(vec![
                    ctx.local("before")?.clone(),
                    ctx.local("still")?.clone(),
                    after.into(),
                ]
                .into())
            }),
    );
    let id = bench.invoke(sampler, Arguments::new())?;

    let done = bench.run();
    assert!(done.is_success());
    let values = done.return_value(id).expect("Sampler should have returned");
    let values = values
        .as_list()?
        .iter()
        .map(|v| v.as_term())
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(values, vec![
        Term::constant(0, 4),
        Term::constant(0, 4),
        Term::constant(9, 4)
    ]);

    Ok(())
}
