//! This module is an integration test that checks that waiting on a condition
//! over a free input forks the waiting state into complementary branches.
#![cfg(test)]

use symbolic_testbench::{
    dut::TransitionSystem,
    scheduler::{state::StateId, trace::BranchOutcome, Config, RunOutcome},
    solver::{Oracle, SmtSolver},
    task::{Arguments, TaskDefinition},
    term::Term,
};

mod common;

fn wait_for_zero() -> TaskDefinition {
    TaskDefinition::new("wait_for_zero")
        .exec(|ctx| ctx.wait_cond(|env| Ok(env.signal("sym_in")?.equals(Term::constant(0, 2)))))
        .returns(|ctx| Ok(ctx.signal("sym_in")?.into()))
}

#[test]
fn free_condition_forks_into_complementary_branches() -> anyhow::Result<()> {
    let config = Config::default().with_step_bound(Some(1));
    let mut bench = common::new_testbench(common::free_input_design()?, config)?;
    let task = bench.register(wait_for_zero());
    let original = bench.invoke(task, Arguments::new())?;

    let done = bench.run();
    assert_eq!(done.outcome(), Ok(RunOutcome::BoundReached));

    // One resolution pass produced exactly one new state.
    let states = done.states();
    assert_eq!(states.len(), 2);
    let forked = &states[1];
    assert_eq!(forked.id(), StateId::new(1));
    assert_eq!(forked.forked_from(), Some(original));

    // The input is read on the cycle the design advanced to.
    let condition = Term::var("sym_in@1", 2).equals(Term::constant(0, 2));
    assert_eq!(forked.path_conditions(), &[condition.clone()]);
    assert_eq!(states[0].path_conditions(), &[!condition]);

    // The true branch may continue while the original stays blocked.
    assert!(forked.is_runnable());
    assert!(states[0].awaiting().is_some());

    let decisions = done.trace().decisions();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].state, original);
    assert_eq!(decisions[0].cycle, 1);
    assert_eq!(decisions[0].outcome, BranchOutcome::Forked {
        true_branch: forked.id(),
    });

    Ok(())
}

#[test]
fn path_conditions_accumulate_on_the_false_branch() -> anyhow::Result<()> {
    let config = Config::default().with_step_bound(Some(3));
    let mut bench = common::new_testbench(common::free_input_design()?, config)?;
    let task = bench.register(wait_for_zero());
    let original = bench.invoke(task, Arguments::new())?;

    let done = bench.run();
    assert_eq!(done.trace().fork_count(), 3);
    assert_eq!(done.states().len(), 4);

    // The original keeps one negated condition per cycle it stayed blocked.
    let state = done.execution_state(original).expect("Original should exist");
    assert_eq!(state.path_conditions().len(), 3);

    // Each true branch extends the path of the state it was forked from.
    for (ix, forked) in done.states().iter().enumerate().skip(1) {
        assert_eq!(forked.path_conditions().len(), ix);
        assert_eq!(
            &forked.path_conditions()[..ix - 1],
            &state.path_conditions()[..ix - 1]
        );
    }

    // Branches that had a chance to run returned the input as it was on the
    // cycle they were created on. The last one was created as the bound hit.
    for ix in 1..3 {
        let forked = &done.states()[ix];
        let value = forked.return_value().expect("Forked branch should have returned");
        assert_eq!(value.as_term()?, Term::var(format!("sym_in@{ix}"), 2));
    }
    assert!(done.states()[3].is_runnable());

    Ok(())
}

#[test]
fn constrained_inputs_do_not_fork() -> anyhow::Result<()> {
    let mut bench = common::new_testbench(common::free_input_design()?, Config::default())?;
    bench.write_default("sym_in", Term::constant(0, 2))?;
    let task = bench.register(wait_for_zero());
    let id = bench.invoke(task, Arguments::new())?;

    let done = bench.run();
    assert_eq!(done.outcome(), Ok(RunOutcome::Completed));
    assert_eq!(done.trace().fork_count(), 0);
    assert_eq!(done.trace().decisions()[0].outcome, BranchOutcome::OnlyTrue);
    assert_eq!(
        done.return_value(id).expect("Task should have returned").as_term()?,
        Term::constant(0, 2)
    );

    Ok(())
}

#[test]
fn long_waits_on_free_inputs_keep_forking() -> anyhow::Result<()> {
    let config = Config::default().with_step_bound(Some(16));
    let mut bench = common::new_testbench(common::free_input_design()?, config)?;
    let task = bench.register(wait_for_zero());
    let original = bench.invoke(task, Arguments::new())?;

    let done = bench.run();
    assert_eq!(done.outcome(), Ok(RunOutcome::BoundReached));
    assert_eq!(done.trace().fork_count(), 16);
    assert!(done.states().iter().all(|state| !state.is_faulted()));

    let state = done.execution_state(original).expect("Original should exist");
    assert_eq!(state.path_conditions().len(), 16);
    assert!(state.awaiting().is_some());

    Ok(())
}

#[test]
fn wide_free_inputs_fork_like_narrow_ones() -> anyhow::Result<()> {
    let mut system = TransitionSystem::new();
    system.add_input("address", 64)?;
    let config = Config::default().with_step_bound(Some(2));
    let mut bench = common::new_testbench(system, config)?;
    let task = bench.register(
        TaskDefinition::new("wait_for_top")
            .exec(|ctx| {
                ctx.wait_cond(|env| Ok(env.signal("address")?.ugt(Term::constant(u64::MAX - 1, 64))))
            })
            .returns(|ctx| Ok(ctx.signal("address")?.into())),
    );
    bench.invoke(task, Arguments::new())?;

    let done = bench.run();
    assert_eq!(done.outcome(), Ok(RunOutcome::BoundReached));
    assert_eq!(done.trace().fork_count(), 2);
    assert_eq!(
        done.states()[1].return_value().expect("Branch should have returned").as_term()?,
        Term::var("address@1", 64)
    );

    Ok(())
}

#[test]
fn constrained_free_inputs_resolve_without_forking() -> anyhow::Result<()> {
    let mut bench = common::new_testbench(common::free_input_design()?, Config::default())?;
    let forced = Term::var("sym_in@1", 2).ult(Term::constant(1, 2));
    bench.add_constraint(forced.clone())?;
    let task = bench.register(wait_for_zero());
    let id = bench.invoke(task, Arguments::new())?;

    let done = bench.run();
    assert_eq!(done.outcome(), Ok(RunOutcome::Completed));
    assert_eq!(done.trace().fork_count(), 0);
    assert_eq!(done.trace().decisions()[0].outcome, BranchOutcome::OnlyTrue);

    // The condition reached the oracle, and the path keeps it symbolic.
    let condition = Term::var("sym_in@1", 2).equals(Term::constant(0, 2));
    let state = done.execution_state(id).expect("State should exist");
    assert_eq!(state.path_conditions(), &[condition.clone()]);
    let mut mentions_input = false;
    state.path_conditions()[0].visit(&mut |term| {
        mentions_input |= matches!(term, Term::Var { name, .. } if name == "sym_in@1");
    });
    assert!(mentions_input);
    assert_eq!(
        done.return_value(id).expect("Task should have returned").as_term()?,
        Term::var("sym_in@1", 2)
    );

    // Only the constraint rules out the negated condition.
    let mut oracle = SmtSolver::default();
    assert!(!oracle.check_sat(&!condition.clone(), &[forced])?);
    assert!(oracle.check_sat(&!condition, &[])?);

    Ok(())
}

#[test]
fn trace_serializes_to_json() -> anyhow::Result<()> {
    let config = Config::default().with_step_bound(Some(2));
    let mut bench = common::new_testbench(common::free_input_design()?, config)?;
    let task = bench.register(wait_for_zero());
    bench.invoke(task, Arguments::new())?;

    let done = bench.run();
    let json = done.trace().to_json()?;
    let parsed: serde_json::Value = serde_json::from_str(&json)?;
    let decisions = parsed["decisions"]
        .as_array()
        .expect("Decisions should be an array");
    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0]["task"], "wait_for_zero");
    assert!(decisions[1]["outcome"].get("forked").is_some());

    Ok(())
}
