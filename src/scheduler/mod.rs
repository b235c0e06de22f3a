//! This module contains the co-scheduler that interleaves the execution of
//! verification tasks with the simulation of the device under test.
//!
//! # Macro-Steps
//!
//! The scheduler makes progress one macro-step at a time:
//!
//! 1. **Drain:** Every runnable execution state is stepped, pass after pass,
//!    until a pass makes no progress. A state waiting on another state is
//!    released as soon as that state finishes, within the same drain.
//! 2. **Termination:** If every state has finished, the run is complete and
//!    the design is not advanced.
//! 3. **Advance:** The design is advanced by one cycle.
//! 4. **Resolution:** Cycle countdowns move forward, and states waiting on a
//!    symbolic condition are handed to the branch resolver, which may fork
//!    them.
//!
//! Every phase iterates over a snapshot of the arena's length, so states that
//! are created during a phase are first visited by the next one.

pub mod await_condition;
pub mod context;
pub mod resolver;
pub mod state;
pub mod stepper;
pub mod trace;

use std::{mem, rc::Rc};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    constant::{DEFAULT_MAXIMUM_STATES, DEFAULT_RECORD_TRACE},
    dut::{Dut, DynDut},
    error::{
        container::Locatable,
        execution::{Error, Errors, LocatedError, LocatedResult, Result},
    },
    scheduler::{
        await_condition::AwaitCondition,
        context::{Neighbours, StepEffects, TaskContext},
        state::{ExecutionState, StateId},
        stepper::StepOutcome,
        trace::BranchTrace,
    },
    solver::{DynOracle, Oracle},
    task::{Arguments, TaskDefinition, TaskId},
    term::Term,
    watchdog::DynWatchdog,
};

/// How a run of the scheduler ended.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every execution state finished.
    Completed,

    /// The configured bound on macro-steps was reached first.
    BoundReached,

    /// A task asked for the run to finish.
    Stopped,
}

/// The result of a single macro-step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MacroStep {
    /// Every execution state has finished, so the design was not advanced.
    Completed,

    /// The design was advanced by one cycle.
    Advanced,
}

/// The co-scheduler for verification tasks.
#[derive(Debug)]
pub struct Scheduler {
    /// The registered task definitions, indexed by [`TaskId`].
    tasks: Vec<Rc<TaskDefinition>>,

    /// The arena of execution states, indexed by [`StateId`].
    states: Vec<ExecutionState>,

    /// The device under test.
    dut: DynDut,

    /// The oracle consulted for every satisfiability query.
    oracle: DynOracle,

    /// Assumptions added by the harness or by tasks, shared by every state.
    constraints: Vec<Term>,

    /// The configuration of the scheduler.
    config: Config,

    /// A watchdog that gets polled at intervals to check whether the run needs
    /// to stop.
    watchdog: DynWatchdog,

    /// The decisions made by the branch resolver.
    trace: BranchTrace,

    /// Assertion failures that were recorded rather than raised.
    failures: Errors,

    /// Errors that faulted individual states without stopping the run.
    errors: Errors,

    /// The number of macro-steps that advanced the design.
    macro_steps: usize,

    /// Whether a task has asked for the run to finish.
    finish_requested: bool,
}

impl Scheduler {
    /// Constructs a new scheduler driving `dut` and consulting `oracle`, with
    /// no tasks and no execution states.
    #[must_use]
    pub fn new(dut: DynDut, oracle: DynOracle, config: Config, watchdog: DynWatchdog) -> Self {
        Self {
            tasks: Vec::new(),
            states: Vec::new(),
            dut,
            oracle,
            constraints: Vec::new(),
            config,
            watchdog,
            trace: BranchTrace::default(),
            failures: Errors::default(),
            errors: Errors::default(),
            macro_steps: 0,
            finish_requested: false,
        }
    }

    /// Registers `task`, returning the handle used to invoke it.
    ///
    /// # Panics
    ///
    /// Panics if more than [`u32::MAX`] tasks are registered. This is a
    /// programmer bug.
    pub fn register(&mut self, task: TaskDefinition) -> TaskId {
        let index = u32::try_from(self.tasks.len())
            .unwrap_or_else(|_| panic!("Task count should not exceed {}", u32::MAX));
        debug!(task = task.name(), id = index, "registered task");
        self.tasks.push(Rc::new(task));
        TaskId::new(index)
    }

    /// Invokes the task `task` with `args` from outside of any task, returning
    /// a handle to the new execution state.
    ///
    /// Nothing is executed until the scheduler next runs, but the arguments
    /// are checked against the task's parameters immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no such task, if `args` do not fit its
    /// parameters, or if the state limit has been reached.
    pub fn invoke(&mut self, task: TaskId, args: Arguments) -> Result<StateId> {
        let definition = self
            .tasks
            .get(task.index())
            .ok_or(Error::UnknownTask { task })?;
        definition.params().bind(definition.name(), &args)?;

        let id = self.next_state_id()?;
        let state = ExecutionState::new(id, task, Rc::clone(definition), args);
        self.states.push(state);
        Ok(id)
    }

    /// Adds `constraint`, read on the current cycle, to the assumptions of
    /// every query.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `constraint` is not a condition over existing
    /// signals.
    pub fn add_constraint(&mut self, constraint: Term) -> Result<()> {
        let constraint = self.dut.instantiate(&constraint)?;
        if !constraint.is_boolean() {
            let width = constraint.width();
            return Err(Error::NotACondition {
                expr: constraint,
                width,
            });
        }
        self.constraints.push(constraint);
        Ok(())
    }

    /// Removes the constraint at position `index` of [`Self::constraints`],
    /// returning it.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no constraint at `index`.
    pub fn unset_constraint(&mut self, index: usize) -> Result<Term> {
        let count = self.constraints.len();
        if index >= count {
            return Err(Error::NoSuchConstraint { index, count });
        }
        Ok(self.constraints.remove(index))
    }

    /// Removes every constraint added by the harness or by tasks.
    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
    }

    /// Checks whether `expr`, read on the current cycle, must be true under the
    /// design's assumptions and the shared constraints.
    ///
    /// Path conditions are not consulted, so this is a check about every
    /// execution state at once. Failures follow the configured
    /// [`AssertionPolicy`] and are attributed to [`StateId::HARNESS`].
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `expr` is not a condition over existing signals, if
    /// the oracle cannot answer, or if the check fails under
    /// [`AssertionPolicy::Abort`].
    pub fn check_assertion(&mut self, expr: &Term) -> Result<bool> {
        let expr = self.dut.instantiate(expr)?;
        if !expr.is_boolean() {
            let width = expr.width();
            return Err(Error::NotACondition { expr, width });
        }
        let mut assumptions = self.dut.assumptions();
        assumptions.extend(self.constraints.iter().cloned());
        if !self.oracle.check_sat(&!expr.clone(), &assumptions)? {
            return Ok(true);
        }

        let failure = Error::AssertionFailure {
            expr,
            path: Vec::new(),
        };
        warn!(cycle = self.dut.cycle(), %failure, "assertion failed");
        match self.config.assertion_policy {
            AssertionPolicy::Abort => Err(failure),
            AssertionPolicy::Record => {
                self.failures.add(failure.locate(StateId::HARNESS));
                Ok(false)
            }
        }
    }

    /// Checks every property of the design on the current cycle, returning
    /// `true` if all of them hold.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] under the same conditions as
    /// [`Self::check_assertion`].
    pub fn check_properties(&mut self) -> Result<bool> {
        let mut all_hold = true;
        for property in self.dut.properties() {
            all_hold &= self.check_assertion(&property)?;
        }
        Ok(all_hold)
    }

    /// Runs macro-steps until every state finishes, the step bound is reached,
    /// a task asks to finish, or the watchdog fires. A request to finish only
    /// ends the run in which it was made.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] immediately if a fatal error occurs, or at the end of
    /// the run if any state was faulted. In either case the states remain
    /// available for inspection.
    pub fn run(&mut self) -> std::result::Result<RunOutcome, Errors> {
        let poll_interval = self.watchdog.poll_every().max(1);

        let outcome = loop {
            if self.macro_steps % poll_interval == 0 && self.watchdog.should_stop() {
                return Err(self.abort(Error::StoppedByWatchdog.locate(StateId::HARNESS)));
            }
            if self
                .config
                .step_bound
                .is_some_and(|bound| self.macro_steps >= bound)
            {
                break RunOutcome::BoundReached;
            }

            match self.macro_step() {
                Ok(MacroStep::Completed) => break RunOutcome::Completed,
                Ok(MacroStep::Advanced) if self.finish_requested => break RunOutcome::Stopped,
                Ok(MacroStep::Advanced) => (),
                Err(error) => return Err(self.abort(error)),
            }
        };
        self.finish_requested = false;

        info!(
            ?outcome,
            macro_steps = self.macro_steps,
            states = self.states.len(),
            forks = self.trace.fork_count(),
            failures = self.failures.len(),
            "run finished"
        );

        if self.errors.is_empty() {
            Ok(outcome)
        } else {
            Err(mem::take(&mut self.errors))
        }
    }

    /// Performs a single macro-step.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a fatal error occurs. Errors that only concern one
    /// state fault that state and are buffered.
    pub fn macro_step(&mut self) -> LocatedResult<MacroStep> {
        debug!(
            macro_step = self.macro_steps,
            cycle = self.dut.cycle(),
            states = self.states.len(),
            "starting macro-step"
        );

        self.drain()?;

        if self.states.iter().all(ExecutionState::is_finished) {
            return Ok(MacroStep::Completed);
        }

        self.dut
            .advance_one_cycle()
            .map_err(Error::from)
            .locate(StateId::HARNESS)?;

        let snapshot = self.states.len();
        for ix in 0..snapshot {
            match self.states[ix].awaiting().cloned() {
                Some(AwaitCondition::Cycle { .. }) => self.states[ix].tick(),
                Some(AwaitCondition::Condition { expr }) => self.resolve_condition(ix, &expr)?,
                Some(AwaitCondition::Task { .. }) | None => (),
            }
        }

        self.macro_steps += 1;
        Ok(MacroStep::Advanced)
    }

    /// Steps runnable states until none of them can make further progress.
    fn drain(&mut self) -> LocatedResult<()> {
        loop {
            let mut progressed = false;
            let snapshot = self.states.len();
            for ix in 0..snapshot {
                progressed |= self.visit(ix)?;
            }
            if !progressed {
                return Ok(());
            }
        }
    }

    /// Gives the state at arena position `ix` its turn in a drain pass,
    /// returning `true` if it made progress.
    fn visit(&mut self, ix: usize) -> LocatedResult<bool> {
        let Some(state) = self.states.get(ix) else {
            return Ok(false);
        };
        if state.is_finished() {
            return Ok(false);
        }

        let mut progressed = false;
        if !state.is_bound() {
            self.step_state(ix)?;
            progressed = true;
        }

        if let Some(AwaitCondition::Task { dependency }) = self.states[ix].awaiting().cloned() {
            let released = self
                .states
                .get(dependency.index())
                .map_or(false, ExecutionState::is_finished);
            if released {
                self.states[ix].clear_await();
            }
        }

        match self.config.drain_strategy {
            DrainStrategy::RoundRobin => {
                if self.states[ix].is_runnable() {
                    self.step_state(ix)?;
                    progressed = true;
                }
            }
            DrainStrategy::RunToBlock => {
                while self.states[ix].is_runnable() {
                    self.step_state(ix)?;
                    progressed = true;
                }
            }
        }

        Ok(progressed)
    }

    /// Steps the state at arena position `ix` once and applies the effects of
    /// the step.
    fn step_state(&mut self, ix: usize) -> LocatedResult<()> {
        let mut effects = StepEffects::default();

        let (id, result) = {
            let (before, rest) = self.states.split_at_mut(ix);
            let Some((current, after)) = rest.split_first_mut() else {
                return Ok(());
            };
            let id = current.id();
            let neighbours = Neighbours { before, after };
            let mut ctx = TaskContext::new(
                current,
                neighbours,
                &self.tasks,
                self.dut.as_mut(),
                self.oracle.as_mut(),
                &mut self.constraints,
                &self.config,
                &mut effects,
            );
            (id, stepper::step(&mut ctx))
        };

        self.states.append(&mut effects.spawned);
        self.failures.add_many(effects.failures);
        self.finish_requested |= effects.finish_requested;

        match result {
            Ok(StepOutcome::Finished) => {
                debug!(state = %id, cycle = self.dut.cycle(), "state finished");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(error) if error.is_fatal() => Err(error.locate(id)),
            Err(error) => {
                self.fault(ix, error);
                Ok(())
            }
        }
    }

    /// Stops the state at arena position `ix` because of `error`, buffering
    /// the error.
    fn fault(&mut self, ix: usize, error: Error) {
        if let Some(state) = self.states.get_mut(ix) {
            let id = state.id();
            warn!(state = %id, task = state.task().name(), %error, "state faulted");
            state.fault();
            self.errors.add(error.locate(id));
        }
    }

    /// Collects the buffered errors along with the fatal `error`.
    fn abort(&mut self, error: LocatedError) -> Errors {
        warn!(%error, "run aborted");
        let mut errors = mem::take(&mut self.errors);
        errors.add(error);
        errors
    }

    /// Gets the handle for the next state added to the arena.
    fn next_state_id(&self) -> Result<StateId> {
        if self.states.len() >= self.config.maximum_states {
            return Err(Error::StateLimitExceeded {
                limit: self.config.maximum_states,
            });
        }
        StateId::from_index(self.states.len())
    }

    /// Gets all execution states in arena order.
    #[must_use]
    pub fn states(&self) -> &[ExecutionState] {
        self.states.as_slice()
    }

    /// Gets the state `id`, if it exists.
    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&ExecutionState> {
        self.states.get(id.index())
    }

    /// Checks whether every execution state has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.states.iter().all(ExecutionState::is_finished)
    }

    #[must_use]
    pub fn trace(&self) -> &BranchTrace {
        &self.trace
    }

    /// Gets the assertion failures that were recorded during the run.
    #[must_use]
    pub fn failures(&self) -> &Errors {
        &self.failures
    }

    /// Gets the errors that have faulted states since the last run returned.
    #[must_use]
    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    #[must_use]
    pub fn constraints(&self) -> &[Term] {
        self.constraints.as_slice()
    }

    #[must_use]
    pub fn dut(&self) -> &dyn Dut {
        self.dut.as_ref()
    }

    pub fn dut_mut(&mut self) -> &mut dyn Dut {
        self.dut.as_mut()
    }

    pub fn oracle_mut(&mut self) -> &mut dyn Oracle {
        self.oracle.as_mut()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gets the number of macro-steps that advanced the design.
    #[must_use]
    pub fn macro_steps(&self) -> usize {
        self.macro_steps
    }

    /// Consumes the scheduler, returning its arena, branch trace, and recorded
    /// assertion failures.
    #[must_use]
    pub fn consume(self) -> (Vec<ExecutionState>, BranchTrace, Errors) {
        (self.states, self.trace, self.failures)
    }
}

/// How the drain phase steps a runnable state on each visit.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DrainStrategy {
    /// One statement per visit, interleaving runnable states.
    #[default]
    RoundRobin,

    /// Statements until the state blocks or finishes.
    RunToBlock,
}

/// What happens when an assertion has a counterexample.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum AssertionPolicy {
    /// Record the failure and let the task continue.
    #[default]
    Record,

    /// Stop the run with the failure.
    Abort,
}

/// What happens when a condition can be neither true nor false.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ContradictionPolicy {
    /// Fault the offending state and let the others continue.
    #[default]
    Isolate,

    /// Stop the run with the contradiction.
    Abort,
}

/// The configuration for the scheduler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The maximum number of macro-steps in a run, if any.
    ///
    /// Defaults to [`None`].
    pub step_bound: Option<usize>,

    /// How the drain phase steps runnable states.
    ///
    /// Defaults to [`DrainStrategy::RoundRobin`].
    pub drain_strategy: DrainStrategy,

    /// Defaults to [`AssertionPolicy::Record`].
    pub assertion_policy: AssertionPolicy,

    /// Defaults to [`ContradictionPolicy::Isolate`].
    pub contradiction_policy: ContradictionPolicy,

    /// The maximum number of execution states, including finished ones.
    ///
    /// This limit is enforced globally to prevent exponential blowup of states
    /// when symbolic conditions fork on every cycle.
    ///
    /// Defaults to [`DEFAULT_MAXIMUM_STATES`].
    pub maximum_states: usize,

    /// Whether the decisions of the branch resolver are recorded.
    ///
    /// Defaults to [`DEFAULT_RECORD_TRACE`].
    pub record_trace: bool,
}

impl Config {
    /// Sets the `step_bound` config parameter to `value`.
    #[must_use]
    pub fn with_step_bound(mut self, value: Option<usize>) -> Self {
        self.step_bound = value;
        self
    }

    /// Sets the `drain_strategy` config parameter to `value`.
    #[must_use]
    pub fn with_drain_strategy(mut self, value: DrainStrategy) -> Self {
        self.drain_strategy = value;
        self
    }

    /// Sets the `assertion_policy` config parameter to `value`.
    #[must_use]
    pub fn with_assertion_policy(mut self, value: AssertionPolicy) -> Self {
        self.assertion_policy = value;
        self
    }

    /// Sets the `contradiction_policy` config parameter to `value`.
    #[must_use]
    pub fn with_contradiction_policy(mut self, value: ContradictionPolicy) -> Self {
        self.contradiction_policy = value;
        self
    }

    /// Sets the `maximum_states` config parameter to `value`.
    #[must_use]
    pub fn with_maximum_states(mut self, value: usize) -> Self {
        self.maximum_states = value;
        self
    }

    /// Sets the `record_trace` config parameter to `value`.
    #[must_use]
    pub fn with_record_trace(mut self, value: bool) -> Self {
        self.record_trace = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step_bound:           None,
            drain_strategy:       DrainStrategy::default(),
            assertion_policy:     AssertionPolicy::default(),
            contradiction_policy: ContradictionPolicy::default(),
            maximum_states:       DEFAULT_MAXIMUM_STATES,
            record_trace:         DEFAULT_RECORD_TRACE,
        }
    }
}
