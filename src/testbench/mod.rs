//! This module contains the definition of the testbench, the entry point that
//! ties a design, an oracle and a set of verification tasks together.

pub mod state;

use tracing::info;

use crate::{
    dut::{DynDut, SymbolicSimulator},
    error,
    error::simulation,
    scheduler,
    scheduler::{
        state::{ExecutionState, StateId},
        trace::BranchTrace,
        MacroStep,
        RunOutcome,
        Scheduler,
    },
    solver::DynOracle,
    task::{Arguments, TaskDefinition, TaskId, Value},
    term::Term,
    testbench::state::State,
    watchdog::DynWatchdog,
};

/// Creates a new testbench for the design simulated by `simulator`, with the
/// provided `oracle`, scheduler `config` and `watchdog`.
#[must_use]
pub fn new(
    name: impl Into<String>,
    simulator: SymbolicSimulator,
    oracle: DynOracle,
    config: scheduler::Config,
    watchdog: DynWatchdog,
) -> Testbench<state::Uninitialized> {
    let state = state::Uninitialized {
        simulator,
        oracle,
        config,
        watchdog,
    };
    Testbench {
        name: name.into(),
        state,
    }
}

/// Creates a testbench that is ready to run around an arbitrary `dut`, which
/// must already have been initialized.
///
/// # Errors
///
/// Returns [`Err`] if `dut` has not been initialized.
pub fn from_dut(
    name: impl Into<String>,
    dut: DynDut,
    oracle: DynOracle,
    config: scheduler::Config,
    watchdog: DynWatchdog,
) -> error::Result<Testbench<state::Ready>> {
    if !dut.is_initialized() {
        return Err(simulation::Error::NotInitialized.into());
    }
    let scheduler = Scheduler::new(dut, oracle, config, watchdog);
    Ok(Testbench {
        name: name.into(),
        state: state::Ready { scheduler },
    })
}

/// The testbench is responsible for driving a verification run from the
/// initialization of the design to the inspection of its results.
///
/// # Enforcing Valid State Transitions
///
/// The testbench enforces that only correct state transitions can occur
/// through use of structs that implement the exact state required by it at any
/// given point. Tasks cannot be invoked before the design has starting values,
/// and results cannot be read before the run has happened.
///
/// There is the [`Self::state`] function that provides access to the state
/// data of whichever state the testbench is currently in.
#[derive(Debug)]
pub struct Testbench<S: State> {
    /// The name of the testbench, used when logging.
    name: String,

    /// The internal state of the testbench.
    state: S,
}

/// The operations available in all states.
impl<S: State> Testbench<S> {
    /// Gets the name of the testbench.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets an immutable reference to the current state of the testbench.
    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Moves the testbench into the state produced by `transform`, keeping its
    /// name.
    fn transform<NS: State>(
        self,
        transform: impl FnOnce(S) -> error::Result<NS>,
    ) -> error::Result<Testbench<NS>> {
        let name = self.name;
        let state = transform(self.state)?;
        Ok(Testbench { name, state })
    }
}

/// Operations available on an uninitialized testbench.
impl Testbench<state::Uninitialized> {
    /// Gets the simulator so that defaults can be set up before
    /// initialization.
    pub fn simulator_mut(&mut self) -> &mut SymbolicSimulator {
        &mut self.state.simulator
    }

    /// Initializes the design from its declared initial values, with the
    /// values in `overrides` taking precedence.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if an override does not name a state element of the
    /// right width.
    pub fn set_init<N: Into<String>>(
        self,
        overrides: impl IntoIterator<Item = (N, Term)>,
    ) -> error::Result<Testbench<state::Ready>> {
        self.initialize(|simulator| simulator.set_init(overrides))
    }

    /// Initializes the design from free variables, with the values in
    /// `overrides` taking precedence.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if an override does not name a state element of the
    /// right width.
    pub fn free_init<N: Into<String>>(
        self,
        overrides: impl IntoIterator<Item = (N, Term)>,
    ) -> error::Result<Testbench<state::Ready>> {
        self.initialize(|simulator| simulator.free_init(overrides))
    }

    fn initialize(
        self,
        init: impl FnOnce(&mut SymbolicSimulator) -> simulation::Result<()>,
    ) -> error::Result<Testbench<state::Ready>> {
        self.transform(|mut old| {
            init(&mut old.simulator)?;
            old.simulator.log_current_frame();
            let scheduler =
                Scheduler::new(old.simulator.boxed(), old.oracle, old.config, old.watchdog);
            Ok(state::Ready { scheduler })
        })
    }
}

/// Operations available on a testbench that is ready to run.
impl Testbench<state::Ready> {
    /// Registers `task`, returning the handle used to invoke it.
    pub fn register(&mut self, task: TaskDefinition) -> TaskId {
        self.state.scheduler.register(task)
    }

    /// Invokes `task` with `args`, returning a handle to the execution state
    /// that will run it.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no such task, if `args` do not fit its
    /// parameters, or if the state limit has been reached.
    pub fn invoke(&mut self, task: TaskId, args: Arguments) -> error::Result<StateId> {
        Ok(self.state.scheduler.invoke(task, args)?)
    }

    /// Returns the design to the cycle before its most recent advance.
    ///
    /// The execution states are left as they are, so this is meant for
    /// exploring the design from the harness between runs.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the design has not been advanced.
    pub fn back_step(&mut self) -> error::Result<()> {
        self.state.scheduler.dut_mut().back_step()?;
        info!(
            testbench = %self.name,
            cycle = self.state.scheduler.dut().cycle(),
            "design stepped back"
        );
        Ok(())
    }

    /// Assigns `value` to the input `name` whenever no task has written it in a
    /// cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` is not an input or `value` has the wrong
    /// width.
    pub fn write_default(&mut self, name: &str, value: Term) -> error::Result<()> {
        Ok(self.state.scheduler.dut_mut().write_default(name, value)?)
    }

    /// Adds `constraint`, read on the current cycle, to the assumptions of
    /// every query made during the run.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `constraint` is not a condition over existing
    /// signals.
    pub fn add_constraint(&mut self, constraint: Term) -> error::Result<()> {
        Ok(self.state.scheduler.add_constraint(constraint)?)
    }

    /// Removes the constraint at position `index`, counting in the order the
    /// constraints were added, and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no constraint at `index`.
    pub fn unset_constraint(&mut self, index: usize) -> error::Result<Term> {
        Ok(self.state.scheduler.unset_constraint(index)?)
    }

    /// Removes every constraint.
    pub fn clear_constraints(&mut self) {
        self.state.scheduler.clear_constraints();
    }

    /// Checks whether `expr` must hold on the current cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `expr` is not a condition, if the oracle cannot
    /// answer, or if the check fails and the scheduler is configured to abort
    /// on failed assertions.
    pub fn check_assertion(&mut self, expr: &Term) -> error::Result<bool> {
        Ok(self.state.scheduler.check_assertion(expr)?)
    }

    /// Checks whether every property of the design holds on the current
    /// cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] under the same conditions as
    /// [`Self::check_assertion`].
    pub fn check_properties(&mut self) -> error::Result<bool> {
        Ok(self.state.scheduler.check_properties()?)
    }

    /// Performs a single macro-step without leaving the ready state.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a fatal error occurs during the macro-step.
    pub fn macro_step(&mut self) -> error::Result<MacroStep> {
        Ok(self.state.scheduler.macro_step()?)
    }

    /// Gets the scheduler, for inspection of the states before the run.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.state.scheduler
    }

    /// Gets the scheduler mutably, for driving it directly.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.state.scheduler
    }

    /// Runs the scheduler until every task finishes, the step bound is
    /// reached, a task asks to finish, or the watchdog fires.
    ///
    /// The run itself never fails to produce a completed testbench, as the
    /// errors it raised are part of its results.
    #[must_use]
    pub fn run(self) -> Testbench<state::RunComplete> {
        let Self { name, state } = self;
        let mut scheduler = state.scheduler;
        let outcome = scheduler.run().map_err(error::Errors::from);

        match &outcome {
            Ok(outcome) => info!(testbench = %name, ?outcome, "testbench run finished"),
            Err(errors) => info!(
                testbench = %name,
                errors = errors.len(),
                "testbench run finished with errors"
            ),
        }

        Testbench {
            name,
            state: state::RunComplete { scheduler, outcome },
        }
    }
}

/// Operations available on a testbench whose run has finished.
impl Testbench<state::RunComplete> {
    /// Gets how the run ended.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] with every error raised during the run if it was
    /// aborted or if any execution state was faulted.
    pub fn outcome(&self) -> Result<RunOutcome, &error::Errors> {
        self.state.outcome.as_ref().copied()
    }

    /// Checks whether the run ended without errors and without recorded
    /// assertion failures.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state.outcome.is_ok() && self.state.scheduler.failures().is_empty()
    }

    /// Gets the assertion failures that were recorded during the run.
    #[must_use]
    pub fn failures(&self) -> error::Errors {
        self.state.scheduler.failures().clone().into()
    }

    /// Gets the decisions made by the branch resolver during the run.
    #[must_use]
    pub fn trace(&self) -> &BranchTrace {
        self.state.scheduler.trace()
    }

    /// Gets every execution state, including those created by forking.
    #[must_use]
    pub fn states(&self) -> &[ExecutionState] {
        self.state.scheduler.states()
    }

    /// Gets the execution state with the handle `id`.
    #[must_use]
    pub fn execution_state(&self, id: StateId) -> Option<&ExecutionState> {
        self.state.scheduler.state(id)
    }

    /// Gets the value returned by the execution state `id`, if it has returned
    /// one.
    #[must_use]
    pub fn return_value(&self, id: StateId) -> Option<&Value> {
        self.execution_state(id)?.return_value()
    }

    /// Gets the scheduler, for inspection of the design after the run.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.state.scheduler
    }

    /// Consumes the testbench, returning how the run ended.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] with every error raised during the run if it was
    /// aborted or if any execution state was faulted.
    pub fn into_outcome(self) -> error::Result<RunOutcome> {
        self.state.outcome
    }
}
