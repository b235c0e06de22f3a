//! This module contains the [`TaskContext`], through which the body of a
//! statement interacts with its own execution state, the device under test,
//! the oracle, and the scheduler.
//!
//! # Evaluation Modes
//!
//! Signal reads made with [`TaskContext::signal`] are _interpreted_: they
//! yield the value of the signal on the current cycle. The wait primitive
//! [`TaskContext::wait_cond`] instead evaluates its condition in
//! [`EvalMode::Symbolic`], where signal reads yield uninstantiated references
//! that the branch resolver binds to whatever cycle it later checks the
//! condition on. The mode is always an explicit argument to
//! [`TaskContext::eval`].

use std::{collections::BTreeMap, rc::Rc};

use tracing::{trace, warn};

use crate::{
    dut::Dut,
    error::{
        container::Locatable,
        execution::{Error, LocatedError, Result},
        simulation,
    },
    scheduler::{
        await_condition::AwaitCondition,
        state::{ExecutionState, StateId},
        AssertionPolicy,
        Config,
    },
    solver::Oracle,
    task::{Arguments, TaskDefinition, TaskId, Value},
    term::Term,
};

/// How signal reads are treated while evaluating an expression.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EvalMode {
    /// Signal reads yield their value on the current cycle.
    Interpreted,

    /// Signal reads yield [`Term::Signal`] references.
    Symbolic,
}

/// A read-only view of the world used to evaluate an expression in a given
/// [`EvalMode`].
#[derive(Debug)]
pub struct Env<'a> {
    mode:   EvalMode,
    dut:    &'a dyn Dut,
    locals: &'a BTreeMap<String, Value>,
}

impl<'a> Env<'a> {
    #[must_use]
    pub fn mode(&self) -> EvalMode {
        self.mode
    }

    /// Reads the signal `name` according to the evaluation mode.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the design has no such signal.
    pub fn signal(&self, name: &str) -> Result<Term> {
        match self.mode {
            EvalMode::Interpreted => Ok(self.dut.read_signal(name)?),
            EvalMode::Symbolic => Ok(Term::signal(name, self.dut.signal_width(name)?)),
        }
    }

    /// Reads the local variable `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no such local.
    pub fn local(&self, name: &str) -> Result<&'a Value> {
        self.locals
            .get(name)
            .ok_or_else(|| Error::NoSuchLocal { name: name.into() })
    }
}

/// The execution states other than the one being stepped.
///
/// The arena is split around the stepped state so that it can be mutated
/// while the others are inspected.
#[derive(Debug)]
pub struct Neighbours<'a> {
    pub(crate) before: &'a [ExecutionState],
    pub(crate) after:  &'a [ExecutionState],
}

impl<'a> Neighbours<'a> {
    /// Gets the state `id`, unless it is the stepped state or does not exist.
    #[must_use]
    pub fn get(&self, id: StateId) -> Option<&'a ExecutionState> {
        let ix = id.index();
        let split = self.before.len();
        if ix < split {
            self.before.get(ix)
        } else {
            self.after.get(ix.checked_sub(split + 1)?)
        }
    }

    /// Gets the number of states in the arena, including the stepped state.
    #[must_use]
    pub fn arena_len(&self) -> usize {
        self.before.len() + 1 + self.after.len()
    }
}

/// The effects of a step that the scheduler applies once the step completes.
#[derive(Debug, Default)]
pub struct StepEffects {
    /// States created by invoking tasks, in invocation order.
    pub spawned: Vec<ExecutionState>,

    /// Assertion failures recorded rather than raised.
    pub failures: Vec<LocatedError>,

    /// Whether a task asked for the run to finish.
    pub finish_requested: bool,
}

/// The interface between one statement and the rest of the testbench.
#[derive(Debug)]
pub struct TaskContext<'a> {
    state:       &'a mut ExecutionState,
    neighbours:  Neighbours<'a>,
    tasks:       &'a [Rc<TaskDefinition>],
    dut:         &'a mut dyn Dut,
    oracle:      &'a mut dyn Oracle,
    constraints: &'a mut Vec<Term>,
    config:      &'a Config,
    effects:     &'a mut StepEffects,
}

impl<'a> TaskContext<'a> {
    /// Constructs a context for stepping `state`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        state: &'a mut ExecutionState,
        neighbours: Neighbours<'a>,
        tasks: &'a [Rc<TaskDefinition>],
        dut: &'a mut dyn Dut,
        oracle: &'a mut dyn Oracle,
        constraints: &'a mut Vec<Term>,
        config: &'a Config,
        effects: &'a mut StepEffects,
    ) -> Self {
        Self {
            state,
            neighbours,
            tasks,
            dut,
            oracle,
            constraints,
            config,
            effects,
        }
    }

    pub(crate) fn state_mut(&mut self) -> &mut ExecutionState {
        &mut *self.state
    }

    /// Gets the handle of the executing state.
    #[must_use]
    pub fn id(&self) -> StateId {
        self.state.id()
    }

    /// Gets the name of the executing task.
    #[must_use]
    pub fn task_name(&self) -> &str {
        self.state.task().name()
    }

    /// Gets the current design cycle.
    #[must_use]
    pub fn cycle(&self) -> usize {
        self.dut.cycle()
    }

    /// Gets the branch choices that led to the executing state.
    #[must_use]
    pub fn path_conditions(&self) -> &[Term] {
        self.state.path_conditions()
    }

    /// Evaluates `expr` in the given `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `expr` does.
    pub fn eval<T>(&self, mode: EvalMode, expr: impl FnOnce(&Env<'_>) -> Result<T>) -> Result<T> {
        let env = Env {
            mode,
            dut: &*self.dut,
            locals: self.state.locals(),
        };
        expr(&env)
    }

    /// Reads the value of the signal `name` on the current cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the design has no such signal.
    pub fn signal(&self, name: &str) -> Result<Term> {
        self.eval(EvalMode::Interpreted, |env| env.signal(name))
    }

    /// Stages `value` to drive the input `name` from the next cycle. Any
    /// signals referenced by `value` are read on the current cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` is not an input that `value` fits.
    pub fn write(&mut self, name: &str, value: Term) -> Result<()> {
        Ok(self.dut.write_signal(name, value)?)
    }

    /// Stages the constant `value` to drive the input `name` from the next
    /// cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` is not an input.
    pub fn write_value(&mut self, name: &str, value: u64) -> Result<()> {
        let width = self.dut.signal_width(name)?;
        self.write(name, Term::constant(value, width))
    }

    /// Removes the staged assignment to the input `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` has no staged assignment.
    pub fn unset(&mut self, name: &str) -> Result<()> {
        Ok(self.dut.unset_signal(name)?)
    }

    /// Drives the input `name` with `value` on every cycle where it has no
    /// staged assignment.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` is not an input that `value` fits.
    pub fn write_default(&mut self, name: &str, value: Term) -> Result<()> {
        Ok(self.dut.write_default(name, value)?)
    }

    /// Removes the default assignment to the input `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` has no default assignment.
    pub fn unset_default(&mut self, name: &str) -> Result<()> {
        Ok(self.dut.unset_default(name)?)
    }

    /// Constructs a free variable that the testbench can use as a symbolic
    /// stimulus.
    #[must_use]
    pub fn var(&self, name: impl Into<String>, width: u32) -> Term {
        Term::var(name, width)
    }

    /// Adds `constraint`, read on the current cycle, to the assumptions of
    /// every later query made by any state.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `constraint` is not a condition or references a
    /// signal that does not exist.
    pub fn add_constraint(&mut self, constraint: Term) -> Result<()> {
        let constraint = self.instantiate_condition(constraint)?;
        self.constraints.push(constraint);
        Ok(())
    }

    /// Checks whether `expr`, read on the current cycle, can be true given the
    /// executing state's path condition.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the oracle cannot answer the query.
    pub fn check_sat(&mut self, expr: Term) -> Result<bool> {
        let expr = self.instantiate_condition(expr)?;
        let assumptions = self.assumptions();
        Ok(self.oracle.check_sat(&expr, &assumptions)?)
    }

    /// Checks whether `expr`, read on the current cycle, must be true given
    /// the executing state's path condition.
    ///
    /// A failing check is recorded and reported as `Ok(false)` under
    /// [`AssertionPolicy::Record`], and returned as an error under
    /// [`AssertionPolicy::Abort`].
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the oracle cannot answer the query, or if the check
    /// fails under [`AssertionPolicy::Abort`].
    pub fn check_valid(&mut self, expr: Term) -> Result<bool> {
        let expr = self.instantiate_condition(expr)?;
        let assumptions = self.assumptions();
        let counterexample = self.oracle.check_sat(&!expr.clone(), &assumptions)?;
        if !counterexample {
            return Ok(true);
        }

        let failure = Error::AssertionFailure {
            expr,
            path: self.state.path_conditions().to_vec(),
        };
        warn!(state = %self.id(), cycle = self.cycle(), %failure, "assertion failed");
        match self.config.assertion_policy {
            AssertionPolicy::Abort => Err(failure),
            AssertionPolicy::Record => {
                self.effects.failures.push(failure.locate(self.id()));
                Ok(false)
            }
        }
    }

    /// Reads the local variable `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no such local.
    pub fn local(&self, name: &str) -> Result<&Value> {
        self.state.local(name)
    }

    /// Binds the local variable `name` to `value`.
    pub fn set_local(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.state.set_local(name, value);
    }

    /// Checks whether the state `handle` has finished.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `handle` does not name a state.
    pub fn is_finished(&self, handle: StateId) -> Result<bool> {
        Ok(self.lookup(handle)?.is_finished())
    }

    /// Gets the return value of the state `handle`, if it has finished with
    /// one.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `handle` does not name a state.
    pub fn return_value(&self, handle: StateId) -> Result<Option<Value>> {
        Ok(self.lookup(handle)?.return_value().cloned())
    }

    /// Asks the scheduler to stop the run once the current macro-step ends.
    pub fn finish_simulation(&mut self) {
        self.effects.finish_requested = true;
    }

    /// Invokes the task `task` with `args`, returning a handle to the new
    /// execution state. The state first runs on the scheduler's next pass.
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

        let count = self.neighbours.arena_len() + self.effects.spawned.len();
        if count >= self.config.maximum_states {
            return Err(Error::StateLimitExceeded {
                limit: self.config.maximum_states,
            });
        }
        let id = StateId::from_index(count)?;
        trace!(parent = %self.id(), child = %id, task = definition.name(), "invoked task");

        let state = ExecutionState::new(id, task, Rc::clone(definition), args);
        self.effects.spawned.push(state);
        Ok(id)
    }

    /// Blocks the executing state for `cycles` cycles.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `cycles` is zero.
    pub fn wait_cycle(&mut self, cycles: usize) -> Result<()> {
        let condition = AwaitCondition::cycles(cycles)?;
        self.state.set_await(condition);
        Ok(())
    }

    /// Blocks the executing state until the state `handle` finishes.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `handle` names the executing state or no state at
    /// all.
    pub fn wait_task(&mut self, handle: StateId) -> Result<()> {
        if handle == self.id() {
            return Err(Error::SelfDependency);
        }
        self.lookup(handle)?;
        self.state.set_await(AwaitCondition::Task { dependency: handle });
        Ok(())
    }

    /// Blocks the executing state until the condition built by `expr` holds.
    ///
    /// The condition is evaluated in [`EvalMode::Symbolic`], so it is checked
    /// against the design on every later cycle rather than frozen to the
    /// current one.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `expr` does, or if it does not produce a condition.
    pub fn wait_cond(&mut self, expr: impl FnOnce(&Env<'_>) -> Result<Term>) -> Result<()> {
        let expr = self.eval(EvalMode::Symbolic, expr)?;
        self.wait_on(expr)
    }

    /// Blocks the executing state until the condition `expr`, written over
    /// design signals, holds.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `expr` is not a condition, or references a signal
    /// that does not exist or at a width other than the signal's own.
    pub fn wait_on(&mut self, expr: Term) -> Result<()> {
        let mut invalid = None;
        expr.visit(&mut |term| {
            let Term::Signal { name, width } = term else {
                return;
            };
            if invalid.is_some() {
                return;
            }
            invalid = match self.dut.signal_width(name) {
                Err(error) => Some(error),
                Ok(expected) if expected != *width => Some(simulation::Error::WidthMismatch {
                    name: name.clone(),
                    expected,
                    actual: *width,
                }),
                Ok(_) => None,
            };
        });
        if let Some(error) = invalid {
            return Err(error.into());
        }

        let condition = AwaitCondition::condition(expr)?;
        self.state.set_await(condition);
        Ok(())
    }

    /// Waits for a rising edge on `name`.
    ///
    /// # Errors
    ///
    /// Always returns [`Err`], as edge waits are not supported.
    pub fn wait_posedge(&mut self, name: &str) -> Result<()> {
        Err(Error::UnimplementedPrimitive {
            name: format!("wait_posedge({name})"),
        })
    }

    /// Waits for a falling edge on `name`.
    ///
    /// # Errors
    ///
    /// Always returns [`Err`], as edge waits are not supported.
    pub fn wait_negedge(&mut self, name: &str) -> Result<()> {
        Err(Error::UnimplementedPrimitive {
            name: format!("wait_negedge({name})"),
        })
    }

    /// Gets the state `handle`, which may be the executing state or one
    /// invoked during this step.
    fn lookup(&self, handle: StateId) -> Result<&ExecutionState> {
        if handle == self.state.id() {
            return Ok(&*self.state);
        }
        self.neighbours
            .get(handle)
            .or_else(|| {
                let spawned_ix = handle.index().checked_sub(self.neighbours.arena_len())?;
                self.effects.spawned.get(spawned_ix)
            })
            .ok_or(Error::DanglingHandle { state: handle })
    }

    /// Binds `expr` to the current cycle and checks that it is a condition.
    fn instantiate_condition(&self, expr: Term) -> Result<Term> {
        let expr = self.dut.instantiate(&expr)?;
        if !expr.is_boolean() {
            let width = expr.width();
            return Err(Error::NotACondition { expr, width });
        }
        Ok(expr)
    }

    /// Gets the assumptions of a query made on behalf of the executing state.
    fn assumptions(&self) -> Vec<Term> {
        let mut assumptions = self.dut.assumptions();
        assumptions.extend(self.constraints.iter().cloned());
        assumptions.extend(self.state.path_conditions().iter().cloned());
        assumptions
    }
}
