//! This module contains the [`ExecutionState`], the record of one running (or
//! finished) instantiation of a task, and the [`StateId`] handles that name
//! execution states in the scheduler's arena.

use std::{collections::BTreeMap, fmt::Display, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{
    error::execution::{Error, Result},
    scheduler::await_condition::AwaitCondition,
    task::{Arguments, TaskDefinition, TaskId, Value},
    term::Term,
};

/// A handle to an execution state in the scheduler's arena.
///
/// The arena never removes states, so a handle stays valid for the lifetime of
/// the scheduler that issued it.
#[derive(
    Copy, Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct StateId(u32);

impl StateId {
    /// The pseudo-state to which errors raised outside of any task, such as by
    /// the harness driving the scheduler, are attributed.
    pub const HARNESS: Self = Self(u32::MAX);

    /// Constructs a state handle from the raw arena `index`.
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Constructs a state handle for the arena position `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `index` cannot be represented as a handle.
    pub fn from_index(index: usize) -> Result<Self> {
        u32::try_from(index)
            .ok()
            .filter(|raw| *raw != u32::MAX)
            .map(Self)
            .ok_or(Error::StateLimitExceeded {
                limit: u32::MAX as usize,
            })
    }

    /// Gets the position of the state in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub fn is_harness(self) -> bool {
        self == Self::HARNESS
    }
}

impl Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_harness() {
            write!(f, "harness")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// One instantiation of a task bound to its invocation arguments.
///
/// # Program Counter
///
/// The program counter is `-1` until the invocation arguments have been bound
/// into the locals, and otherwise indexes the next statement to execute. A
/// program counter at or past the end of the statements means the task is
/// about to finish without a return value.
///
/// # Invariants
///
/// A finished state never has a pending await, and its path conditions only
/// ever grow.
#[derive(Clone, Debug)]
pub struct ExecutionState {
    /// The handle of this state in the arena.
    id: StateId,

    /// The handle of the task that this state executes.
    task_id: TaskId,

    /// The task that this state executes, shared with every other state of
    /// the same task.
    task: Rc<TaskDefinition>,

    program_counter: i64,

    locals: BTreeMap<String, Value>,

    /// What the state is blocked on, if anything.
    await_condition: Option<AwaitCondition>,

    finished: bool,

    /// Whether the state stopped because of an error.
    faulted: bool,

    return_value: Option<Value>,

    /// The branch choices that led to this state, in the order they were made.
    path_conditions: Vec<Term>,

    /// The arguments the state was invoked with, retained until they are
    /// bound.
    args: Arguments,

    /// The state that this one was forked from, if any.
    forked_from: Option<StateId>,
}

impl ExecutionState {
    /// Constructs a new, unbound, execution state for the task `task`.
    #[must_use]
    pub fn new(id: StateId, task_id: TaskId, task: Rc<TaskDefinition>, args: Arguments) -> Self {
        Self {
            id,
            task_id,
            task,
            program_counter: -1,
            locals: BTreeMap::new(),
            await_condition: None,
            finished: false,
            faulted: false,
            return_value: None,
            path_conditions: Vec::new(),
            args,
            forked_from: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> StateId {
        self.id
    }

    #[must_use]
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    #[must_use]
    pub fn task(&self) -> &Rc<TaskDefinition> {
        &self.task
    }

    #[must_use]
    pub fn program_counter(&self) -> i64 {
        self.program_counter
    }

    /// Checks whether the invocation arguments have been bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.program_counter >= 0
    }

    /// Gets the index of the next statement, if the arguments are bound.
    #[must_use]
    pub fn statement_index(&self) -> Option<usize> {
        usize::try_from(self.program_counter).ok()
    }

    #[must_use]
    pub fn locals(&self) -> &BTreeMap<String, Value> {
        &self.locals
    }

    /// Gets the local variable `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no such local.
    pub fn local(&self, name: &str) -> Result<&Value> {
        self.locals
            .get(name)
            .ok_or_else(|| Error::NoSuchLocal { name: name.into() })
    }

    /// Binds the local variable `name` to `value`, returning the previous
    /// value.
    pub fn set_local(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.locals.insert(name.into(), value.into())
    }

    #[must_use]
    pub fn awaiting(&self) -> Option<&AwaitCondition> {
        self.await_condition.as_ref()
    }

    /// Sets what the state is blocked on.
    ///
    /// Finished states never block, so this does nothing on them.
    pub fn set_await(&mut self, condition: AwaitCondition) {
        if !self.finished {
            self.await_condition = Some(condition);
        }
    }

    /// Makes the state runnable.
    pub fn clear_await(&mut self) {
        self.await_condition = None;
    }

    /// Moves a pending cycle countdown forward by one cycle, making the state
    /// runnable once the countdown elapses.
    pub fn tick(&mut self) {
        if let Some(condition) = &mut self.await_condition {
            if condition.tick() {
                self.await_condition = None;
            }
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Checks whether the scheduler may step this state.
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        !self.finished && self.await_condition.is_none()
    }

    #[must_use]
    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    #[must_use]
    pub fn path_conditions(&self) -> &[Term] {
        self.path_conditions.as_slice()
    }

    /// Records the branch choice `condition`.
    pub fn push_path_condition(&mut self, condition: Term) {
        self.path_conditions.push(condition);
    }

    #[must_use]
    pub fn args(&self) -> &Arguments {
        &self.args
    }

    #[must_use]
    pub fn forked_from(&self) -> Option<StateId> {
        self.forked_from
    }

    /// Binds the invocation arguments into the locals and points the program
    /// counter at the first statement.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the arguments do not fit the task's parameters.
    pub fn bind_arguments(&mut self) -> Result<()> {
        if self.is_bound() {
            return Ok(());
        }
        let bound = self.task.params().bind(self.task.name(), &self.args)?;
        self.locals.extend(bound);
        self.args = Arguments::default();
        self.program_counter = 0;

        Ok(())
    }

    /// Moves the program counter to the next statement.
    pub fn advance(&mut self) {
        self.program_counter += 1;
    }

    /// Marks the state as finished with the provided `return_value`.
    pub fn finish(&mut self, return_value: Option<Value>) {
        self.finished = true;
        self.await_condition = None;
        self.return_value = return_value;
    }

    /// Marks the state as stopped by an error.
    pub fn fault(&mut self) {
        self.faulted = true;
        self.finish(None);
    }

    /// Creates a copy of this state under the handle `id`.
    ///
    /// The copy shares the task definition, has its own copies of the locals
    /// and path conditions, and does not inherit the pending await.
    #[must_use]
    pub fn fork(&self, id: StateId) -> Self {
        let mut forked = self.clone();
        forked.id = id;
        forked.await_condition = None;
        forked.forked_from = Some(self.id);
        forked
    }
}
