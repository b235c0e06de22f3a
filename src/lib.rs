//! This library implements a testbench for clocked hardware designs in which
//! verification tasks run alongside a cycle-level simulation of the design,
//! and in which a task that waits on a symbolic condition is forked into one
//! execution state per feasible outcome of that condition.
//!
//! It is not a simulator for hardware description languages. The design is
//! provided as a [`dut::TransitionSystem`] or through any implementation of
//! [`dut::Dut`].
//!
//! # How it Works
//!
//! From a very high level, a verification run proceeds as follows:
//!
//! 1. The design is described as a [`dut::TransitionSystem`] of inputs, state
//!    elements and wires over [`term::Term`]s, and is wrapped in a
//!    [`dut::SymbolicSimulator`] that evaluates it one cycle at a time.
//! 2. Verification tasks are written as [`task::TaskDefinition`]s, sequences of
//!    statements that drive inputs, read signals, and wait on cycles, other
//!    tasks, or conditions over the design.
//! 3. The [`scheduler::Scheduler`] runs every task until it blocks, advances
//!    the design by one cycle, and then resolves what the blocked tasks were
//!    waiting on. Conditions that involve free variables are decided by a
//!    [`solver::Oracle`], and a condition that can go either way forks the
//!    waiting execution state.
//! 4. When the run ends, the execution states, their path conditions, and the
//!    [`scheduler::trace::BranchTrace`] of every decision can be inspected.
//!
//! # Basic Usage
//!
//! For the most basic usage of the library, it is sufficient to construct a
//! testbench with [`new`], initialize it, register and invoke some tasks, and
//! then call `.run`.
//!
//! ```
//! use symbolic_testbench::{
//!     dut::{SymbolicSimulator, TransitionSystem},
//!     scheduler::{Config, RunOutcome},
//!     solver::SmtSolver,
//!     task::{Arguments, TaskDefinition},
//!     term::Term,
//!     watchdog::LazyWatchdog,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut system = TransitionSystem::new();
//! let request = system.add_input("request", 2)?;
//! system.add_state("count", 2)?;
//! system.set_init("count", Term::constant(0, 2))?;
//! system.set_next("count", request)?;
//!
//! let mut bench = symbolic_testbench::new(
//!     "count",
//!     SymbolicSimulator::new(system),
//!     SmtSolver::default().boxed(),
//!     Config::default().with_step_bound(Some(3)),
//!     LazyWatchdog.in_rc(),
//! )
//! .set_init(Vec::<(String, Term)>::new())?;
//!
//! // The request input is never driven, so the count is free on every cycle.
//! let watch = bench.register(
//!     TaskDefinition::new("watch")
//!         .exec(|ctx| ctx.wait_on(Term::signal("count", 2).equals(Term::constant(3, 2))))
//!         .returns(|ctx| Ok(ctx.signal("count")?.into())),
//! );
//! bench.invoke(watch, Arguments::new())?;
//!
//! let done = bench.run();
//! assert_eq!(done.outcome(), Ok(RunOutcome::BoundReached));
//! assert_eq!(done.trace().fork_count(), 3);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod constant;
pub mod dut;
pub mod error;
pub mod scheduler;
pub mod solver;
pub mod task;
pub mod term;
pub mod testbench;
pub mod watchdog;

// Re-exports to provide the library interface.
pub use testbench::{new, Testbench};
