//! This module contains the [`AwaitCondition`] that describes what a blocked
//! execution state is waiting for.

use std::fmt::Display;

use crate::{
    error::execution::{Error, Result},
    scheduler::state::StateId,
    term::Term,
};

/// The reason that an execution state is not currently runnable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AwaitCondition {
    /// Waiting for `remaining` more cycles to elapse.
    Cycle { remaining: usize },

    /// Waiting for the execution state `dependency` to finish.
    Task { dependency: StateId },

    /// Waiting for the one-bit term `expr`, written over design signals, to
    /// become true.
    Condition { expr: Term },
}

impl AwaitCondition {
    /// Constructs a countdown of `cycles` cycles.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `cycles` is zero.
    pub fn cycles(cycles: usize) -> Result<Self> {
        if cycles == 0 {
            return Err(Error::InvalidCycleCount { requested: cycles });
        }
        Ok(Self::Cycle { remaining: cycles })
    }

    /// Constructs a wait on the condition `expr`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `expr` is not one bit wide.
    pub fn condition(expr: Term) -> Result<Self> {
        if !expr.is_boolean() {
            let width = expr.width();
            return Err(Error::NotACondition { expr, width });
        }
        Ok(Self::Condition { expr })
    }

    /// Counts down one cycle, returning `true` if the wait has elapsed.
    ///
    /// Only [`Self::Cycle`] waits are affected by time.
    pub fn tick(&mut self) -> bool {
        match self {
            Self::Cycle { remaining } => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            _ => false,
        }
    }
}

impl Display for AwaitCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cycle { remaining } => write!(f, "{remaining} cycle(s)"),
            Self::Task { dependency } => write!(f, "state {dependency}"),
            Self::Condition { expr } => write!(f, "{expr}"),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::execution::Error,
        scheduler::{await_condition::AwaitCondition, state::StateId},
        term::Term,
    };

    #[test]
    fn cycle_counts_must_be_positive() {
        assert_eq!(
            AwaitCondition::cycles(0),
            Err(Error::InvalidCycleCount { requested: 0 })
        );
        assert_eq!(
            AwaitCondition::cycles(2),
            Ok(AwaitCondition::Cycle { remaining: 2 })
        );
    }

    #[test]
    fn conditions_must_be_one_bit() {
        let wide = Term::signal("data", 8);

        assert_eq!(
            AwaitCondition::condition(wide.clone()),
            Err(Error::NotACondition {
                expr:  wide,
                width: 8,
            })
        );
    }

    #[test]
    fn only_countdowns_tick() -> anyhow::Result<()> {
        let mut countdown = AwaitCondition::cycles(1)?;
        let mut dependency = AwaitCondition::Task {
            dependency: StateId::new(0),
        };
        let mut condition = AwaitCondition::condition(Term::signal("ready", 1))?;

        assert!(countdown.tick());
        assert!(!dependency.tick());
        assert!(!condition.tick());
        assert_eq!(
            condition,
            AwaitCondition::Condition {
                expr: Term::signal("ready", 1),
            }
        );

        Ok(())
    }
}
