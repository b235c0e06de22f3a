//! This module contains the [`BranchTrace`], a record of every decision the
//! branch resolver made during a run.
//!
//! The trace is ordered by the scheduler's deterministic iteration order, so
//! two runs of the same testbench produce identical traces.

use serde::{Deserialize, Serialize};

use crate::scheduler::state::StateId;

/// How the branch resolver classified a condition.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchOutcome {
    /// Only the condition could hold, so the state was released.
    OnlyTrue,

    /// Only the negated condition could hold, so the state stayed blocked.
    OnlyFalse,

    /// Both could hold, so the state was forked and `true_branch` was created
    /// to continue as if the condition held.
    Forked { true_branch: StateId },

    /// Neither could hold under the state's path condition.
    Contradiction,
}

/// A single decision made by the branch resolver.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BranchDecision {
    /// The macro-step during which the decision was made, counting from zero.
    pub macro_step: usize,

    /// The design cycle that the condition was instantiated on.
    pub cycle: usize,

    /// The state whose condition was resolved.
    pub state: StateId,

    /// The name of the task that the state executes.
    pub task: String,

    /// The condition, instantiated on `cycle`.
    pub condition: String,

    pub outcome: BranchOutcome,
}

/// The decisions of a run in the order they were made.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct BranchTrace {
    decisions: Vec<BranchDecision>,
}

impl BranchTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `decision` to the trace.
    pub fn record(&mut self, decision: BranchDecision) {
        self.decisions.push(decision);
    }

    #[must_use]
    pub fn decisions(&self) -> &[BranchDecision] {
        self.decisions.as_slice()
    }

    /// Gets the decisions made about the state `state`.
    pub fn for_state(&self, state: StateId) -> impl Iterator<Item = &BranchDecision> {
        self.decisions.iter().filter(move |d| d.state == state)
    }

    /// Counts the decisions that forked a state.
    #[must_use]
    pub fn fork_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d.outcome, BranchOutcome::Forked { .. }))
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Renders the trace as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the trace cannot be serialized.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod test {
    use crate::scheduler::{
        state::StateId,
        trace::{BranchDecision, BranchOutcome, BranchTrace},
    };

    fn decision(state: u32, outcome: BranchOutcome) -> BranchDecision {
        BranchDecision {
            macro_step: 0,
            cycle: 1,
            state: StateId::new(state),
            task: "watcher".into(),
            condition: "(in@0 == 2'd0)".into(),
            outcome,
        }
    }

    #[test]
    fn counts_forks_and_filters_by_state() {
        let mut trace = BranchTrace::new();
        trace.record(decision(0, BranchOutcome::Forked {
            true_branch: StateId::new(1),
        }));
        trace.record(decision(1, BranchOutcome::OnlyTrue));
        trace.record(decision(0, BranchOutcome::OnlyFalse));

        assert_eq!(trace.len(), 3);
        assert_eq!(trace.fork_count(), 1);
        assert_eq!(trace.for_state(StateId::new(0)).count(), 2);
    }

    #[test]
    fn serializes_to_json() -> anyhow::Result<()> {
        let mut trace = BranchTrace::new();
        trace.record(decision(0, BranchOutcome::Forked {
            true_branch: StateId::new(1),
        }));

        let json = trace.to_json()?;
        assert!(json.contains("\"forked\""));
        assert!(json.contains("\"true_branch\": 1"));

        let parsed: BranchTrace = serde_json::from_str(&json)?;
        assert_eq!(parsed, trace);

        Ok(())
    }
}
