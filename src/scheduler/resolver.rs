//! This module contains the branch resolver, which decides the fate of an
//! execution state that is blocked on a symbolic condition.
//!
//! # Resolution
//!
//! The condition is bound to the cycle that the design has just advanced to,
//! and the oracle is asked whether it can be true and whether it can be false
//! under the design's assumptions and the state's path condition:
//!
//! - If only true, the state is released and records the condition.
//! - If only false, the state stays blocked and records the negation.
//! - If both, the state forks. The new state is released and records the
//!   condition, while the original keeps its identity, stays blocked, and
//!   records the negation.
//! - If neither, the path condition contradicts the design.

use tracing::{debug, warn};

use crate::{
    error::{
        container::Locatable,
        execution::{Error, LocatedResult, Result},
    },
    scheduler::{
        state::StateId,
        trace::{BranchDecision, BranchOutcome},
        ContradictionPolicy,
        Scheduler,
    },
    solver::Oracle,
    term::Term,
};

/// The satisfiability of a condition and of its negation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Classification {
    OnlyTrue,
    OnlyFalse,
    Both,
    Neither,
}

impl Classification {
    #[must_use]
    pub fn new(maybe_true: bool, maybe_false: bool) -> Self {
        match (maybe_true, maybe_false) {
            (true, false) => Self::OnlyTrue,
            (false, true) => Self::OnlyFalse,
            (true, true) => Self::Both,
            (false, false) => Self::Neither,
        }
    }
}

/// Asks `oracle` whether `condition` and its negation can each hold under
/// `assumptions`.
///
/// # Errors
///
/// Returns [`Err`] if the oracle cannot answer either query.
pub fn classify(
    oracle: &mut dyn Oracle,
    condition: &Term,
    assumptions: &[Term],
) -> Result<Classification> {
    let maybe_true = oracle.check_sat(condition, assumptions)?;
    let maybe_false = oracle.check_sat(&!condition.clone(), assumptions)?;
    Ok(Classification::new(maybe_true, maybe_false))
}

impl Scheduler {
    /// Resolves the condition `expr` that the state at arena position `ix` is
    /// blocked on.
    ///
    /// Errors that only concern the state fault it. The returned error is
    /// fatal to the run.
    pub(super) fn resolve_condition(&mut self, ix: usize, expr: &Term) -> LocatedResult<()> {
        let Some(state) = self.states.get(ix) else {
            return Ok(());
        };
        let id = state.id();
        let task = state.task().name().to_string();

        let condition = match self.dut.instantiate(expr) {
            Ok(condition) => condition,
            Err(error) => {
                self.fault(ix, error.into());
                return Ok(());
            }
        };
        let mut assumptions = self.dut.assumptions();
        assumptions.extend(self.constraints.iter().cloned());
        assumptions.extend(state.path_conditions().iter().cloned());

        let classification = match classify(self.oracle.as_mut(), &condition, &assumptions) {
            Ok(classification) => classification,
            Err(error) => {
                self.fault(ix, error);
                return Ok(());
            }
        };

        let outcome = match classification {
            Classification::OnlyTrue => {
                let state = &mut self.states[ix];
                state.clear_await();
                state.push_path_condition(condition.clone());
                BranchOutcome::OnlyTrue
            }
            Classification::OnlyFalse => {
                self.states[ix].push_path_condition(!condition.clone());
                BranchOutcome::OnlyFalse
            }
            Classification::Both => {
                let true_branch = self.next_state_id().locate(id)?;
                let mut forked = self.states[ix].fork(true_branch);
                forked.push_path_condition(condition.clone());
                self.states[ix].push_path_condition(!condition.clone());
                self.states.push(forked);
                BranchOutcome::Forked { true_branch }
            }
            Classification::Neither => {
                let error = Error::ModelContradiction {
                    condition: condition.clone(),
                    path:      self.states[ix].path_conditions().to_vec(),
                };
                self.record(id, &task, &condition, BranchOutcome::Contradiction);
                match self.config.contradiction_policy {
                    ContradictionPolicy::Abort => return Err(error.locate(id)),
                    ContradictionPolicy::Isolate => {
                        self.fault(ix, error);
                        return Ok(());
                    }
                }
            }
        };

        self.record(id, &task, &condition, outcome);
        Ok(())
    }

    /// Appends a decision to the branch trace if tracing is enabled.
    fn record(&mut self, state: StateId, task: &str, condition: &Term, outcome: BranchOutcome) {
        debug!(
            %state,
            task,
            cycle = self.dut.cycle(),
            %condition,
            ?outcome,
            "resolved condition"
        );
        if matches!(outcome, BranchOutcome::Contradiction) {
            warn!(%state, %condition, "condition contradicts the path condition");
        }
        if !self.config.record_trace {
            return;
        }

        self.trace.record(BranchDecision {
            macro_step: self.macro_steps,
            cycle: self.dut.cycle(),
            state,
            task: task.into(),
            condition: condition.to_string(),
            outcome,
        });
    }
}

#[cfg(test)]
mod test {
    use crate::{
        scheduler::resolver::{classify, Classification},
        solver::EnumerativeSolver,
        term::Term,
    };

    #[test]
    fn classifies_forced_conditions() -> anyhow::Result<()> {
        let mut oracle = EnumerativeSolver::default();
        let x = Term::var("x", 2);
        let assumptions = [x.clone().equals(Term::constant(1, 2))];

        assert_eq!(
            classify(&mut oracle, &x.clone().equals(Term::constant(1, 2)), &assumptions)?,
            Classification::OnlyTrue
        );
        assert_eq!(
            classify(&mut oracle, &x.equals(Term::constant(2, 2)), &assumptions)?,
            Classification::OnlyFalse
        );

        Ok(())
    }

    #[test]
    fn classifies_open_and_impossible_conditions() -> anyhow::Result<()> {
        let mut oracle = EnumerativeSolver::default();
        let x = Term::var("x", 2);
        let condition = x.clone().equals(Term::constant(0, 2));

        assert_eq!(classify(&mut oracle, &condition, &[])?, Classification::Both);
        assert_eq!(
            classify(&mut oracle, &condition, &[Term::bool(false)])?,
            Classification::Neither
        );

        Ok(())
    }
}
