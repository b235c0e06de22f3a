//! This module contains the [`EnumerativeSolver`], an [`Oracle`] that decides
//! satisfiability by trying every assignment to the free variables.

use std::collections::BTreeMap;

use ethnum::U256;
use tracing::trace;

use crate::{
    error::solver::{Error, Result},
    solver::{check_boolean, collect_variables, Config, Oracle},
    term::{BitVec, Term},
};

/// An assignment of values to the free variables of a query.
pub type Model = BTreeMap<String, BitVec>;

/// Formulas that are connected through their shared variables.
#[derive(Debug, Default)]
struct Group<'a> {
    variables: BTreeMap<String, u32>,
    formulas:  Vec<&'a Term>,
}

/// A satisfiability oracle that exhaustively enumerates assignments.
///
/// The cost of a query is exponential in the total width of the free variables
/// of its largest group of connected formulas, so queries are refused once that
/// width exceeds [`Config::max_free_bits`]. It is suited to small designs and
/// tests; [`crate::solver::SmtSolver`] is the general-purpose oracle.
#[derive(Clone, Debug)]
pub struct EnumerativeSolver {
    /// The configuration of the solver.
    config: Config,

    /// The asserted formulas, one entry per scope, where the first entry is the
    /// base scope that can never be popped.
    scopes: Vec<Vec<Term>>,

    /// The number of queries that have been answered.
    query_count: usize,
}

impl EnumerativeSolver {
    /// Constructs a new solver with the provided `config` and no asserted
    /// formulas.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let scopes = vec![Vec::new()];
        let query_count = 0;
        Self {
            config,
            scopes,
            query_count,
        }
    }

    /// Wraps `self` into a [`Box`] for use as a [`crate::solver::DynOracle`].
    #[must_use]
    pub fn boxed(self) -> Box<dyn Oracle> {
        Box::new(self)
    }

    /// Gets the number of queries that this solver has answered.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.query_count
    }

    /// Searches for an assignment under which every asserted formula and every
    /// one of `formulas` is true.
    ///
    /// Formulas that share no variables, directly or through other formulas,
    /// are searched independently, so the cost of a query is bounded by its
    /// largest group of connected formulas rather than by all of its variables.
    ///
    /// Returns [`None`] if there is no such assignment.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a formula is not boolean, still references a design
    /// signal, uses a variable at two different widths, or if the search space
    /// of any group is larger than the configured limit.
    pub fn find_model(&mut self, formulas: &[Term]) -> Result<Option<Model>> {
        self.query_count += 1;
        let all: Vec<&Term> = self.scopes.iter().flatten().chain(formulas.iter()).collect();
        check_boolean(all.iter().copied())?;

        let mut variables = BTreeMap::new();
        for formula in &all {
            collect_variables(formula, &mut variables)?;
        }

        // Constant formulas decide the query without any search.
        if all.iter().any(|f| f.as_const().is_some_and(|v| !v.is_true())) {
            return Ok(None);
        }
        let symbolic: Vec<&Term> = all.into_iter().filter(|f| f.as_const().is_none()).collect();

        let mut model = Model::new();
        for group in Self::connected_groups(&symbolic)? {
            match self.search(&group)? {
                Some(found) => model.extend(found),
                None => return Ok(None),
            }
        }

        Ok(Some(model))
    }

    /// Enumerates the assignments to the variables of `group` until one
    /// satisfies all of its formulas.
    fn search(&self, group: &Group<'_>) -> Result<Option<Model>> {
        let free_bits: u32 = group.variables.values().sum();
        if free_bits > self.config.max_free_bits {
            return Err(Error::SearchSpaceExceeded {
                requested: free_bits,
                limit:     self.config.max_free_bits,
            });
        }
        trace!(
            formulas = group.formulas.len(),
            free_bits,
            "enumerating assignments"
        );

        let assignment_count = U256::ONE << free_bits;
        let mut counter = U256::ZERO;
        while counter < assignment_count {
            let model = Self::decode(counter, &group.variables);
            let satisfied = group.formulas.iter().all(|formula| {
                formula
                    .evaluate(&|name| model.get(name).copied())
                    .is_some_and(|value| value.is_true())
            });
            if satisfied {
                return Ok(Some(model));
            }
            counter += U256::ONE;
        }

        Ok(None)
    }

    /// Partitions `formulas` into groups such that no two groups share a
    /// variable.
    fn connected_groups<'a>(formulas: &[&'a Term]) -> Result<Vec<Group<'a>>> {
        let mut groups: Vec<Group<'a>> = Vec::new();

        for formula in formulas {
            let mut merged = Group::default();
            collect_variables(formula, &mut merged.variables)?;
            merged.formulas.push(*formula);

            let (connected, disjoint): (Vec<_>, Vec<_>) = groups.into_iter().partition(|group| {
                group
                    .variables
                    .keys()
                    .any(|name| merged.variables.contains_key(name))
            });
            for group in connected {
                merged.variables.extend(group.variables);
                merged.formulas.extend(group.formulas);
            }

            groups = disjoint;
            groups.push(merged);
        }

        Ok(groups)
    }

    /// Splits the bits of `counter` into one value per variable, taking the
    /// lowest bits for the first variable.
    fn decode(counter: U256, variables: &BTreeMap<String, u32>) -> Model {
        let mut remaining = counter;
        variables
            .iter()
            .map(|(name, width)| {
                let value = BitVec::new(remaining, *width);
                remaining = if *width >= 256 {
                    U256::ZERO
                } else {
                    remaining >> *width
                };
                (name.clone(), value)
            })
            .collect()
    }
}

impl Default for EnumerativeSolver {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Oracle for EnumerativeSolver {
    fn check_sat(&mut self, expr: &Term, assumptions: &[Term]) -> Result<bool> {
        let mut formulas = assumptions.to_vec();
        formulas.push(expr.clone());
        self.find_model(&formulas).map(|model| model.is_some())
    }

    fn push(&mut self) {
        self.scopes.push(Vec::new());
    }

    fn pop(&mut self) -> Result<()> {
        if self.scopes.len() <= 1 {
            return Err(Error::UnbalancedPop);
        }
        self.scopes.pop();
        Ok(())
    }

    fn assert_formula(&mut self, formula: Term) -> Result<()> {
        check_boolean([&formula])?;
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(formula);
        }
        Ok(())
    }

    fn scope_depth(&self) -> usize {
        self.scopes.len() - 1
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::solver::Error,
        solver::{Config, EnumerativeSolver, Oracle},
        term::{BitVec, Term},
    };

    #[test]
    fn decides_simple_queries() -> anyhow::Result<()> {
        let mut solver = EnumerativeSolver::default();
        let x = Term::var("x", 4);

        assert!(solver.check_sat(&x.clone().equals(Term::constant(3, 4)), &[])?);
        assert!(!solver.check_sat(
            &x.clone().equals(Term::constant(3, 4)),
            &[x.ugt(Term::constant(5, 4))]
        )?);
        assert_eq!(solver.query_count(), 2);

        Ok(())
    }

    #[test]
    fn constant_queries_need_no_search() -> anyhow::Result<()> {
        let mut solver = EnumerativeSolver::new(Config::default().with_max_free_bits(0));

        assert!(solver.check_sat(&Term::bool(true), &[])?);
        assert!(!solver.check_sat(&Term::bool(true), &[Term::bool(false)])?);

        Ok(())
    }

    #[test]
    fn finds_a_satisfying_model() -> anyhow::Result<()> {
        let mut solver = EnumerativeSolver::default();
        let a = Term::var("a", 3);
        let b = Term::var("b", 3);

        let model = solver
            .find_model(&[(a.clone() + b.clone()).equals(Term::constant(7, 3)), a.equals(Term::constant(5, 3))])?
            .expect("The formulas are satisfiable");

        assert_eq!(model.get("a"), Some(&BitVec::new(5u64, 3)));
        assert_eq!(model.get("b"), Some(&BitVec::new(2u64, 3)));

        Ok(())
    }

    #[test]
    fn scoped_assertions_are_discarded_on_pop() -> anyhow::Result<()> {
        let mut solver = EnumerativeSolver::default();
        let x = Term::var("x", 2);
        let is_one = x.clone().equals(Term::constant(1, 2));

        solver.assert_formula(x.clone().ugt(Term::constant(1, 2)))?;
        solver.push();
        solver.assert_formula(x.equals(Term::constant(3, 2)))?;
        assert_eq!(solver.scope_depth(), 1);
        assert!(!solver.check_sat(&is_one, &[])?);

        solver.pop()?;
        assert_eq!(solver.scope_depth(), 0);
        assert!(!solver.check_sat(&is_one, &[])?);
        assert!(solver.check_sat(&!is_one, &[])?);

        assert_eq!(solver.pop(), Err(Error::UnbalancedPop));

        Ok(())
    }

    #[test]
    fn assumptions_do_not_persist() -> anyhow::Result<()> {
        let mut solver = EnumerativeSolver::default();
        let x = Term::var("x", 1);

        assert!(!solver.check_sat(&x, &[!x.clone()])?);
        assert!(solver.check_sat(&x, &[])?);

        Ok(())
    }

    #[test]
    fn refuses_uninstantiated_signals() {
        let mut solver = EnumerativeSolver::default();
        let result = solver.check_sat(&Term::signal("valid", 1), &[]);

        assert_eq!(
            result,
            Err(Error::UninstantiatedSignal {
                name: "valid".into(),
            })
        );
    }

    #[test]
    fn refuses_non_boolean_formulas() {
        let mut solver = EnumerativeSolver::default();
        let result = solver.check_sat(&Term::var("x", 8), &[]);

        assert_eq!(result, Err(Error::NotBoolean { width: 8 }));
    }

    #[test]
    fn refuses_oversized_search_spaces() {
        let mut solver = EnumerativeSolver::new(Config::default().with_max_free_bits(8));
        let wide = Term::var("wide", 16);
        let result = solver.check_sat(&wide.equals(Term::constant(1, 16)), &[]);

        assert_eq!(
            result,
            Err(Error::SearchSpaceExceeded {
                requested: 16,
                limit:     8,
            })
        );
    }

    #[test]
    fn disjoint_formulas_are_searched_separately() -> anyhow::Result<()> {
        let mut solver = EnumerativeSolver::default();
        let excluded: Vec<Term> = (0..16)
            .map(|cycle| Term::var(format!("sym_in@{cycle}"), 2).not_equals(Term::constant(0, 2)))
            .collect();
        let query = Term::var("sym_in@16", 2).equals(Term::constant(0, 2));

        assert!(solver.check_sat(&query, &excluded)?);
        assert!(!solver.check_sat(&query, &[Term::var("sym_in@16", 2).ugt(Term::constant(1, 2))])?);

        Ok(())
    }

    #[test]
    fn connected_formulas_share_one_search_space() {
        let mut solver = EnumerativeSolver::new(Config::default().with_max_free_bits(10));
        let a = Term::var("a", 4);
        let b = Term::var("b", 4);
        let c = Term::var("c", 4);

        let result = solver.check_sat(
            &a.clone().equals(b.clone()),
            &[b.ult(c.clone()), c.ugt(Term::constant(2, 4))],
        );

        assert_eq!(
            result,
            Err(Error::SearchSpaceExceeded {
                requested: 12,
                limit:     10,
            })
        );
    }

    #[test]
    fn detects_inconsistent_variable_widths() {
        let mut solver = EnumerativeSolver::default();
        let result = solver.check_sat(
            &Term::var("v", 2).equals(Term::constant(0, 2)),
            &[Term::var("v", 3).equals(Term::constant(0, 3))],
        );

        assert_eq!(
            result,
            Err(Error::InconsistentVariable {
                name:   "v".into(),
                first:  2,
                second: 3,
            })
        );
    }
}
