//! This module contains the interface to the satisfiability oracle that the
//! scheduler consults when resolving symbolic wait conditions and checking
//! assertions.
//!
//! The scheduler treats the oracle as a black box. The default is the
//! [`SmtSolver`], which translates terms into Z3 bit-vector formulas. The
//! [`EnumerativeSolver`] answers queries by exhaustive search over narrow free
//! variables, and is mostly useful as a lightweight stand-in for tests.

pub mod enumerative;
pub mod smt;

use std::{collections::BTreeMap, fmt::Debug, time::Duration};

pub use crate::solver::{enumerative::EnumerativeSolver, smt::SmtSolver};
use crate::{
    constant::DEFAULT_MAXIMUM_FREE_BITS,
    error::solver::{Error, Result},
    term::Term,
};

/// A dynamically dispatched [`Oracle`] instance.
pub type DynOracle = Box<dyn Oracle>;

/// The interface to a satisfiability oracle over [`Term`]s.
///
/// # Scoping
///
/// Formulas added with [`Oracle::assert_formula`] persist until the scope they
/// were added in is popped. The `assumptions` passed to [`Oracle::check_sat`]
/// hold for that query only, so repeated queries never leak state into one
/// another.
pub trait Oracle
where
    Self: Debug,
{
    /// Checks whether `expr` can be true while every one of the `assumptions`
    /// and every asserted formula is also true.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the query cannot be answered, such as when a formula
    /// is not boolean or still references design signals.
    fn check_sat(&mut self, expr: &Term, assumptions: &[Term]) -> Result<bool>;

    /// Opens a new assertion scope.
    fn push(&mut self);

    /// Discards the most recently opened assertion scope and every formula
    /// asserted within it.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no open scope to pop.
    fn pop(&mut self) -> Result<()>;

    /// Asserts `formula` in the current scope.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the formula is not boolean.
    fn assert_formula(&mut self, formula: Term) -> Result<()>;

    /// Gets the number of scopes that have been pushed and not yet popped.
    #[must_use]
    fn scope_depth(&self) -> usize;
}

/// The configuration for the bundled solvers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The maximum number of free variable bits that the
    /// [`EnumerativeSolver`] may search over for a single group of connected
    /// formulas.
    ///
    /// Defaults to [`DEFAULT_MAXIMUM_FREE_BITS`].
    pub max_free_bits: u32,

    /// The time after which the [`SmtSolver`] gives up on a query, or [`None`]
    /// to let every query run to completion.
    ///
    /// Defaults to [`None`].
    pub timeout: Option<Duration>,
}

impl Config {
    /// Sets the `max_free_bits` config parameter to `value`.
    #[must_use]
    pub fn with_max_free_bits(mut self, value: u32) -> Self {
        self.max_free_bits = value;
        self
    }

    /// Sets the `timeout` config parameter to `value`.
    #[must_use]
    pub fn with_timeout(mut self, value: Option<Duration>) -> Self {
        self.timeout = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let max_free_bits = DEFAULT_MAXIMUM_FREE_BITS;
        let timeout = None;
        Self {
            max_free_bits,
            timeout,
        }
    }
}

/// Checks that every one of `formulas` is a boolean that the solvers can
/// reason about.
///
/// # Errors
///
/// Returns [`Err`] if a formula is wider than one bit.
pub(crate) fn check_boolean<'a>(formulas: impl IntoIterator<Item = &'a Term>) -> Result<()> {
    for formula in formulas {
        if !formula.is_boolean() {
            return Err(Error::NotBoolean {
                width: formula.width(),
            });
        }
    }
    Ok(())
}

/// Collects the free variables of `formula` along with their widths, adding
/// them to `variables`.
///
/// # Errors
///
/// Returns [`Err`] if the formula still references a design signal, contains a
/// zero-width leaf, or uses a variable at a different width than it has in
/// `variables`.
pub(crate) fn collect_variables(
    formula: &Term,
    variables: &mut BTreeMap<String, u32>,
) -> Result<()> {
    let mut error = None;

    formula.visit(&mut |term| {
        if error.is_some() {
            return;
        }
        match term {
            Term::Signal { name, .. } => {
                error = Some(Error::UninstantiatedSignal { name: name.clone() });
            }
            Term::Const(value) if value.width() == 0 => {
                error = Some(Error::ZeroWidth);
            }
            Term::Var { width: 0, .. } => {
                error = Some(Error::ZeroWidth);
            }
            Term::Var { name, width } => match variables.get(name) {
                Some(first) if first != width => {
                    error = Some(Error::InconsistentVariable {
                        name:   name.clone(),
                        first:  *first,
                        second: *width,
                    });
                }
                Some(_) => (),
                None => {
                    variables.insert(name.clone(), *width);
                }
            },
            _ => (),
        }
    });

    error.map_or(Ok(()), Err)
}
