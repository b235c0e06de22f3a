//! This module contains the [`SmtSolver`], an [`Oracle`] that decides queries
//! by translating terms into Z3 bit-vector formulas.

use std::collections::BTreeMap;

use derivative::Derivative;
use ethnum::U256;
use tracing::trace;
use z3::{
    ast::{Ast, Bool, BV},
    Context,
    Params,
    SatResult,
    Solver,
};

use crate::{
    error::solver::{Error, Result},
    solver::{check_boolean, collect_variables, Config, Oracle},
    term::{BinaryOp, BitVec, Term, UnaryOp},
};

/// A satisfiability oracle backed by the Z3 SMT solver.
///
/// Every query is decided in a fresh Z3 context into which the asserted
/// formulas of every open scope are replayed alongside the query's
/// assumptions. The scopes themselves are kept as terms, so the solver holds no
/// Z3 state between queries.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct SmtSolver {
    /// The Z3 configuration used to create the context for each query.
    #[derivative(Debug = "ignore")]
    cfg: z3::Config,

    /// The configuration of the solver.
    config: Config,

    /// The asserted formulas, one entry per scope, where the first entry is the
    /// base scope that can never be popped.
    scopes: Vec<Vec<Term>>,

    /// The number of queries that have been answered.
    query_count: usize,
}

impl SmtSolver {
    /// Constructs a new solver with the provided `config` and no asserted
    /// formulas.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let cfg = z3::Config::new();
        let scopes = vec![Vec::new()];
        let query_count = 0;
        Self {
            cfg,
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

    /// Checks whether every asserted formula and every one of `formulas` can be
    /// true at once.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a formula cannot be translated, or if Z3 gives up on
    /// the query.
    fn decide(&mut self, formulas: &[Term]) -> Result<bool> {
        self.query_count += 1;
        let all: Vec<&Term> = self.scopes.iter().flatten().chain(formulas.iter()).collect();

        check_boolean(all.iter().copied())?;
        let mut variables = BTreeMap::new();
        for formula in &all {
            collect_variables(formula, &mut variables)?;
        }

        if all.iter().any(|f| f.as_const().is_some_and(|v| !v.is_true())) {
            return Ok(false);
        }
        let symbolic: Vec<&Term> = all.into_iter().filter(|f| f.as_const().is_none()).collect();
        if symbolic.is_empty() {
            return Ok(true);
        }

        let ctx = Context::new(&self.cfg);
        let solver = Solver::new(&ctx);
        if let Some(timeout) = self.config.timeout {
            let mut params = Params::new(&ctx);
            params.set_u32("timeout", u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
            solver.set_params(&params);
        }

        let translator = Translator::new(&ctx);
        for formula in &symbolic {
            solver.assert(&translator.truth(formula)?);
        }
        trace!(
            formulas = symbolic.len(),
            variables = variables.len(),
            "checking with z3"
        );

        match solver.check() {
            SatResult::Sat => Ok(true),
            SatResult::Unsat => Ok(false),
            SatResult::Unknown => {
                let reason = solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "unknown".to_string());
                Err(Error::Unknown { reason })
            }
        }
    }
}

impl Default for SmtSolver {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Oracle for SmtSolver {
    fn check_sat(&mut self, expr: &Term, assumptions: &[Term]) -> Result<bool> {
        let mut formulas = assumptions.to_vec();
        formulas.push(expr.clone());
        self.decide(&formulas)
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

/// Translates terms into Z3 bit-vectors within a single context.
///
/// Operands of differing widths are zero-extended to the wider of the two, and
/// comparisons yield one-bit vectors, matching [`Term::evaluate`].
struct Translator<'ctx> {
    ctx: &'ctx Context,
}

impl<'ctx> Translator<'ctx> {
    fn new(ctx: &'ctx Context) -> Self {
        Self { ctx }
    }

    /// Translates `formula` into the Z3 boolean that holds when any of its bits
    /// is set.
    fn truth(&self, formula: &Term) -> Result<Bool<'ctx>> {
        let value = self.translate(formula)?;
        Ok(self.is_nonzero(&value))
    }

    fn translate(&self, term: &Term) -> Result<BV<'ctx>> {
        let translated = match term {
            Term::Const(value) => self.constant(*value)?,
            Term::Signal { name, .. } => {
                return Err(Error::UninstantiatedSignal { name: name.clone() });
            }
            Term::Var { name, width } => BV::new_const(self.ctx, name.as_str(), *width),
            Term::Unary { op, arg } => {
                let arg = self.translate(arg)?;
                match op {
                    UnaryOp::Not => arg.bvnot(),
                    UnaryOp::Neg => arg.bvneg(),
                }
            }
            Term::Binary { op, left, right } => {
                let width = left.width().max(right.width());
                let l = self.extended(left, width)?;
                let r = self.extended(right, width)?;
                match op {
                    BinaryOp::Add => l.bvadd(&r),
                    BinaryOp::Sub => l.bvsub(&r),
                    BinaryOp::Mul => l.bvmul(&r),
                    BinaryOp::UDiv => l.bvudiv(&r),
                    BinaryOp::URem => l.bvurem(&r),
                    BinaryOp::And => l.bvand(&r),
                    BinaryOp::Or => l.bvor(&r),
                    BinaryOp::Xor => l.bvxor(&r),
                    BinaryOp::Shl => l.bvshl(&r),
                    BinaryOp::Shr => l.bvlshr(&r),
                    BinaryOp::Eq => self.one_bit(&l._eq(&r)),
                    BinaryOp::Ne => self.one_bit(&l._eq(&r).not()),
                    BinaryOp::Ult => self.one_bit(&l.bvult(&r)),
                    BinaryOp::Ule => self.one_bit(&l.bvule(&r)),
                    BinaryOp::Ugt => self.one_bit(&l.bvugt(&r)),
                    BinaryOp::Uge => self.one_bit(&l.bvuge(&r)),
                }
            }
            Term::Ite {
                cond,
                then,
                otherwise,
            } => {
                let width = term.width();
                let cond = self.truth(cond)?;
                let then = self.extended(then, width)?;
                let otherwise = self.extended(otherwise, width)?;
                cond.ite(&then, &otherwise)
            }
        };

        Ok(translated)
    }

    /// Translates `term` and zero-extends it to `width` bits.
    fn extended(&self, term: &Term, width: u32) -> Result<BV<'ctx>> {
        let value = self.translate(term)?;
        let size = term.width();
        if size < width {
            Ok(value.zero_ext(width - size))
        } else {
            Ok(value)
        }
    }

    fn constant(&self, value: BitVec) -> Result<BV<'ctx>> {
        let width = value.width();
        let bits = value.value();
        if bits <= U256::from(u64::MAX) {
            return Ok(BV::from_u64(self.ctx, bits.as_u64(), width));
        }
        BV::from_str(self.ctx, width, &bits.to_string()).ok_or_else(|| {
            Error::UnrepresentableConstant {
                value: bits.to_string(),
                width,
            }
        })
    }

    fn one_bit(&self, value: &Bool<'ctx>) -> BV<'ctx> {
        value.ite(&BV::from_u64(self.ctx, 1, 1), &BV::from_u64(self.ctx, 0, 1))
    }

    fn is_nonzero(&self, value: &BV<'ctx>) -> Bool<'ctx> {
        value._eq(&BV::from_u64(self.ctx, 0, value.get_size())).not()
    }
}
