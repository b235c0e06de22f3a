//! This module contains the definition of the [`Term`], the symbolic
//! bit-vector expression that signal values, wait conditions, path
//! conditions, and assertions are all written in.
//!
//! # Instantiated and Uninstantiated Terms
//!
//! A term may refer to the design in two ways:
//!
//! - [`Term::Signal`] names a signal of the design _without_ saying at which
//!   cycle it is read. Wait conditions are recorded in this form so that they
//!   can be re-read on every cycle.
//! - [`Term::Var`] is a free symbolic variable, such as the value of an
//!   undriven input at a particular cycle. These are what the solver reasons
//!   about.
//!
//! Instantiating a term against a simulation frame replaces every `Signal`
//! with its value on that frame.

pub mod bitvec;

use std::{
    fmt::{Display, Formatter},
    ops,
};

use ethnum::U256;

pub use crate::term::bitvec::BitVec;
use crate::constant::BOOL_WIDTH_BITS;

/// The type of a boxed term.
pub type BoxedTerm = Box<Term>;

/// A symbolic bit-vector expression.
///
/// Constructing a term through its associated functions and operators folds
/// it to a constant whenever all of its operands are constant.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Term {
    /// A known bit-vector.
    Const(BitVec),

    /// A reference to the design signal `name` that has not yet been bound
    /// to a particular cycle.
    Signal { name: String, width: u32 },

    /// A free symbolic variable.
    Var { name: String, width: u32 },

    /// A unary operation.
    Unary { op: UnaryOp, arg: BoxedTerm },

    /// A binary operation.
    Binary {
        op:    BinaryOp,
        left:  BoxedTerm,
        right: BoxedTerm,
    },

    /// Selects `then` when `cond` is non-zero and `otherwise` when it is zero.
    Ite {
        cond:      BoxedTerm,
        then:      BoxedTerm,
        otherwise: BoxedTerm,
    },
}

/// Unary operations on terms.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum UnaryOp {
    /// Bitwise complement, which is logical negation on booleans.
    Not,

    /// Two's complement negation.
    Neg,
}

/// Binary operations on terms.
///
/// All comparisons are unsigned and produce a one-bit result.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    UDiv,
    URem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl BinaryOp {
    /// Checks if the operation is a comparison, producing a boolean.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Ult | Self::Ule | Self::Ugt | Self::Uge
        )
    }

    /// Computes the width of the result of applying the operation to operands
    /// of the given widths.
    #[must_use]
    pub fn result_width(self, left: u32, right: u32) -> u32 {
        if self.is_comparison() {
            BOOL_WIDTH_BITS
        } else {
            left.max(right)
        }
    }

    /// Gets the infix symbol used when displaying the operation.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::UDiv => "/",
            Self::URem => "%",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ult => "<",
            Self::Ule => "<=",
            Self::Ugt => ">",
            Self::Uge => ">=",
        }
    }
}

impl Term {
    /// Constructs a constant term of the given `width`.
    #[must_use]
    pub fn constant(value: u64, width: u32) -> Self {
        Self::Const(BitVec::new(value, width))
    }

    /// Constructs a constant term from a value wider than 64 bits.
    #[must_use]
    pub fn wide_constant(value: U256, width: u32) -> Self {
        Self::Const(BitVec::new(value, width))
    }

    /// Constructs a one-bit constant term.
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::Const(BitVec::from_bool(value))
    }

    /// Constructs a free symbolic variable.
    #[must_use]
    pub fn var(name: impl Into<String>, width: u32) -> Self {
        let name = name.into();
        Self::Var { name, width }
    }

    /// Constructs an uninstantiated reference to the design signal `name`.
    #[must_use]
    pub fn signal(name: impl Into<String>, width: u32) -> Self {
        let name = name.into();
        Self::Signal { name, width }
    }

    /// Constructs the application of `op` to `arg`, folding constants.
    #[must_use]
    pub fn unary(op: UnaryOp, arg: Term) -> Self {
        match (op, arg) {
            (_, Self::Const(value)) => Self::Const(value.apply_unary(op)),
            (
                UnaryOp::Not,
                Self::Unary {
                    op: UnaryOp::Not,
                    arg,
                },
            ) => *arg,
            (op, arg) => Self::Unary {
                op,
                arg: Box::new(arg),
            },
        }
    }

    /// Constructs the application of `op` to `left` and `right`, folding
    /// constants.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Term, right: Term) -> Self {
        match (left, right) {
            (Self::Const(l), Self::Const(r)) => Self::Const(l.apply_binary(op, r)),
            (left, right) => Self::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    /// Constructs a term that is `then` when `cond` is non-zero and
    /// `otherwise` when it is zero.
    #[must_use]
    pub fn ite(cond: Term, then: Term, otherwise: Term) -> Self {
        match cond {
            Self::Const(value) if value.is_true() => then,
            Self::Const(_) => otherwise,
            cond => Self::Ite {
                cond:      Box::new(cond),
                then:      Box::new(then),
                otherwise: Box::new(otherwise),
            },
        }
    }

    /// Constructs `self == other`.
    #[must_use]
    pub fn equals(self, other: Term) -> Self {
        Self::binary(BinaryOp::Eq, self, other)
    }

    /// Constructs `self != other`.
    #[must_use]
    pub fn not_equals(self, other: Term) -> Self {
        Self::binary(BinaryOp::Ne, self, other)
    }

    /// Constructs the unsigned comparison `self < other`.
    #[must_use]
    pub fn ult(self, other: Term) -> Self {
        Self::binary(BinaryOp::Ult, self, other)
    }

    /// Constructs the unsigned comparison `self <= other`.
    #[must_use]
    pub fn ule(self, other: Term) -> Self {
        Self::binary(BinaryOp::Ule, self, other)
    }

    /// Constructs the unsigned comparison `self > other`.
    #[must_use]
    pub fn ugt(self, other: Term) -> Self {
        Self::binary(BinaryOp::Ugt, self, other)
    }

    /// Constructs the unsigned comparison `self >= other`.
    #[must_use]
    pub fn uge(self, other: Term) -> Self {
        Self::binary(BinaryOp::Uge, self, other)
    }

    /// Constructs the unsigned division `self / other`.
    #[must_use]
    pub fn udiv(self, other: Term) -> Self {
        Self::binary(BinaryOp::UDiv, self, other)
    }

    /// Constructs the unsigned remainder `self % other`.
    #[must_use]
    pub fn urem(self, other: Term) -> Self {
        Self::binary(BinaryOp::URem, self, other)
    }

    /// Constructs the logical shift `self << amount`.
    #[must_use]
    pub fn shl(self, amount: Term) -> Self {
        Self::binary(BinaryOp::Shl, self, amount)
    }

    /// Constructs the logical shift `self >> amount`.
    #[must_use]
    pub fn shr(self, amount: Term) -> Self {
        Self::binary(BinaryOp::Shr, self, amount)
    }

    /// Constructs the boolean implication `self -> other`.
    #[must_use]
    pub fn implies(self, other: Term) -> Self {
        !self | other
    }

    /// Constructs the conjunction of all of `terms`, which is `true` when
    /// there are none.
    #[must_use]
    pub fn conjunction(terms: impl IntoIterator<Item = Term>) -> Self {
        terms
            .into_iter()
            .reduce(|acc, term| acc & term)
            .unwrap_or_else(|| Self::bool(true))
    }

    /// Gets the width of the term in bits.
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Const(value) => value.width(),
            Self::Signal { width, .. } | Self::Var { width, .. } => *width,
            Self::Unary { arg, .. } => arg.width(),
            Self::Binary { op, left, right } => op.result_width(left.width(), right.width()),
            Self::Ite {
                then, otherwise, ..
            } => then.width().max(otherwise.width()),
        }
    }

    /// Gets the constant value of the term, if it is a constant.
    #[must_use]
    pub fn as_const(&self) -> Option<BitVec> {
        match self {
            Self::Const(value) => Some(*value),
            _ => None,
        }
    }

    /// Checks if the term is a one-bit term.
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        self.width() == BOOL_WIDTH_BITS
    }

    /// Checks if the term still contains references to design signals.
    #[must_use]
    pub fn has_signals(&self) -> bool {
        let mut found = false;
        self.visit(&mut |term| {
            if matches!(term, Self::Signal { .. }) {
                found = true;
            }
        });
        found
    }

    /// Visits every node in the term in pre-order.
    pub fn visit(&self, visitor: &mut impl FnMut(&Term)) {
        visitor(self);
        match self {
            Self::Const(_) | Self::Signal { .. } | Self::Var { .. } => (),
            Self::Unary { arg, .. } => arg.visit(visitor),
            Self::Binary { left, right, .. } => {
                left.visit(visitor);
                right.visit(visitor);
            }
            Self::Ite {
                cond,
                then,
                otherwise,
            } => {
                cond.visit(visitor);
                then.visit(visitor);
                otherwise.visit(visitor);
            }
        }
    }

    /// Rebuilds the term with every [`Term::Signal`] replaced by the result of
    /// `replace`, folding constants on the way back up.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `replace` returns [`Err`] for any signal.
    pub fn try_replace_signals<E>(
        &self,
        replace: &mut impl FnMut(&str, u32) -> Result<Term, E>,
    ) -> Result<Term, E> {
        self.try_rebuild(&mut |term| match term {
            Self::Signal { name, width } => replace(name, *width).map(Some),
            _ => Ok(None),
        })
    }

    /// Rebuilds the term with every [`Term::Var`] for which `lookup` returns a
    /// value replaced by that value.
    #[must_use]
    pub fn substitute_vars(&self, lookup: &impl Fn(&str) -> Option<Term>) -> Term {
        let result: Result<Term, std::convert::Infallible> = self.try_rebuild(&mut |term| {
            Ok(match term {
                Self::Var { name, .. } => lookup(name),
                _ => None,
            })
        });
        match result {
            Ok(term) => term,
            Err(never) => match never {},
        }
    }

    /// Evaluates the term, reading the value of free variables from `lookup`.
    ///
    /// Returns [`None`] if the term references a signal, or a variable that
    /// `lookup` has no value for.
    #[must_use]
    pub fn evaluate(&self, lookup: &impl Fn(&str) -> Option<BitVec>) -> Option<BitVec> {
        match self {
            Self::Const(value) => Some(*value),
            Self::Signal { .. } => None,
            Self::Var { name, width } => lookup(name).map(|v| BitVec::new(v.value(), *width)),
            Self::Unary { op, arg } => arg.evaluate(lookup).map(|v| v.apply_unary(*op)),
            Self::Binary { op, left, right } => {
                let left = left.evaluate(lookup)?;
                let right = right.evaluate(lookup)?;
                Some(left.apply_binary(*op, right))
            }
            Self::Ite {
                cond,
                then,
                otherwise,
            } => {
                let width = self.width();
                let chosen = if cond.evaluate(lookup)?.is_true() {
                    then.evaluate(lookup)?
                } else {
                    otherwise.evaluate(lookup)?
                };
                Some(BitVec::new(chosen.value(), width))
            }
        }
    }

    /// Rebuilds the term bottom-up, letting `leaf` replace any node before its
    /// children are visited.
    fn try_rebuild<E>(
        &self,
        leaf: &mut impl FnMut(&Term) -> Result<Option<Term>, E>,
    ) -> Result<Term, E> {
        if let Some(replacement) = leaf(self)? {
            return Ok(replacement);
        }

        let rebuilt = match self {
            Self::Const(_) | Self::Signal { .. } | Self::Var { .. } => self.clone(),
            Self::Unary { op, arg } => Self::unary(*op, arg.try_rebuild(leaf)?),
            Self::Binary { op, left, right } => {
                Self::binary(*op, left.try_rebuild(leaf)?, right.try_rebuild(leaf)?)
            }
            Self::Ite {
                cond,
                then,
                otherwise,
            } => Self::ite(
                cond.try_rebuild(leaf)?,
                then.try_rebuild(leaf)?,
                otherwise.try_rebuild(leaf)?,
            ),
        };

        Ok(rebuilt)
    }
}

impl From<BitVec> for Term {
    fn from(value: BitVec) -> Self {
        Self::Const(value)
    }
}

impl From<bool> for Term {
    fn from(value: bool) -> Self {
        Self::bool(value)
    }
}

impl ops::Not for Term {
    type Output = Term;

    fn not(self) -> Self::Output {
        Self::unary(UnaryOp::Not, self)
    }
}

impl ops::Neg for Term {
    type Output = Term;

    fn neg(self) -> Self::Output {
        Self::unary(UnaryOp::Neg, self)
    }
}

/// Implements a binary operator trait for [`Term`] by delegating to
/// [`Term::binary`].
macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait for Term {
            type Output = Term;

            fn $method(self, rhs: Term) -> Self::Output {
                Self::binary($op, self, rhs)
            }
        }
    };
}

binary_operator!(Add, add, BinaryOp::Add);
binary_operator!(Sub, sub, BinaryOp::Sub);
binary_operator!(Mul, mul, BinaryOp::Mul);
binary_operator!(BitAnd, bitand, BinaryOp::And);
binary_operator!(BitOr, bitor, BinaryOp::Or);
binary_operator!(BitXor, bitxor, BinaryOp::Xor);

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Const(value) => write!(f, "{value}"),
            Self::Signal { name, .. } | Self::Var { name, .. } => write!(f, "{name}"),
            Self::Unary { op, arg } => match op {
                UnaryOp::Not => write!(f, "!{arg}"),
                UnaryOp::Neg => write!(f, "-{arg}"),
            },
            Self::Binary { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Self::Ite {
                cond,
                then,
                otherwise,
            } => write!(f, "({cond} ? {then} : {otherwise})"),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use crate::term::{BitVec, Term};

    #[test]
    fn folds_constant_operands() {
        let sum = Term::constant(3, 8) + Term::constant(4, 8);
        assert_eq!(sum, Term::constant(7, 8));

        let cond = Term::constant(7, 8).equals(Term::constant(7, 8));
        assert_eq!(cond, Term::bool(true));
    }

    #[test]
    fn keeps_symbolic_operands() {
        let x = Term::var("x", 8);
        let sum = x.clone() + Term::constant(1, 8);

        assert!(matches!(sum, Term::Binary { .. }));
        assert_eq!(sum.width(), 8);
        assert_eq!(sum.to_string(), "(x + 8'd1)");
    }

    #[test]
    fn removes_double_negation() {
        let x = Term::var("x", 1);
        assert_eq!(!!x.clone(), x);
    }

    #[test]
    fn comparisons_are_boolean() {
        let cond = Term::signal("count", 4).ult(Term::constant(9, 4));
        assert!(cond.is_boolean());
        assert!(cond.has_signals());
    }

    #[test]
    fn replaces_signals_and_refolds() -> anyhow::Result<()> {
        let cond = Term::signal("a", 4).equals(Term::constant(2, 4));
        let instantiated = cond.try_replace_signals(&mut |name, width| {
            assert_eq!(name, "a");
            Ok::<_, anyhow::Error>(Term::constant(2, width))
        })?;

        assert_eq!(instantiated, Term::bool(true));
        Ok(())
    }

    #[test]
    fn substitutes_variables() {
        let expr = Term::var("a", 4) + Term::var("b", 4);
        let substituted = expr.substitute_vars(&|name| (name == "a").then(|| Term::constant(1, 4)));

        assert_eq!(substituted.to_string(), "(4'd1 + b)");
    }

    #[test]
    fn evaluates_under_an_assignment() {
        let expr = Term::ite(
            Term::var("sel", 1),
            Term::var("a", 8) * Term::constant(2, 8),
            Term::constant(0, 8),
        );
        let model: HashMap<&str, BitVec> = [
            ("sel", BitVec::from_bool(true)),
            ("a", BitVec::new(200u64, 8)),
        ]
        .into_iter()
        .collect();

        let result = expr.evaluate(&|name| model.get(name).copied());
        assert_eq!(result, Some(BitVec::new(144u64, 8)));
        assert_eq!(Term::signal("s", 1).evaluate(&|_| None), None);
    }

    #[test]
    fn conjunction_of_nothing_is_true() {
        assert_eq!(Term::conjunction(vec![]), Term::bool(true));

        let both = Term::conjunction(vec![Term::var("p", 1), Term::var("q", 1)]);
        assert_eq!(both.to_string(), "(p & q)");
    }
}
