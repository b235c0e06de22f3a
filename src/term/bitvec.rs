//! This module contains the definition of [`BitVec`], the concrete fixed-width
//! value that terms fold to and that the solver assigns to variables.

use std::fmt::{Display, Formatter};

use ethnum::U256;

use crate::{
    constant::MAXIMUM_BIT_WIDTH,
    term::{BinaryOp, UnaryOp},
};

/// A concrete bit-vector of up to [`MAXIMUM_BIT_WIDTH`] bits.
///
/// The stored value is always truncated to the width, so two bit-vectors
/// compare equal exactly when they have the same width and the same bits.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BitVec {
    value: U256,
    width: u32,
}

impl BitVec {
    /// Constructs a new bit-vector of the given `width` holding `value`,
    /// discarding any bits of `value` that do not fit.
    #[must_use]
    pub fn new(value: impl Into<U256>, width: u32) -> Self {
        let width = width.min(MAXIMUM_BIT_WIDTH);
        let value = value.into() & Self::mask(width);
        Self { value, width }
    }

    /// Constructs a one-bit boolean.
    #[must_use]
    pub fn from_bool(value: bool) -> Self {
        Self::new(u64::from(value), 1)
    }

    /// Gets the bits of the bit-vector.
    #[must_use]
    pub fn value(&self) -> U256 {
        self.value
    }

    /// Gets the width of the bit-vector in bits.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Checks if any bit is set.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.value != U256::ZERO
    }

    /// Gets the all-ones mask for `width` bits.
    #[must_use]
    pub fn mask(width: u32) -> U256 {
        if width >= MAXIMUM_BIT_WIDTH {
            U256::MAX
        } else {
            (U256::ONE << width) - U256::ONE
        }
    }

    /// Applies the unary operation `op` to `self`.
    #[must_use]
    pub fn apply_unary(self, op: UnaryOp) -> Self {
        match op {
            UnaryOp::Not => Self::new(!self.value, self.width),
            UnaryOp::Neg => Self::new(self.value.wrapping_neg(), self.width),
        }
    }

    /// Applies the binary operation `op` to `self` and `other`.
    ///
    /// Operands of differing widths are zero-extended to the wider of the two
    /// before the operation is performed.
    #[must_use]
    pub fn apply_binary(self, op: BinaryOp, other: Self) -> Self {
        let width = op.result_width(self.width, other.width);
        let (left, right) = (self.value, other.value);
        let operand_width = self.width.max(other.width);

        match op {
            BinaryOp::Add => Self::new(left.wrapping_add(right), width),
            BinaryOp::Sub => Self::new(left.wrapping_sub(right), width),
            BinaryOp::Mul => Self::new(left.wrapping_mul(right), width),
            BinaryOp::UDiv => match left.checked_div(right) {
                Some(result) => Self::new(result, width),
                None => Self::new(Self::mask(operand_width), width),
            },
            BinaryOp::URem => match left.checked_rem(right) {
                Some(result) => Self::new(result, width),
                None => Self::new(left, width),
            },
            BinaryOp::And => Self::new(left & right, width),
            BinaryOp::Or => Self::new(left | right, width),
            BinaryOp::Xor => Self::new(left ^ right, width),
            BinaryOp::Shl => Self::new(Self::shift(left, right, operand_width, true), width),
            BinaryOp::Shr => Self::new(Self::shift(left, right, operand_width, false), width),
            BinaryOp::Eq => Self::from_bool(left == right),
            BinaryOp::Ne => Self::from_bool(left != right),
            BinaryOp::Ult => Self::from_bool(left < right),
            BinaryOp::Ule => Self::from_bool(left <= right),
            BinaryOp::Ugt => Self::from_bool(left > right),
            BinaryOp::Uge => Self::from_bool(left >= right),
        }
    }

    /// Performs a logical shift of `value` by `amount`, where shifting by the
    /// full `width` or more clears every bit.
    fn shift(value: U256, amount: U256, width: u32, left: bool) -> U256 {
        if amount >= U256::from(width) {
            return U256::ZERO;
        }
        let amount = amount.as_u32();
        if left {
            value << amount
        } else {
            value >> amount
        }
    }
}

impl From<bool> for BitVec {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}

/// Displays the bit-vector in the sized-decimal literal style of hardware
/// description languages, for example `8'd255`.
impl Display for BitVec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}'d{}", self.width, self.value)
    }
}
