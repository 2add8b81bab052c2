//! Comparison, hashing and integer-like operators for [BitView].
//!
//! Bitwise operators keep the view's type and mask their result. Additive operators keep it while the
//! result fits the configured size and demote to a plain integer otherwise.
//! Multiplication and shifts always produce plain integers; left shifts and
//! multiplication fail with [RangeError::Overflow] past 128 bits.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Shr},
    rc::Rc,
};

use crate::{
    bits::{MAX_WIDTH, bit_length},
    errors::RangeError,
    view::BitView,
};

/// Result of an additive operation: a view while it fits, an integer once it does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arith {
    View(BitView),
    Int(u128),
}

impl Arith {
    pub fn value(&self) -> u128 {
        match self {
            Arith::View(view) => view.value(),
            Arith::Int(value) => *value,
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(self, Arith::View(_))
    }

    pub fn into_view(self) -> Option<BitView> {
        match self {
            Arith::View(view) => Some(view),
            Arith::Int(_) => None,
        }
    }
}

impl PartialEq<u128> for Arith {
    fn eq(&self, other: &u128) -> bool {
        self.value() == *other
    }
}

impl BitView {
    /// `self + rhs`, demoted to [Arith::Int] when it overflows the size.
    pub fn checked_add(&self, rhs: u128) -> Result<Arith, RangeError> {
        let sum = self.value().checked_add(rhs).ok_or(RangeError::Overflow {
            bits: MAX_WIDTH + 1,
            size: MAX_WIDTH,
        })?;
        Ok(self.demote(sum))
    }

    /// `self - rhs`. Fails with [RangeError::Negative] below zero.
    pub fn checked_sub(&self, rhs: u128) -> Result<Arith, RangeError> {
        let difference = self.value().checked_sub(rhs).ok_or(RangeError::Negative)?;
        Ok(self.demote(difference))
    }

    /// `self += rhs`. Fails instead of demoting when the sum overflows the size.
    pub fn try_add_assign(&mut self, rhs: u128) -> Result<(), RangeError> {
        let sum = self.checked_add(rhs)?.value();
        self.set_value(sum)
    }

    /// `self -= rhs`. Fails when the result would be negative.
    pub fn try_sub_assign(&mut self, rhs: u128) -> Result<(), RangeError> {
        let difference = self.value().checked_sub(rhs).ok_or(RangeError::Negative)?;
        self.set_value(difference)
    }

    /// `self * rhs` as a plain integer.
    pub fn checked_mul(&self, rhs: u128) -> Result<u128, RangeError> {
        let value = self.value();
        value.checked_mul(rhs).ok_or_else(|| RangeError::Overflow {
            bits: (bit_length(value) + bit_length(rhs) - 1).max(MAX_WIDTH + 1),
            size: MAX_WIDTH,
        })
    }

    /// `self << rhs` as a plain integer. Fails if any set bit would be shifted out.
    pub fn checked_shl(&self, rhs: u32) -> Result<u128, RangeError> {
        let value = self.value();
        if value == 0 {
            return Ok(0);
        }

        let bits = bit_length(value).saturating_add(rhs);
        if bits > MAX_WIDTH {
            return Err(RangeError::Overflow {
                bits,
                size: MAX_WIDTH,
            });
        }

        Ok(value << rhs)
    }

    fn demote(&self, result: u128) -> Arith {
        match self.size() {
            Some(size) if bit_length(result) > size => Arith::Int(result),
            _ => Arith::View(BitView::from_type(Rc::clone(self.view_type()), result)),
        }
    }
}

/// Views are equal when value, mapping and byte length all match.
impl PartialEq for BitView {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
            && self.mapping() == other.mapping()
            && self.byte_len() == other.byte_len()
    }
}

impl Eq for BitView {}

impl PartialEq<u128> for BitView {
    fn eq(&self, other: &u128) -> bool {
        self.value() == *other
    }
}

impl PartialEq<BitView> for u128 {
    fn eq(&self, other: &BitView) -> bool {
        *self == other.value()
    }
}

impl PartialOrd<u128> for BitView {
    fn partial_cmp(&self, other: &u128) -> Option<Ordering> {
        self.value().partial_cmp(other)
    }
}

/// Hashes the type's shape and the value; the parent link is not part of it.
impl Hash for BitView {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.mapping().hash(state);
        self.byte_len().hash(state);
        self.value().hash(state);
    }
}

impl From<&BitView> for u128 {
    fn from(view: &BitView) -> Self {
        view.value()
    }
}

impl From<BitView> for u128 {
    fn from(view: BitView) -> Self {
        view.value()
    }
}

macro_rules! impl_bitwise {
    ($op:ident, $method:ident, $assign:ident, $assign_method:ident, $sym:tt) => {
        impl $op<u128> for &BitView {
            type Output = BitView;

            fn $method(self, rhs: u128) -> BitView {
                BitView::from_type(Rc::clone(self.view_type()), self.value() $sym rhs)
            }
        }

        impl $op<u128> for BitView {
            type Output = BitView;

            fn $method(self, rhs: u128) -> BitView {
                (&self).$method(rhs)
            }
        }

        /// Bits outside the view's mask are dropped from the result.
        impl $assign<u128> for BitView {
            fn $assign_method(&mut self, rhs: u128) {
                let value = self.value() $sym rhs;
                self.store(value);
            }
        }
    };
}

impl_bitwise!(BitAnd, bitand, BitAndAssign, bitand_assign, &);
impl_bitwise!(BitOr, bitor, BitOrAssign, bitor_assign, |);
impl_bitwise!(BitXor, bitxor, BitXorAssign, bitxor_assign, ^);

/// Shifting right past the width leaves nothing: `x >> n` is `0` for `n >= 128`.
impl Shr<u32> for &BitView {
    type Output = u128;

    fn shr(self, rhs: u32) -> u128 {
        self.value().checked_shr(rhs).unwrap_or(0)
    }
}

macro_rules! impl_radix_fmt {
    ($($fmt:ident),*) => {$(
        impl fmt::$fmt for BitView {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::$fmt::fmt(&self.value(), f)
            }
        }
    )*};
}

impl_radix_fmt!(LowerHex, UpperHex, Binary, Octal);
