//! Word256 (C1): the 256-bit integer the whole interpreter operates on.
//!
//! The teacher represents words as `ethereum_types::U256` and reinterprets
//! them as signed via a companion `i256` crate (`I256::from(u256)`,
//! `I256::into()`). This spec keeps `U256` as the concrete representation
//! (it is already four 64-bit little-endian limbs, exactly as §3 specifies)
//! but drops the external signed-integer crate: instead, [`Word256Ext`]
//! provides the signed operations the teacher's `instructions::{arithmetic,
//! bitwise, boolean}` modules needed from `i256`, implemented directly in
//! terms of `U256`'s two's-complement bit pattern. This keeps the dependency
//! stack unchanged from the teacher's `ethereum-types` choice while avoiding
//! a second integer type.

use ethereum_types::{U256, U512};

/// The 256-bit word all stack slots and memory words are made of.
pub type Word256 = U256;

/// Two's-complement sign of a `Word256`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Zero,
    Positive,
    Negative,
}

const SIGN_BIT: usize = 255;

pub trait Word256Ext: Sized {
    fn sign(&self) -> Sign;
    fn is_negative(&self) -> bool;
    /// Two's-complement negation (wrapping, as all arithmetic here does).
    fn negate(&self) -> Self;
    fn signed_cmp(&self, other: &Self) -> core::cmp::Ordering;
    fn to_signed_div(&self, other: &Self) -> Self;
    fn to_signed_mod(&self, other: &Self) -> Self;
    fn sar(&self, shift: &Self) -> Self;
    fn byte_at(&self, index: &Self) -> Self;
    fn sign_extend(&self, boundary_byte: &Self) -> Self;
}

impl Word256Ext for Word256 {
    #[inline]
    fn sign(&self) -> Sign {
        if self.is_zero() {
            Sign::Zero
        } else if self.bit(SIGN_BIT) {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }

    #[inline]
    fn is_negative(&self) -> bool {
        self.bit(SIGN_BIT)
    }

    #[inline]
    fn negate(&self) -> Self {
        (!*self).overflowing_add(Word256::one()).0
    }

    fn signed_cmp(&self, other: &Self) -> core::cmp::Ordering {
        match (self.is_negative(), other.is_negative()) {
            (true, false) => core::cmp::Ordering::Less,
            (false, true) => core::cmp::Ordering::Greater,
            _ => self.cmp(other),
        }
    }

    /// `SDIV`. Division by zero yields zero (EVM-defined); `MIN / -1` yields
    /// `MIN` (no overflow trap), matching §3's invariants and §8 scenario 7.
    fn to_signed_div(&self, other: &Self) -> Self {
        if other.is_zero() {
            return Word256::zero();
        }

        let min = signed_min();
        if *self == min && *other == min.negate() {
            return min;
        }

        let (a_neg, a_abs) = abs(self);
        let (b_neg, b_abs) = abs(other);
        let quotient = a_abs / b_abs;
        if a_neg != b_neg {
            quotient.negate()
        } else {
            quotient
        }
    }

    /// `SMOD`. Division by zero yields zero; the remainder takes the sign of
    /// the dividend, per two's-complement truncating division.
    fn to_signed_mod(&self, other: &Self) -> Self {
        if other.is_zero() {
            return Word256::zero();
        }

        let (a_neg, a_abs) = abs(self);
        let (_, b_abs) = abs(other);
        let remainder = a_abs % b_abs;
        if a_neg {
            remainder.negate()
        } else {
            remainder
        }
    }

    /// `SAR`: arithmetic (sign-extending) right shift. Shifts by >= 256
    /// saturate to 0 (non-negative) or all-ones (negative), per §3.
    fn sar(&self, shift: &Self) -> Self {
        if shift >= &Word256::from(256) {
            return if self.is_negative() {
                Word256::max_value()
            } else {
                Word256::zero()
            };
        }

        let shift = shift.as_usize();
        if !self.is_negative() {
            return *self >> shift;
        }
        if shift == 0 {
            return *self;
        }
        // Shift in ones from the top: take the logical shift, then OR in a
        // mask of `shift` leading one-bits.
        let shifted = *self >> shift;
        let mask = (!Word256::zero()) << (256 - shift);
        shifted | mask
    }

    /// `BYTE(i, x)`: the big-endian byte at index `i` (0 = most significant),
    /// zero if `i >= 32`.
    fn byte_at(&self, index: &Self) -> Self {
        if *index >= Word256::from(32) {
            return Word256::zero();
        }
        let i = index.as_usize();
        // byte_index_be(0) is the most significant byte; `Word256::byte`
        // indexes from the least significant, so flip.
        Word256::from(self.byte(31 - i))
    }

    /// `SIGNEXTEND(b, x)`: sign-extends the byte at position `b` (0 = least
    /// significant byte) to fill the rest of the word. `b >= 31` is a no-op.
    fn sign_extend(&self, boundary_byte: &Self) -> Self {
        if *boundary_byte >= Word256::from(31) {
            return *self;
        }
        let byte_index = boundary_byte.as_usize();
        let bit_index = 8 * byte_index + 7;
        let sign_bit_set = self.bit(bit_index);
        if sign_bit_set {
            let mask = Word256::max_value() << (bit_index + 1);
            *self | mask
        } else {
            let mask = (Word256::one() << (bit_index + 1)) - Word256::one();
            *self & mask
        }
    }
}

fn abs(v: &Word256) -> (bool, Word256) {
    if v.is_negative() {
        (true, v.negate())
    } else {
        (false, *v)
    }
}

/// The two's-complement minimum: `1 << 255`.
pub fn signed_min() -> Word256 {
    Word256::one() << 255
}

/// `ADDMOD`/`MULMOD`: computed in 512-bit precision before reducing, per §3.
pub fn addmod(a: Word256, b: Word256, n: Word256) -> Word256 {
    if n.is_zero() {
        return Word256::zero();
    }
    let wide = (U512::from(a) + U512::from(b)) % U512::from(n);
    Word256::try_from(wide).expect("reduced modulo a 256-bit value")
}

pub fn mulmod(a: Word256, b: Word256, n: Word256) -> Word256 {
    if n.is_zero() {
        return Word256::zero();
    }
    let wide = (U512::from(a) * U512::from(b)) % U512::from(n);
    Word256::try_from(wide).expect("reduced modulo a 256-bit value")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdiv_min_by_minus_one_yields_min() {
        let min = signed_min();
        let minus_one = Word256::max_value();
        assert_eq!(min.to_signed_div(&minus_one), min);
    }

    #[test]
    fn sdiv_by_zero_is_zero() {
        assert_eq!(Word256::from(5).to_signed_div(&Word256::zero()), Word256::zero());
    }

    #[test]
    fn sar_of_negative_one_by_anything_is_all_ones() {
        assert_eq!(Word256::max_value().sar(&Word256::from(5)), Word256::max_value());
        assert_eq!(Word256::max_value().sar(&Word256::from(300)), Word256::max_value());
    }

    #[test]
    fn sar_large_shift_nonnegative_is_zero() {
        assert_eq!(Word256::from(12345).sar(&Word256::from(300)), Word256::zero());
    }

    #[test]
    fn byte_extraction_matches_big_endian_index() {
        let x = Word256::from(0x0102_0304u64);
        assert_eq!(x.byte_at(&Word256::from(31)), Word256::from(0x04));
        assert_eq!(x.byte_at(&Word256::from(28)), Word256::from(0x01));
        assert_eq!(x.byte_at(&Word256::from(32)), Word256::zero());
    }

    #[test]
    fn sign_extend_low_byte() {
        // 0xff sign-extends to all-ones when boundary byte = 0.
        let v = Word256::from(0xff);
        assert_eq!(v.sign_extend(&Word256::zero()), Word256::max_value());
        // 0x7f stays positive.
        let v = Word256::from(0x7f);
        assert_eq!(v.sign_extend(&Word256::zero()), Word256::from(0x7f));
    }

    #[test]
    fn sign_extend_noop_past_31() {
        let v = Word256::from(0xABCDu64);
        assert_eq!(v.sign_extend(&Word256::from(31)), v);
        assert_eq!(v.sign_extend(&Word256::from(99)), v);
    }

    #[test]
    fn addmod_wraps_through_512_bits() {
        let a = Word256::max_value();
        let b = Word256::from(2);
        let n = Word256::from(3);
        // (MAX + 2) mod 3, computed in 512-bit precision.
        let expected = (U512::from(a) + U512::from(b)) % U512::from(n);
        assert_eq!(addmod(a, b, n), Word256::try_from(expected).unwrap());
    }

    #[test]
    fn addmod_by_zero_modulus_is_zero() {
        assert_eq!(addmod(Word256::from(1), Word256::from(2), Word256::zero()), Word256::zero());
    }
}
