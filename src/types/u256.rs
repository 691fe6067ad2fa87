//! 256-bit unsigned machine word.
//!
//! All arithmetic wraps modulo 2^256. Signed operations interpret the word as
//! two's complement. Division by zero yields zero, matching the interpreter's
//! semantics.

use crate::types::address::Address;
use crate::types::hash::Hash;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, BitAnd, BitOr, BitXor, Mul, Not, Shl, Shr, Sub};

/// 256-bit unsigned integer stored as four little-endian `u64` limbs.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct U256(pub [u64; 4]);

impl U256 {
    pub const ZERO: U256 = U256([0; 4]);
    pub const ONE: U256 = U256([1, 0, 0, 0]);
    pub const MAX: U256 = U256([u64::MAX; 4]);

    pub const fn from_u64(v: u64) -> U256 {
        U256([v, 0, 0, 0])
    }

    /// Reads a big-endian word.
    pub fn from_be_bytes(bytes: &[u8; 32]) -> U256 {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let start = 32 - (i + 1) * 8;
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[start..start + 8]);
            *limb = u64::from_be_bytes(chunk);
        }
        U256(limbs)
    }

    /// Reads up to 32 big-endian bytes, right-aligned.
    pub fn from_be_slice(bytes: &[u8]) -> U256 {
        let bytes = &bytes[bytes.len().saturating_sub(32)..];
        let mut word = [0u8; 32];
        word[32 - bytes.len()..].copy_from_slice(bytes);
        U256::from_be_bytes(&word)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().enumerate() {
            let start = 32 - (i + 1) * 8;
            out[start..start + 8].copy_from_slice(&limb.to_be_bytes());
        }
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }

    pub fn low_u64(&self) -> u64 {
        self.0[0]
    }

    /// Returns the value as `u64` if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[1] == 0 && self.0[2] == 0 && self.0[3] == 0 {
            Some(self.0[0])
        } else {
            None
        }
    }

    /// Returns the value as `usize` if it fits.
    pub fn to_usize(&self) -> Option<usize> {
        self.to_u64().and_then(|v| usize::try_from(v).ok())
    }

    /// Value of bit `i` (0 = least significant).
    pub fn bit(&self, i: usize) -> bool {
        i < 256 && (self.0[i / 64] >> (i % 64)) & 1 == 1
    }

    fn set_bit(&mut self, i: usize) {
        self.0[i / 64] |= 1 << (i % 64);
    }

    /// Number of significant bits.
    pub fn bits(&self) -> usize {
        for i in (0..4).rev() {
            if self.0[i] != 0 {
                return i * 64 + 64 - self.0[i].leading_zeros() as usize;
            }
        }
        0
    }

    /// Number of significant bytes.
    pub fn byte_len(&self) -> usize {
        self.bits().div_ceil(8)
    }

    pub fn overflowing_add(self, rhs: U256) -> (U256, bool) {
        let mut out = [0u64; 4];
        let mut carry = false;
        for (i, slot) in out.iter_mut().enumerate() {
            let (s1, c1) = self.0[i].overflowing_add(rhs.0[i]);
            let (s2, c2) = s1.overflowing_add(carry as u64);
            *slot = s2;
            carry = c1 || c2;
        }
        (U256(out), carry)
    }

    pub fn overflowing_sub(self, rhs: U256) -> (U256, bool) {
        let mut out = [0u64; 4];
        let mut borrow = false;
        for (i, slot) in out.iter_mut().enumerate() {
            let (d1, b1) = self.0[i].overflowing_sub(rhs.0[i]);
            let (d2, b2) = d1.overflowing_sub(borrow as u64);
            *slot = d2;
            borrow = b1 || b2;
        }
        (U256(out), borrow)
    }

    pub fn wrapping_add(self, rhs: U256) -> U256 {
        self.overflowing_add(rhs).0
    }

    pub fn wrapping_sub(self, rhs: U256) -> U256 {
        self.overflowing_sub(rhs).0
    }

    pub fn wrapping_mul(self, rhs: U256) -> U256 {
        let mut out = [0u64; 4];
        for i in 0..4 {
            let mut carry: u128 = 0;
            for j in 0..(4 - i) {
                let cur = out[i + j] as u128 + (self.0[i] as u128) * (rhs.0[j] as u128) + carry;
                out[i + j] = cur as u64;
                carry = cur >> 64;
            }
        }
        U256(out)
    }

    /// Quotient and remainder; both zero when `divisor` is zero.
    pub fn div_rem(self, divisor: U256) -> (U256, U256) {
        if divisor.is_zero() {
            return (U256::ZERO, U256::ZERO);
        }
        if self < divisor {
            return (U256::ZERO, self);
        }
        let mut quotient = U256::ZERO;
        let mut rem = U256::ZERO;
        for i in (0..self.bits()).rev() {
            let carry = rem.bit(255);
            rem = rem << 1;
            if self.bit(i) {
                rem.0[0] |= 1;
            }
            if carry || rem >= divisor {
                rem = rem.wrapping_sub(divisor);
                quotient.set_bit(i);
            }
        }
        (quotient, rem)
    }

    pub fn wrapping_neg(self) -> U256 {
        (!self).wrapping_add(U256::ONE)
    }

    /// True when bit 255 is set.
    pub fn is_negative(&self) -> bool {
        self.bit(255)
    }

    fn abs(self) -> U256 {
        if self.is_negative() {
            self.wrapping_neg()
        } else {
            self
        }
    }

    pub fn signed_div(self, rhs: U256) -> U256 {
        if rhs.is_zero() {
            return U256::ZERO;
        }
        let (q, _) = self.abs().div_rem(rhs.abs());
        if self.is_negative() != rhs.is_negative() {
            q.wrapping_neg()
        } else {
            q
        }
    }

    /// Signed remainder; the result takes the sign of `self`.
    pub fn signed_rem(self, rhs: U256) -> U256 {
        if rhs.is_zero() {
            return U256::ZERO;
        }
        let (_, r) = self.abs().div_rem(rhs.abs());
        if self.is_negative() { r.wrapping_neg() } else { r }
    }

    pub fn add_mod(self, rhs: U256, modulus: U256) -> U256 {
        if modulus.is_zero() {
            return U256::ZERO;
        }
        let a = self.div_rem(modulus).1;
        let b = rhs.div_rem(modulus).1;
        let (sum, carry) = a.overflowing_add(b);
        if carry || sum >= modulus {
            sum.wrapping_sub(modulus)
        } else {
            sum
        }
    }

    pub fn mul_mod(self, rhs: U256, modulus: U256) -> U256 {
        if modulus.is_zero() {
            return U256::ZERO;
        }
        let a = self.div_rem(modulus).1;
        let mut acc = U256::ZERO;
        for i in (0..rhs.bits()).rev() {
            acc = acc.add_mod(acc, modulus);
            if rhs.bit(i) {
                acc = acc.add_mod(a, modulus);
            }
        }
        acc
    }

    pub fn wrapping_pow(self, exponent: U256) -> U256 {
        let mut result = U256::ONE;
        let mut base = self;
        for i in 0..exponent.bits() {
            if exponent.bit(i) {
                result = result.wrapping_mul(base);
            }
            base = base.wrapping_mul(base);
        }
        result
    }

    /// Extends the sign of the `(byte_index + 1)`-byte value held in `self`.
    pub fn sign_extend(self, byte_index: U256) -> U256 {
        let Some(b) = byte_index.to_usize().filter(|&b| b < 31) else {
            return self;
        };
        let sign_bit = b * 8 + 7;
        let mask = (U256::ONE << (sign_bit + 1)).wrapping_sub(U256::ONE);
        if self.bit(sign_bit) {
            self | !mask
        } else {
            self & mask
        }
    }

    /// Big-endian byte `index` of the word, zero when out of range.
    pub fn byte(self, index: U256) -> U256 {
        match index.to_usize() {
            Some(i) if i < 32 => U256::from_u64(self.to_be_bytes()[i] as u64),
            _ => U256::ZERO,
        }
    }

    /// Arithmetic right shift.
    pub fn sar(self, shift: usize) -> U256 {
        if !self.is_negative() {
            return self >> shift;
        }
        if shift >= 256 {
            return U256::MAX;
        }
        !((!self) >> shift)
    }

    pub fn signed_cmp(&self, other: &U256) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.cmp(other),
        }
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        for i in (0..4).rev() {
            match self.0[i].cmp(&other.0[i]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for U256 {
    type Output = U256;
    fn add(self, rhs: U256) -> U256 {
        self.wrapping_add(rhs)
    }
}

impl Sub for U256 {
    type Output = U256;
    fn sub(self, rhs: U256) -> U256 {
        self.wrapping_sub(rhs)
    }
}

impl Mul for U256 {
    type Output = U256;
    fn mul(self, rhs: U256) -> U256 {
        self.wrapping_mul(rhs)
    }
}

impl BitAnd for U256 {
    type Output = U256;
    fn bitand(self, rhs: U256) -> U256 {
        U256(std::array::from_fn(|i| self.0[i] & rhs.0[i]))
    }
}

impl BitOr for U256 {
    type Output = U256;
    fn bitor(self, rhs: U256) -> U256 {
        U256(std::array::from_fn(|i| self.0[i] | rhs.0[i]))
    }
}

impl BitXor for U256 {
    type Output = U256;
    fn bitxor(self, rhs: U256) -> U256 {
        U256(std::array::from_fn(|i| self.0[i] ^ rhs.0[i]))
    }
}

impl Not for U256 {
    type Output = U256;
    fn not(self) -> U256 {
        U256(self.0.map(|l| !l))
    }
}

impl Shl<usize> for U256 {
    type Output = U256;
    fn shl(self, shift: usize) -> U256 {
        if shift >= 256 {
            return U256::ZERO;
        }
        let limbs = shift / 64;
        let bits = shift % 64;
        let mut out = [0u64; 4];
        for i in (limbs..4).rev() {
            let src = i - limbs;
            out[i] = self.0[src] << bits;
            if bits > 0 && src > 0 {
                out[i] |= self.0[src - 1] >> (64 - bits);
            }
        }
        U256(out)
    }
}

impl Shr<usize> for U256 {
    type Output = U256;
    fn shr(self, shift: usize) -> U256 {
        if shift >= 256 {
            return U256::ZERO;
        }
        let limbs = shift / 64;
        let bits = shift % 64;
        let mut out = [0u64; 4];
        for i in 0..(4 - limbs) {
            let src = i + limbs;
            out[i] = self.0[src] >> bits;
            if bits > 0 && src + 1 < 4 {
                out[i] |= self.0[src + 1] << (64 - bits);
            }
        }
        U256(out)
    }
}

impl From<u64> for U256 {
    fn from(v: u64) -> Self {
        U256::from_u64(v)
    }
}

impl From<bool> for U256 {
    fn from(v: bool) -> Self {
        U256::from_u64(v as u64)
    }
}

impl From<Address> for U256 {
    fn from(a: Address) -> Self {
        U256::from_be_slice(&a.0)
    }
}

impl From<U256> for Address {
    fn from(v: U256) -> Self {
        Address::from_word(&v.to_be_bytes())
    }
}

impl From<Hash> for U256 {
    fn from(h: Hash) -> Self {
        U256::from_be_bytes(&h.0)
    }
}

impl From<U256> for Hash {
    fn from(v: U256) -> Self {
        Hash(v.to_be_bytes())
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_be_bytes()))
    }
}
