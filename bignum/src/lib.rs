#[macro_use]
extern crate failure;
extern crate num_bigint;
extern crate num_traits;
extern crate openssl;
extern crate rand;

use failure::Error;
use num_traits::{Num, One, Zero};
use rand::Rng;

pub use num_bigint::{BigUint, RandBigInt};
pub use openssl::bn::{BigNum as OpensslBigNum, BigNumContext};

pub type NumBigUint = BigUint;

// Number of Miller-Rabin rounds used by `is_probably_prime`.
const PRIME_CHECKS: i32 = 64;

#[derive(Debug, Fail)]
pub enum BigNumError {
    #[fail(display = "invalid hex string")]
    InvalidHexString,
}

/// The arithmetic needed by the key-agreement code: fixed-modulus
/// exponentiation, modular subtraction, sampling below a bound and
/// conversion to and from big-endian bytes.
pub trait BigNumTrait: Sized + Ord + Clone + std::fmt::Debug {
    fn zero() -> Self;
    fn one() -> Self;
    fn from_u32(u: u32) -> Self;
    fn from_bytes_be(bytes: &[u8]) -> Self;
    fn to_bytes_be(&self) -> Vec<u8>;
    fn from_hex_str(s: &str) -> Result<Self, Error>;
    fn to_hex_str(&self) -> String;

    /// `self^exponent mod modulus`. Panics if `modulus` is zero.
    fn mod_exp(&self, exponent: &Self, modulus: &Self) -> Self;

    /// `(self - other) mod modulus`, wrapping around instead of underflowing.
    fn mod_sub(&self, other: &Self, modulus: &Self) -> Self;

    /// Uniform sample in `[0, bound)`. Panics if `bound` is zero.
    fn gen_below<R: Rng + ?Sized>(bound: &Self, rng: &mut R) -> Self;

    /// Uniform sample in `[low, high)`. Panics if the range is empty.
    fn gen_range<R: Rng + ?Sized>(low: &Self, high: &Self, rng: &mut R) -> Self;

    fn gen_random<R: Rng + ?Sized>(bits: usize, rng: &mut R) -> Self;
    fn is_probably_prime(&self) -> Result<bool, Error>;
    fn bits(&self) -> usize;
    fn bytes(&self) -> usize;
}

impl BigNumTrait for BigUint {
    fn zero() -> Self {
        Zero::zero()
    }

    fn one() -> Self {
        One::one()
    }

    fn from_u32(u: u32) -> Self {
        BigUint::from(u)
    }

    fn from_bytes_be(bytes: &[u8]) -> Self {
        BigUint::from_bytes_be(bytes)
    }

    fn to_bytes_be(&self) -> Vec<u8> {
        self.to_bytes_be()
    }

    fn from_hex_str(s: &str) -> Result<Self, Error> {
        BigUint::from_str_radix(s, 16).map_err(|_| BigNumError::InvalidHexString.into())
    }

    fn to_hex_str(&self) -> String {
        self.to_str_radix(16)
    }

    fn mod_exp(&self, exponent: &Self, modulus: &Self) -> Self {
        self.modpow(exponent, modulus)
    }

    fn mod_sub(&self, other: &Self, modulus: &Self) -> Self {
        let lhs = self % modulus;
        let rhs = other % modulus;
        if lhs >= rhs {
            lhs - rhs
        } else {
            modulus - &(rhs - lhs)
        }
    }

    fn gen_below<R: Rng + ?Sized>(bound: &Self, rng: &mut R) -> Self {
        rng.gen_biguint_below(bound)
    }

    fn gen_range<R: Rng + ?Sized>(low: &Self, high: &Self, rng: &mut R) -> Self {
        rng.gen_biguint_range(low, high)
    }

    fn gen_random<R: Rng + ?Sized>(bits: usize, rng: &mut R) -> Self {
        rng.gen_biguint(bits as u64)
    }

    fn is_probably_prime(&self) -> Result<bool, Error> {
        let mut ctx = BigNumContext::new()?;
        Ok(to_openssl(self)?.is_prime(PRIME_CHECKS, &mut ctx)?)
    }

    fn bits(&self) -> usize {
        self.bits() as usize
    }

    fn bytes(&self) -> usize {
        let bits = BigNumTrait::bits(self);
        let mut result = bits / 8;
        if bits % 8 != 0 {
            result += 1;
        }
        result
    }
}

pub fn to_openssl(n: &BigUint) -> Result<OpensslBigNum, Error> {
    Ok(OpensslBigNum::from_slice(&n.to_bytes_be())?)
}

pub fn from_openssl(n: &OpensslBigNum) -> BigUint {
    BigUint::from_bytes_be(&n.to_vec())
}
