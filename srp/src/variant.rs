//! The formulas that differ between standard SRP and the simplified protocol.
//!
//! Both variants share the session state machine in `server` and `client`;
//! only the computation of `B`, `u`, the client-side base and the checks on
//! received public values are swapped out.

use bignum::BigNumTrait;
use rand::Rng;

use crate::algo::{compute_u, BigNum, SRP};
use crate::errors::SrpError;

pub trait Variant {
    /// Whether message 2 carries `u` explicitly.
    const EXPLICIT_SCRAMBLER: bool;

    fn server_public(params: &SRP, v: &BigNum, g_b: &BigNum) -> BigNum;

    fn check_client_public(params: &SRP, A: &BigNum) -> Result<(), SrpError>;

    fn check_server_public(params: &SRP, B: &BigNum) -> Result<(), SrpError>;

    /// Picked once per verifier session, before `A` is known.
    fn choose_scrambler<R: Rng + ?Sized>(rng: &mut R) -> Option<BigNum>;

    fn server_scrambler(A: &BigNum, B: &BigNum, chosen: Option<&BigNum>) -> Result<BigNum, SrpError>;

    fn client_scrambler(A: &BigNum, B: &BigNum, received: Option<&BigNum>) -> Result<BigNum, SrpError>;

    /// The value the prover raises to `a + u*x`.
    fn client_base(params: &SRP, B: &BigNum, x: &BigNum) -> BigNum;
}

fn check_public_value(params: &SRP, value: &BigNum) -> Result<(), SrpError> {
    if params.is_zero_mod_N(value) {
        return Err(SrpError::DegeneratePublicValue);
    }
    if !params.in_range(value) {
        return Err(SrpError::PublicValueOutOfRange);
    }
    Ok(())
}

/// `B = k*v + g^b`, `u = H(A | B)`.
pub struct Standard;

impl Variant for Standard {
    const EXPLICIT_SCRAMBLER: bool = false;

    fn server_public(params: &SRP, v: &BigNum, g_b: &BigNum) -> BigNum {
        &(&(params.k() * v) + g_b) % params.N()
    }

    fn check_client_public(params: &SRP, A: &BigNum) -> Result<(), SrpError> {
        check_public_value(params, A)
    }

    fn check_server_public(params: &SRP, B: &BigNum) -> Result<(), SrpError> {
        check_public_value(params, B)
    }

    fn choose_scrambler<R: Rng + ?Sized>(_: &mut R) -> Option<BigNum> {
        None
    }

    fn server_scrambler(A: &BigNum, B: &BigNum, _: Option<&BigNum>) -> Result<BigNum, SrpError> {
        Ok(compute_u(A, B))
    }

    fn client_scrambler(A: &BigNum, B: &BigNum, received: Option<&BigNum>) -> Result<BigNum, SrpError> {
        match received {
            Some(_) => Err(SrpError::UnexpectedScrambler),
            None => Ok(compute_u(A, B)),
        }
    }

    fn client_base(params: &SRP, B: &BigNum, x: &BigNum) -> BigNum {
        let N = params.N();
        let kv = &(params.k() * &params.g().mod_exp(x, N)) % N;
        B.mod_sub(&kv, N)
    }
}

/// `B = g^b` and a server-chosen `u` sent in the clear. `B` no longer
/// depends on the verifier, so whoever plays the server can pick `b` and
/// `u` and test password guesses offline. Received public values are not
/// checked.
pub struct Simplified;

const SCRAMBLER_BITS: usize = 128;

impl Variant for Simplified {
    const EXPLICIT_SCRAMBLER: bool = true;

    fn server_public(_: &SRP, _: &BigNum, g_b: &BigNum) -> BigNum {
        g_b.clone()
    }

    fn check_client_public(_: &SRP, _: &BigNum) -> Result<(), SrpError> {
        Ok(())
    }

    fn check_server_public(_: &SRP, _: &BigNum) -> Result<(), SrpError> {
        Ok(())
    }

    fn choose_scrambler<R: Rng + ?Sized>(rng: &mut R) -> Option<BigNum> {
        Some(BigNum::gen_random(SCRAMBLER_BITS, rng))
    }

    fn server_scrambler(_: &BigNum, _: &BigNum, chosen: Option<&BigNum>) -> Result<BigNum, SrpError> {
        chosen.cloned().ok_or(SrpError::MissingScrambler)
    }

    fn client_scrambler(_: &BigNum, _: &BigNum, received: Option<&BigNum>) -> Result<BigNum, SrpError> {
        received.cloned().ok_or(SrpError::MissingScrambler)
    }

    fn client_base(_: &SRP, B: &BigNum, _: &BigNum) -> BigNum {
        B.clone()
    }
}
