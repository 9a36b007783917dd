use bignum::BigNumTrait;
pub use bignum::NumBigUint as BigNum;
use failure::Error;
use mac::{hash, hmac_sha256};
use rand::Rng;

use crate::errors::SrpError;

pub const SALT_LEN: usize = 16;

// 1536-bit MODP group prime (RFC 3526, group 5).
const NIST_PRIME: [u8; 192] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xc9, 0x0f, 0xda, 0xa2,
    0x21, 0x68, 0xc2, 0x34, 0xc4, 0xc6, 0x62, 0x8b, 0x80, 0xdc, 0x1c, 0xd1,
    0x29, 0x02, 0x4e, 0x08, 0x8a, 0x67, 0xcc, 0x74, 0x02, 0x0b, 0xbe, 0xa6,
    0x3b, 0x13, 0x9b, 0x22, 0x51, 0x4a, 0x08, 0x79, 0x8e, 0x34, 0x04, 0xdd,
    0xef, 0x95, 0x19, 0xb3, 0xcd, 0x3a, 0x43, 0x1b, 0x30, 0x2b, 0x0a, 0x6d,
    0xf2, 0x5f, 0x14, 0x37, 0x4f, 0xe1, 0x35, 0x6d, 0x6d, 0x51, 0xc2, 0x45,
    0xe4, 0x85, 0xb5, 0x76, 0x62, 0x5e, 0x7e, 0xc6, 0xf4, 0x4c, 0x42, 0xe9,
    0xa6, 0x37, 0xed, 0x6b, 0x0b, 0xff, 0x5c, 0xb6, 0xf4, 0x06, 0xb7, 0xed,
    0xee, 0x38, 0x6b, 0xfb, 0x5a, 0x89, 0x9f, 0xa5, 0xae, 0x9f, 0x24, 0x11,
    0x7c, 0x4b, 0x1f, 0xe6, 0x49, 0x28, 0x66, 0x51, 0xec, 0xe4, 0x5b, 0x3d,
    0xc2, 0x00, 0x7c, 0xb8, 0xa1, 0x63, 0xbf, 0x05, 0x98, 0xda, 0x48, 0x36,
    0x1c, 0x55, 0xd3, 0x9a, 0x69, 0x16, 0x3f, 0xa8, 0xfd, 0x24, 0xcf, 0x5f,
    0x83, 0x65, 0x5d, 0x23, 0xdc, 0xa3, 0xad, 0x96, 0x1c, 0x62, 0xf3, 0x56,
    0x20, 0x85, 0x52, 0xbb, 0x9e, 0xd5, 0x29, 0x07, 0x70, 0x96, 0x96, 0x6d,
    0x67, 0x0c, 0x35, 0x4e, 0x4a, 0xbc, 0x98, 0x04, 0xf1, 0x74, 0x6c, 0x08,
    0xca, 0x23, 0x73, 0x27, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initialized,
    KeyAgreed,
    Authenticated,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Accepted = 1,
    Rejected = 0,
}

impl AuthResult {
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(AuthResult::Accepted),
            0 => Some(AuthResult::Rejected),
            _ => None,
        }
    }
}

/// What the verifier stores for an identity: the salt and `v = g^x mod N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub salt: Vec<u8>,
    pub verifier: BigNum,
}

/// Group parameters agreed out of band: prime modulus `N`, generator `g`
/// and multiplier `k`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SRP {
    N: BigNum,
    g: BigNum,
    k: BigNum,
}

pub fn serialize<T: BigNumTrait>(x: &T) -> Vec<u8> {
    x.to_bytes_be()
}

pub fn deserialize<T: BigNumTrait>(x: &[u8]) -> T {
    T::from_bytes_be(x)
}

impl Default for SRP {
    fn default() -> Self {
        Self::new()
    }
}

impl SRP {
    pub fn new() -> Self {
        Self::new_with_k(3)
    }

    pub fn new_with_k(k: u32) -> Self {
        SRP {
            N: BigNum::from_bytes_be(&NIST_PRIME),
            g: BigNum::from_u32(2),
            k: BigNum::from_u32(k),
        }
    }

    pub fn from_hex(N_hex: &str, g: u32, k: u32) -> Result<Self, Error> {
        let N = BigNum::from_hex_str(N_hex).map_err(|_| SrpError::InvalidParameters {
            reason: "modulus is not a hex string",
        })?;
        Self::from_parts(N, BigNum::from_u32(g), BigNum::from_u32(k))
    }

    pub fn from_parts(N: BigNum, g: BigNum, k: BigNum) -> Result<Self, Error> {
        let params = SRP { N, g, k };
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), Error> {
        let invalid = |reason| -> Result<(), Error> { Err(SrpError::InvalidParameters { reason }.into()) };
        if self.N <= BigNum::from_u32(3) || (&self.N % 2u32) == BigNum::zero() {
            return invalid("modulus must be an odd number greater than 3");
        }
        if !self.N.is_probably_prime()? {
            return invalid("modulus is not prime");
        }
        if self.g <= BigNum::one() || self.g >= self.N {
            return invalid("generator must lie in [2, N-1]");
        }
        if self.k >= self.N {
            return invalid("multiplier must be smaller than the modulus");
        }
        Ok(())
    }

    pub fn g(&self) -> &BigNum {
        &self.g
    }

    pub fn N(&self) -> &BigNum {
        &self.N
    }

    pub fn k(&self) -> &BigNum {
        &self.k
    }

    /// Picks a fresh salt and derives the verifier for `password`.
    pub fn enroll<R: Rng + ?Sized>(&self, password: &[u8], rng: &mut R) -> UserRecord {
        let mut salt = vec![0u8; SALT_LEN];
        rng.fill_bytes(&mut salt);
        self.enroll_with_salt(password, salt)
    }

    pub fn enroll_with_salt(&self, password: &[u8], salt: Vec<u8>) -> UserRecord {
        let verifier = self.password_to_verifier(&salt, password);
        UserRecord { salt, verifier }
    }

    pub fn password_to_verifier(&self, salt: &[u8], password: &[u8]) -> BigNum {
        let x = compute_x(salt, password);
        self.g.mod_exp(&x, &self.N)
    }

    /// Secret exponent for one session, uniform in `[1, N-1]`.
    pub fn gen_exponent<R: Rng + ?Sized>(&self, rng: &mut R) -> BigNum {
        BigNum::gen_range(&BigNum::one(), &self.N, rng)
    }

    pub fn is_zero_mod_N(&self, value: &BigNum) -> bool {
        value % &self.N == BigNum::zero()
    }

    pub fn in_range(&self, value: &BigNum) -> bool {
        *value >= BigNum::one() && *value < self.N
    }
}

/// `x = H(salt | password)`
pub fn compute_x(salt: &[u8], password: &[u8]) -> BigNum {
    deserialize(&hash(&[salt, password]))
}

/// `u = H(A | B)`
pub fn compute_u(A: &BigNum, B: &BigNum) -> BigNum {
    deserialize(&hash(&[&serialize(A)[..], &serialize(B)[..]]))
}

/// `K = H(S)`
pub fn session_key(S: &BigNum) -> Vec<u8> {
    hash(&[&serialize(S)[..]])
}

/// `HMAC(K, salt)`
pub fn auth_tag(K: &[u8], salt: &[u8]) -> Result<Vec<u8>, Error> {
    Ok(hmac_sha256(K, salt)?)
}

pub fn hash_secret(S: &BigNum, salt: &[u8]) -> Result<Vec<u8>, Error> {
    auth_tag(&session_key(S), salt)
}

pub fn zero() -> BigNum {
    BigNum::zero()
}
