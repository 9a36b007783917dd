#[macro_use]
extern crate failure;
extern crate hmac;
extern crate sha2;
extern crate subtle;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const DIGEST_SIZE: usize = 32;

#[derive(Debug, Fail)]
pub enum MacError {
    #[fail(display = "invalid key length {}", length)]
    InvalidKeyLength { length: usize },
}

/// SHA-256 over the concatenation of `parts`, in order.
pub fn hash(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, MacError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|_| MacError::InvalidKeyLength { length: key.len() })?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

// Runs in time independent of where the inputs first differ. Inputs of
// different length compare unequal.
pub fn tags_equal(expected: &[u8], actual: &[u8]) -> bool {
    expected.ct_eq(actual).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn hash_concatenates_parts() {
        let abc: &[u8] = b"abc";
        assert_eq!(hash(&[&abc[..2], &abc[2..]]), hash(&[abc]));
        assert_eq!(hash(&[&abc[..0], abc, &abc[3..]]), hash(&[abc]));
        assert_eq!(
            hash(&[abc]),
            from_hex("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(hash(&[]).len(), DIGEST_SIZE);
    }

    // RFC 4231, test case 2
    #[test]
    fn hmac_sha256_known_answer() {
        assert_eq!(
            hmac_sha256(b"Jefe", b"what do ya want for nothing?").unwrap(),
            from_hex("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
        );
    }

    #[test]
    fn hmac_accepts_long_and_empty_keys() {
        assert_eq!(hmac_sha256(&[0xaa; 131], b"message").unwrap().len(), DIGEST_SIZE);
        assert_eq!(hmac_sha256(&[], b"").unwrap().len(), DIGEST_SIZE);
    }

    #[test]
    fn tag_comparison() {
        assert!(tags_equal(b"same tag", b"same tag"));
        assert!(!tags_equal(b"same tag", b"same taG"));
        assert!(!tags_equal(b"short", b"shorter"));
    }
}
