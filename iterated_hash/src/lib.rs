//! A toy Merkle-Damgård style hash: one compression call per input byte,
//! with AES-128 as the compression function and a state of at most one
//! block. Small states make birthday collisions cheap to find, which is
//! the point.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
extern crate openssl;

use failure::Error;
use openssl::symm::{encrypt, Cipher};

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, VecDeque};

pub const BLOCK_SIZE: usize = 16;

#[derive(Debug, Fail, PartialEq)]
pub enum HashError {
    #[fail(display = "state length must lie in [1, {}], got {}", max, length)]
    InvalidStateLength { length: usize, max: usize },

    #[fail(display = "state has length {}, expected {}", actual, expected)]
    StateLengthMismatch { expected: usize, actual: usize },

    #[fail(display = "compression function needs at least one round")]
    NoRounds,

    #[fail(display = "failed to encrypt block")]
    EncryptionFailed,
}

pub trait Compressor {
    fn state_len(&self) -> usize;
    fn compress(&self, state: &[u8], byte: u8) -> Result<Vec<u8>, Error>;
}

/// Encrypts the zero-padded input byte under the zero-padded state and keeps
/// the first `state_len` bytes, `rounds` times over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesCompressor {
    state_len: usize,
    rounds: usize,
}

impl AesCompressor {
    pub fn new(state_len: usize, rounds: usize) -> Result<Self, Error> {
        if state_len == 0 || state_len > BLOCK_SIZE {
            return Err(HashError::InvalidStateLength {
                length: state_len,
                max: BLOCK_SIZE,
            }
            .into());
        }
        if rounds == 0 {
            return Err(HashError::NoRounds.into());
        }
        Ok(AesCompressor { state_len, rounds })
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }
}

fn encrypt_block(block: &[u8], key: &[u8]) -> Result<Vec<u8>, Error> {
    let mut ciphertext = encrypt(Cipher::aes_128_ecb(), key, None, block)
        .map_err(|_| HashError::EncryptionFailed)?;

    ciphertext.truncate(BLOCK_SIZE);
    Ok(ciphertext)
}

impl Compressor for AesCompressor {
    fn state_len(&self) -> usize {
        self.state_len
    }

    fn compress(&self, state: &[u8], byte: u8) -> Result<Vec<u8>, Error> {
        if state.len() != self.state_len {
            return Err(HashError::StateLengthMismatch {
                expected: self.state_len,
                actual: state.len(),
            }
            .into());
        }
        let mut block = [0u8; BLOCK_SIZE];
        block[0] = byte;

        let mut h = state.to_vec();
        for _ in 0..self.rounds {
            let mut key = h;
            key.resize(BLOCK_SIZE, 0);
            h = encrypt_block(&block, &key)?;
            h.truncate(self.state_len);
        }
        Ok(h)
    }
}

#[derive(Debug, Clone)]
pub struct IteratedHash<C: Compressor> {
    compressor: C,
    state: Vec<u8>,
}

impl<C: Compressor> IteratedHash<C> {
    pub fn new(compressor: C, initial_state: &[u8]) -> Result<Self, Error> {
        if initial_state.len() != compressor.state_len() {
            return Err(HashError::StateLengthMismatch {
                expected: compressor.state_len(),
                actual: initial_state.len(),
            }
            .into());
        }
        Ok(IteratedHash {
            compressor,
            state: initial_state.to_vec(),
        })
    }

    pub fn update(&mut self, message: &[u8]) -> Result<&mut Self, Error> {
        for &byte in message {
            self.state = self.compressor.compress(&self.state, byte)?;
        }
        Ok(self)
    }

    pub fn digest(&self) -> Vec<u8> {
        self.state.clone()
    }
}

pub fn aes_hash(initial_state: &[u8], rounds: usize) -> Result<IteratedHash<AesCompressor>, Error> {
    IteratedHash::new(AesCompressor::new(initial_state.len(), rounds)?, initial_state)
}

fn hash_with<F, C>(factory: &F, message: &[u8]) -> Result<Vec<u8>, Error>
where
    F: Fn() -> Result<IteratedHash<C>, Error>,
    C: Compressor,
{
    Ok(factory()?.update(message)?.digest())
}

// Minimal big-endian encoding, so that 1..=255 are single bytes.
fn counter_bytes(i: u64) -> Vec<u8> {
    let bytes = i.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}

const MAX_COUNTER: u64 = u32::MAX as u64;

/// Hashes the counters 1, 2, 3, ... and yields every pair of inputs that
/// lands on an already seen digest. Each new input is paired with all
/// earlier inputs in its bucket.
pub struct Collisions<F, C>
where
    F: Fn() -> Result<IteratedHash<C>, Error>,
    C: Compressor,
{
    factory: F,
    digest_to_inputs: HashMap<Vec<u8>, BTreeSet<Vec<u8>>>,
    pending: VecDeque<(Vec<u8>, Vec<u8>)>,
    counter: u64,
}

pub fn collisions<F, C>(factory: F) -> Collisions<F, C>
where
    F: Fn() -> Result<IteratedHash<C>, Error>,
    C: Compressor,
{
    Collisions {
        factory,
        digest_to_inputs: HashMap::new(),
        pending: VecDeque::new(),
        counter: 1,
    }
}

impl<F, C> Iterator for Collisions<F, C>
where
    F: Fn() -> Result<IteratedHash<C>, Error>,
    C: Compressor,
{
    type Item = Result<(Vec<u8>, Vec<u8>), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pair) = self.pending.pop_front() {
                return Some(Ok(pair));
            }
            if self.counter > MAX_COUNTER {
                return None;
            }
            let input = counter_bytes(self.counter);
            self.counter += 1;
            let digest = match hash_with(&self.factory, &input) {
                Ok(digest) => digest,
                Err(e) => return Some(Err(e)),
            };
            match self.digest_to_inputs.entry(digest) {
                Entry::Occupied(mut o) => {
                    for earlier in o.get() {
                        self.pending.push_back((earlier.clone(), input.clone()));
                    }
                    o.get_mut().insert(input);
                }
                Entry::Vacant(v) => {
                    let mut inputs = BTreeSet::new();
                    inputs.insert(input);
                    v.insert(inputs);
                }
            }
        }
    }
}

pub fn generate_collisions<F, C>(factory: F, count: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Error>
where
    F: Fn() -> Result<IteratedHash<C>, Error>,
    C: Compressor,
{
    collisions(factory).take(count).collect()
}

/// Looks through the first `count` collisions of `f` for a pair that also
/// collides under `g`.
pub fn find_cascade_collision<F, G, C, D>(
    f: F,
    g: G,
    count: usize,
) -> Result<Option<(Vec<u8>, Vec<u8>)>, Error>
where
    F: Fn() -> Result<IteratedHash<C>, Error>,
    G: Fn() -> Result<IteratedHash<D>, Error>,
    C: Compressor,
    D: Compressor,
{
    for (tried, pair) in collisions(f).take(count).enumerate() {
        let (x, y) = pair?;
        if hash_with(&g, &x)? == hash_with(&g, &y)? {
            info!("collision under both functions after {} candidate pairs", tried + 1);
            return Ok(Some((x, y)));
        }
    }
    debug!("no common collision among {} pairs", count);
    Ok(None)
}
