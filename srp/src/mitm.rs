//! An attacker posing as a simplified-protocol server.
//!
//! It answers the prover with values it picked itself (by default an empty
//! salt, `B = g` and `u = 1`), keeps the prover's `A` and tag, and then
//! checks password guesses offline. For `B = g^b` the prover computes
//! `S = B^(a + u*x) = (A * g^(u*x))^b mod N`, which needs nothing but `A`
//! and the guess.

use bignum::BigNumTrait;
use failure::Error;
use mac::tags_equal;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use crate::algo::{compute_x, hash_secret, AuthResult, BigNum, SessionState, SRP};
use crate::dictionary::Dictionary;
use crate::errors::SrpError;
use crate::messages::{ClientHello, ClientProof, ServerChallenge};
use crate::server::ServerRole;

const PROGRESS_INTERVAL: usize = 1000;

#[derive(Debug, Clone)]
pub struct MitmConfig {
    /// Salt sent to the prover.
    pub salt: Vec<u8>,
    /// Exponent of the forged `B = g^b`.
    pub b: BigNum,
    /// Forced scrambling parameter.
    pub u: BigNum,
    /// Threads used for the offline search.
    pub workers: usize,
}

impl Default for MitmConfig {
    fn default() -> Self {
        MitmConfig {
            salt: Vec::new(),
            b: BigNum::one(),
            u: BigNum::one(),
            workers: 1,
        }
    }
}

/// A captured transcript, ready to test password guesses against.
#[derive(Debug, Clone)]
pub struct PasswordOracle {
    params: SRP,
    A: BigNum,
    salt: Vec<u8>,
    b: BigNum,
    u: BigNum,
    client_tag: Vec<u8>,
}

impl PasswordOracle {
    pub fn new(params: SRP, config: &MitmConfig, A: BigNum, client_tag: Vec<u8>) -> Self {
        PasswordOracle {
            params,
            A,
            salt: config.salt.clone(),
            b: config.b.clone(),
            u: config.u.clone(),
            client_tag,
        }
    }

    pub fn is_password(&self, password_candidate: &[u8]) -> Result<bool, Error> {
        Ok(tags_equal(
            &self.client_tag,
            &self.password_to_client_tag(password_candidate)?,
        ))
    }

    fn password_to_client_tag(&self, password_candidate: &[u8]) -> Result<Vec<u8>, Error> {
        let N = self.params.N();
        let g = self.params.g();
        let x = compute_x(&self.salt, password_candidate);

        // The crucial point is that for B = g^b the expression
        // (B ^ a) % N
        // from the client computation is equal to A^b.
        let S = (&self.A * &g.mod_exp(&(&self.u * &x), N)).mod_exp(&self.b, N);
        hash_secret(&S, &self.salt)
    }

    /// Tries every candidate in order on the calling thread.
    pub fn search<D: Dictionary>(&self, dictionary: &D) -> Result<Vec<u8>, Error> {
        let tried = AtomicUsize::new(0);
        match self.scan_shard(dictionary, 0, 1, &AtomicBool::new(false), &tried)? {
            Some(password) => Ok(password),
            None => Err(SrpError::DictionaryExhausted {
                candidates: tried.into_inner(),
            }
            .into()),
        }
    }

    /// Splits the dictionary by position across `workers` threads. Each
    /// worker reads the source from the start and keeps every
    /// `workers`-th candidate; the first hit stops the others.
    pub fn search_parallel<D: Dictionary>(&self, dictionary: &D, workers: usize) -> Result<Vec<u8>, Error> {
        if workers <= 1 {
            return self.search(dictionary);
        }
        let found = AtomicBool::new(false);
        let tried = AtomicUsize::new(0);
        let results: Vec<Result<Option<Vec<u8>>, Error>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|shard| {
                    let (found, tried) = (&found, &tried);
                    scope.spawn(move || self.scan_shard(dictionary, shard, workers, found, tried))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(format_err!("dictionary worker panicked")))
                })
                .collect()
        });

        let mut first_error = None;
        for result in results {
            match result {
                Ok(Some(password)) => return Ok(password),
                Ok(None) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Err(SrpError::DictionaryExhausted {
                candidates: tried.into_inner(),
            }
            .into()),
        }
    }

    fn scan_shard<D: Dictionary>(
        &self,
        dictionary: &D,
        shard: usize,
        stride: usize,
        found: &AtomicBool,
        tried: &AtomicUsize,
    ) -> Result<Option<Vec<u8>>, Error> {
        for (index, word) in dictionary.words()?.enumerate() {
            if found.load(Ordering::Relaxed) {
                return Ok(None);
            }
            let word = word?;
            if index % stride != shard {
                continue;
            }
            let count = tried.fetch_add(1, Ordering::Relaxed) + 1;
            if count % PROGRESS_INTERVAL == 0 {
                debug!("tried {} candidate passwords", count);
            }
            if self.is_password(&word)? {
                found.store(true, Ordering::Relaxed);
                info!("recovered password after {} candidates", count);
                return Ok(Some(word));
            }
        }
        Ok(None)
    }
}

/// Impersonates a simplified-protocol verifier and cracks the captured tag
/// with `dictionary`.
pub struct Mitm<D: Dictionary> {
    params: SRP,
    config: MitmConfig,
    dictionary: D,
    A: Option<BigNum>,
    oracle: Option<PasswordOracle>,
    state: SessionState,
}

impl<D: Dictionary> Mitm<D> {
    pub fn new(params: SRP, dictionary: D) -> Self {
        Self::with_config(params, MitmConfig::default(), dictionary)
    }

    pub fn with_config(params: SRP, config: MitmConfig, dictionary: D) -> Self {
        Mitm {
            params,
            config,
            dictionary,
            A: None,
            oracle: None,
            state: SessionState::Initialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The captured transcript, once message 3 has arrived.
    pub fn oracle(&self) -> Option<&PasswordOracle> {
        self.oracle.as_ref()
    }

    /// Stores `A` and answers with the forged `(salt, B, u)`.
    pub fn receive_client_public(&mut self, _identity: &[u8], A: &BigNum) -> Result<ServerChallenge, Error> {
        if self.state != SessionState::Initialized {
            return Err(SrpError::UnexpectedState { state: self.state }.into());
        }
        self.A = Some(A.clone());
        self.state = SessionState::KeyAgreed;
        Ok(ServerChallenge {
            salt: self.config.salt.clone(),
            B: self.params.g().mod_exp(&self.config.b, self.params.N()),
            u: Some(self.config.u.clone()),
        })
    }

    /// Captures the tag and runs the offline search.
    pub fn receive_client_tag(&mut self, tag: &[u8]) -> Result<Vec<u8>, Error> {
        let A = match (&self.A, self.state) {
            (Some(A), SessionState::KeyAgreed) => A.clone(),
            _ => return Err(SrpError::UnexpectedState { state: self.state }.into()),
        };
        let oracle = PasswordOracle::new(self.params.clone(), &self.config, A, tag.to_vec());
        let result = oracle.search_parallel(&self.dictionary, self.config.workers);
        self.oracle = Some(oracle);
        self.state = if result.is_ok() {
            SessionState::Authenticated
        } else {
            SessionState::Rejected
        };
        result
    }
}

impl<D: Dictionary> ServerRole for Mitm<D> {
    type Outcome = Vec<u8>;

    fn receive_client_public(&mut self, hello: &ClientHello) -> Result<ServerChallenge, Error> {
        Mitm::receive_client_public(self, &hello.identity, &hello.A)
    }

    fn receive_client_tag(&mut self, proof: &ClientProof) -> Result<Vec<u8>, Error> {
        Mitm::receive_client_tag(self, &proof.tag)
    }

    // The prover is always told it got in.
    fn login_result(_: &Vec<u8>) -> AuthResult {
        AuthResult::Accepted
    }
}
