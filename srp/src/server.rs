use bignum::BigNumTrait;
use failure::Error;
use mac::tags_equal;
use rand::Rng;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::algo::{auth_tag, session_key, AuthResult, BigNum, SessionState, UserRecord, SRP};
use crate::communication::Communicate;
use crate::errors::SrpError;
use crate::messages::{ClientHello, ClientProof, Registration, Request, ServerChallenge};
use crate::variant::{Simplified, Standard, Variant};

/// The two-message contract of whoever answers a prover: the legitimate
/// verifier, or anything that impersonates it.
pub trait ServerRole {
    type Outcome;

    fn receive_client_public(&mut self, hello: &ClientHello) -> Result<ServerChallenge, Error>;

    fn receive_client_tag(&mut self, proof: &ClientProof) -> Result<Self::Outcome, Error>;

    /// What the prover is told once message 3 has been processed.
    fn login_result(outcome: &Self::Outcome) -> AuthResult;
}

/// Runs one login over `stream`, starting with the request byte.
pub fn serve<R: ServerRole, T: Communicate>(role: &mut R, stream: &mut T) -> Result<R::Outcome, Error> {
    match Request::receive(stream)? {
        Request::Login => {
            let hello = ClientHello::receive(stream)?;
            respond(role, &hello, stream)
        }
        Request::Register => Err(SrpError::MalformedMessage("request").into()),
    }
}

/// Finishes a login whose first message has already been read.
pub fn respond<R: ServerRole, T: Communicate>(
    role: &mut R,
    hello: &ClientHello,
    stream: &mut T,
) -> Result<R::Outcome, Error> {
    let challenge = role.receive_client_public(hello)?;
    challenge.send(stream)?;
    let proof = ClientProof::receive(stream)?;
    let outcome = role.receive_client_tag(&proof)?;
    R::login_result(&outcome).send(stream)?;
    Ok(outcome)
}

/// Server side of one key agreement.
pub struct VerifierSession<V: Variant> {
    params: SRP,
    identity: Vec<u8>,
    record: UserRecord,
    b: BigNum,
    chosen_u: Option<BigNum>,
    state: SessionState,
    shared_secret: Option<BigNum>,
    key: Option<Vec<u8>>,
    variant: PhantomData<V>,
}

pub type StandardVerifier = VerifierSession<Standard>;
pub type SimplifiedVerifier = VerifierSession<Simplified>;

impl<V: Variant> VerifierSession<V> {
    pub fn new(identity: &[u8], password: &[u8], params: SRP) -> Self {
        Self::new_with_rng(identity, password, params, &mut rand::thread_rng())
    }

    /// Enrolls `password` under a fresh salt and starts a session for it.
    pub fn new_with_rng<R: Rng + ?Sized>(identity: &[u8], password: &[u8], params: SRP, rng: &mut R) -> Self {
        let record = params.enroll(password, rng);
        Self::from_record(identity, record, params, rng)
    }

    pub fn from_record<R: Rng + ?Sized>(identity: &[u8], record: UserRecord, params: SRP, rng: &mut R) -> Self {
        let b = params.gen_exponent(rng);
        let chosen_u = V::choose_scrambler(rng);
        Self::from_secrets(identity, record, params, b, chosen_u)
    }

    /// Session with every random input pinned. `chosen_u` is only consulted
    /// by variants that let the server pick `u`.
    pub fn from_secrets(
        identity: &[u8],
        record: UserRecord,
        params: SRP,
        b: BigNum,
        chosen_u: Option<BigNum>,
    ) -> Self {
        VerifierSession {
            params,
            identity: identity.to_vec(),
            record,
            b,
            chosen_u,
            state: SessionState::Initialized,
            shared_secret: None,
            key: None,
            variant: PhantomData,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn salt(&self) -> &[u8] {
        &self.record.salt
    }

    pub fn session_key(&self) -> Option<&[u8]> {
        self.key.as_deref()
    }

    pub fn shared_secret(&self) -> Option<&BigNum> {
        self.shared_secret.as_ref()
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), SrpError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SrpError::UnexpectedState { state: self.state })
        }
    }

    /// Message 1 in, message 2 out. Derives `S` and `K`.
    pub fn receive_client_public(&mut self, identity: &[u8], A: &BigNum) -> Result<ServerChallenge, Error> {
        self.expect_state(SessionState::Initialized)?;
        if identity != self.identity.as_slice() {
            return Err(SrpError::UnknownIdentity.into());
        }
        V::check_client_public(&self.params, A)?;

        let N = self.params.N();
        let v = &self.record.verifier;
        let g_b = self.params.g().mod_exp(&self.b, N);
        let B = V::server_public(&self.params, v, &g_b);
        let u = V::server_scrambler(A, &B, self.chosen_u.as_ref())?;

        let S = (A * &v.mod_exp(&u, N)).mod_exp(&self.b, N);
        self.key = Some(session_key(&S));
        self.shared_secret = Some(S);
        self.state = SessionState::KeyAgreed;
        debug!("verifier session: key agreed");

        Ok(ServerChallenge {
            salt: self.record.salt.clone(),
            B,
            u: if V::EXPLICIT_SCRAMBLER { Some(u) } else { None },
        })
    }

    /// Message 3 in. A mismatch moves the session to `Rejected` for good.
    pub fn receive_client_tag(&mut self, tag: &[u8]) -> Result<AuthResult, Error> {
        self.expect_state(SessionState::KeyAgreed)?;
        let key = self
            .key
            .as_ref()
            .ok_or(SrpError::UnexpectedState { state: self.state })?;
        let expected = auth_tag(key, &self.record.salt)?;
        if tags_equal(&expected, tag) {
            self.state = SessionState::Authenticated;
            info!("verifier session: client authenticated");
            Ok(AuthResult::Accepted)
        } else {
            self.state = SessionState::Rejected;
            warn!("verifier session: authentication tag rejected");
            Ok(AuthResult::Rejected)
        }
    }
}

impl<V: Variant> ServerRole for VerifierSession<V> {
    type Outcome = AuthResult;

    fn receive_client_public(&mut self, hello: &ClientHello) -> Result<ServerChallenge, Error> {
        VerifierSession::receive_client_public(self, &hello.identity, &hello.A)
    }

    fn receive_client_tag(&mut self, proof: &ClientProof) -> Result<AuthResult, Error> {
        VerifierSession::receive_client_tag(self, &proof.tag)
    }

    fn login_result(outcome: &AuthResult) -> AuthResult {
        *outcome
    }
}

/// Keeps the user database and serves registration and login requests.
pub struct Server<V: Variant> {
    params: SRP,
    user_database: HashMap<Vec<u8>, UserRecord>,
    variant: PhantomData<V>,
}

pub type StandardServer = Server<Standard>;
pub type SimplifiedServer = Server<Simplified>;

impl<V: Variant> Server<V> {
    pub fn new(params: SRP) -> Self {
        Server {
            params,
            user_database: HashMap::new(),
            variant: PhantomData,
        }
    }

    pub fn params(&self) -> &SRP {
        &self.params
    }

    pub fn register(&mut self, identity: &[u8], record: UserRecord) -> Result<(), Error> {
        match self.user_database.entry(identity.to_vec()) {
            Entry::Occupied(_) => Err(SrpError::IdentityTaken.into()),
            Entry::Vacant(v) => {
                v.insert(record);
                Ok(())
            }
        }
    }

    pub fn is_registered(&self, identity: &[u8]) -> bool {
        self.user_database.contains_key(identity)
    }

    /// Serves one connection. Returns the login outcome, or `None` for a
    /// registration.
    pub fn handle_client<T: Communicate>(&mut self, stream: &mut T) -> Result<Option<AuthResult>, Error> {
        match Request::receive(stream)? {
            Request::Register => {
                let registration = Registration::receive(stream)?;
                let result = self.register(&registration.identity, registration.record);
                let ack = if result.is_ok() {
                    AuthResult::Accepted
                } else {
                    AuthResult::Rejected
                };
                ack.send(stream)?;
                result.map(|_| None)
            }
            Request::Login => {
                let hello = ClientHello::receive(stream)?;
                let record = self
                    .user_database
                    .get(&hello.identity)
                    .cloned()
                    .ok_or(SrpError::UnknownIdentity)?;
                let mut session = VerifierSession::<V>::from_record(
                    &hello.identity,
                    record,
                    self.params.clone(),
                    &mut rand::thread_rng(),
                );
                respond(&mut session, &hello, stream).map(Some)
            }
        }
    }
}
