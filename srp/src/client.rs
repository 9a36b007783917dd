use bignum::BigNumTrait;
use failure::Error;
use rand::Rng;

use std::marker::PhantomData;

use crate::algo::{
    auth_tag, compute_x, hash_secret, session_key, zero, AuthResult, BigNum, SessionState, SRP,
};
use crate::communication::Communicate;
use crate::errors::SrpError;
use crate::messages::{ClientHello, ClientProof, Registration, Request, ServerChallenge};
use crate::variant::{Simplified, Standard, Variant};

/// Client side of one key agreement. Holds the password; `a` never leaves it.
pub struct ProverSession<V: Variant> {
    params: SRP,
    identity: Vec<u8>,
    password: Vec<u8>,
    a: BigNum,
    A: BigNum,
    state: SessionState,
    shared_secret: Option<BigNum>,
    key: Option<Vec<u8>>,
    variant: PhantomData<V>,
}

pub type StandardProver = ProverSession<Standard>;
pub type SimplifiedProver = ProverSession<Simplified>;

impl<V: Variant> ProverSession<V> {
    pub fn new(identity: &[u8], password: &[u8], params: SRP) -> Self {
        Self::new_with_rng(identity, password, params, &mut rand::thread_rng())
    }

    pub fn new_with_rng<R: Rng + ?Sized>(identity: &[u8], password: &[u8], params: SRP, rng: &mut R) -> Self {
        let a = params.gen_exponent(rng);
        Self::with_exponent(identity, password, params, a)
    }

    pub fn with_exponent(identity: &[u8], password: &[u8], params: SRP, a: BigNum) -> Self {
        let A = params.g().mod_exp(&a, params.N());
        ProverSession {
            params,
            identity: identity.to_vec(),
            password: password.to_vec(),
            a,
            A,
            state: SessionState::Initialized,
            shared_secret: None,
            key: None,
            variant: PhantomData,
        }
    }

    pub fn A(&self) -> &BigNum {
        &self.A
    }

    /// Message 1.
    pub fn hello(&self) -> ClientHello {
        ClientHello {
            identity: self.identity.clone(),
            A: self.A.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_key(&self) -> Option<&[u8]> {
        self.key.as_deref()
    }

    pub fn shared_secret(&self) -> Option<&BigNum> {
        self.shared_secret.as_ref()
    }

    /// Message 2 in, message 3 out.
    pub fn receive_server_challenge(&mut self, challenge: &ServerChallenge) -> Result<ClientProof, Error> {
        if self.state != SessionState::Initialized {
            return Err(SrpError::UnexpectedState { state: self.state }.into());
        }
        let B = &challenge.B;
        V::check_server_public(&self.params, B)?;
        let u = V::client_scrambler(&self.A, B, challenge.u.as_ref())?;
        let x = compute_x(&challenge.salt, &self.password);

        let base = V::client_base(&self.params, B, &x);
        let S = base.mod_exp(&(&self.a + &(&u * &x)), self.params.N());
        let K = session_key(&S);
        let tag = auth_tag(&K, &challenge.salt)?;

        self.key = Some(K);
        self.shared_secret = Some(S);
        self.state = SessionState::KeyAgreed;
        debug!("prover session: key agreed");
        Ok(ClientProof { tag })
    }

    /// Records the verifier's verdict.
    pub fn confirm(&mut self, result: AuthResult) -> Result<(), Error> {
        if self.state != SessionState::KeyAgreed {
            return Err(SrpError::UnexpectedState { state: self.state }.into());
        }
        match result {
            AuthResult::Accepted => {
                self.state = SessionState::Authenticated;
                Ok(())
            }
            AuthResult::Rejected => {
                self.state = SessionState::Rejected;
                Err(SrpError::LoginFailed.into())
            }
        }
    }
}

/// Registers with and logs in to a `Server` over a stream.
pub struct Client<V: Variant> {
    params: SRP,
    identity: Vec<u8>,
    password: Vec<u8>,
    variant: PhantomData<V>,
}

pub type StandardClient = Client<Standard>;
pub type SimplifiedClient = Client<Simplified>;

impl<V: Variant> Client<V> {
    pub fn new(identity: &[u8], password: &[u8], params: SRP) -> Self {
        Client {
            params,
            identity: identity.to_vec(),
            password: password.to_vec(),
            variant: PhantomData,
        }
    }

    /// Sends salt and verifier. The password stays here.
    pub fn register<T: Communicate>(&self, stream: &mut T) -> Result<(), Error> {
        let record = self.params.enroll(&self.password, &mut rand::thread_rng());
        Request::Register.send(stream)?;
        Registration {
            identity: self.identity.clone(),
            record,
        }
        .send(stream)?;
        match AuthResult::receive(stream)? {
            AuthResult::Accepted => Ok(()),
            AuthResult::Rejected => Err(SrpError::IdentityTaken.into()),
        }
    }

    pub fn login<T: Communicate>(&self, stream: &mut T) -> Result<(), Error> {
        let mut session = ProverSession::<V>::new(&self.identity, &self.password, self.params.clone());
        Request::Login.send(stream)?;
        session.hello().send(stream)?;
        let challenge = ServerChallenge::receive(stream, V::EXPLICIT_SCRAMBLER)?;
        session.receive_server_challenge(&challenge)?.send(stream)?;
        session.confirm(AuthResult::receive(stream)?)
    }
}

/// Logs in without knowing the password by sending `A = multiple * N`.
/// Any verifier that skips the `A mod N != 0` check ends up with `S = 0`.
pub struct ZeroKeyClient {
    identity: Vec<u8>,
    A: BigNum,
}

impl ZeroKeyClient {
    pub fn new(identity: &[u8], params: &SRP, multiple: u32) -> Self {
        ZeroKeyClient {
            identity: identity.to_vec(),
            A: params.N() * multiple,
        }
    }

    pub fn login<T: Communicate>(&self, stream: &mut T, explicit_u: bool) -> Result<(), Error> {
        Request::Login.send(stream)?;
        ClientHello {
            identity: self.identity.clone(),
            A: self.A.clone(),
        }
        .send(stream)?;
        let challenge = ServerChallenge::receive(stream, explicit_u)?;
        ClientProof {
            tag: hash_secret(&zero(), &challenge.salt)?,
        }
        .send(stream)?;
        match AuthResult::receive(stream)? {
            AuthResult::Accepted => Ok(()),
            AuthResult::Rejected => Err(SrpError::LoginFailed.into()),
        }
    }
}
