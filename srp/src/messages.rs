//! Wire messages. Every field travels in its own frame, in the order below;
//! integers are unsigned big-endian.
//!
//! | Msg | Direction         | Fields                         |
//! |-----|-------------------|--------------------------------|
//! | 1   | prover → verifier | identity, A                    |
//! | 2   | verifier → prover | salt, B (, u for `Simplified`) |
//! | 3   | prover → verifier | tag                            |
//!
//! Each connection opens with a one-byte `Request` and login ends with a
//! one-byte `AuthResult`.

use failure::Error;

use crate::algo::{deserialize, serialize, AuthResult, BigNum, UserRecord};
use crate::communication::Communicate;
use crate::errors::SrpError;

fn expect_frame<T: Communicate>(stream: &mut T, what: &'static str) -> Result<Vec<u8>, Error> {
    stream
        .receive()?
        .ok_or_else(|| SrpError::MissingMessage(what).into())
}

fn expect_byte<T: Communicate>(stream: &mut T, what: &'static str) -> Result<u8, Error> {
    match expect_frame(stream, what)?.as_slice() {
        [byte] => Ok(*byte),
        _ => Err(SrpError::MalformedMessage(what).into()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Register = 0,
    Login = 1,
}

impl Request {
    pub fn send<T: Communicate>(self, stream: &mut T) -> Result<(), Error> {
        stream.send(&[self as u8])
    }

    pub fn receive<T: Communicate>(stream: &mut T) -> Result<Self, Error> {
        match expect_byte(stream, "request")? {
            0 => Ok(Request::Register),
            1 => Ok(Request::Login),
            _ => Err(SrpError::MalformedMessage("request").into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    pub identity: Vec<u8>,
    pub A: BigNum,
}

impl ClientHello {
    pub fn send<T: Communicate>(&self, stream: &mut T) -> Result<(), Error> {
        stream.send(&self.identity)?;
        stream.send(&serialize(&self.A))
    }

    pub fn receive<T: Communicate>(stream: &mut T) -> Result<Self, Error> {
        let identity = expect_frame(stream, "identity")?;
        let A = deserialize(&expect_frame(stream, "A")?);
        Ok(ClientHello { identity, A })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerChallenge {
    pub salt: Vec<u8>,
    pub B: BigNum,
    pub u: Option<BigNum>,
}

impl ServerChallenge {
    pub fn send<T: Communicate>(&self, stream: &mut T) -> Result<(), Error> {
        stream.send(&self.salt)?;
        stream.send(&serialize(&self.B))?;
        if let Some(u) = &self.u {
            stream.send(&serialize(u))?;
        }
        Ok(())
    }

    /// `explicit_u` selects the three-field layout of the simplified protocol.
    pub fn receive<T: Communicate>(stream: &mut T, explicit_u: bool) -> Result<Self, Error> {
        let salt = expect_frame(stream, "salt")?;
        let B = deserialize(&expect_frame(stream, "B")?);
        let u = if explicit_u {
            Some(deserialize(&expect_frame(stream, "u")?))
        } else {
            None
        };
        Ok(ServerChallenge { salt, B, u })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientProof {
    pub tag: Vec<u8>,
}

impl ClientProof {
    pub fn send<T: Communicate>(&self, stream: &mut T) -> Result<(), Error> {
        stream.send(&self.tag)
    }

    pub fn receive<T: Communicate>(stream: &mut T) -> Result<Self, Error> {
        Ok(ClientProof {
            tag: expect_frame(stream, "tag")?,
        })
    }
}

/// Enrollment: the prover hands over salt and verifier, never the password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub identity: Vec<u8>,
    pub record: UserRecord,
}

impl Registration {
    pub fn send<T: Communicate>(&self, stream: &mut T) -> Result<(), Error> {
        stream.send(&self.identity)?;
        stream.send(&self.record.salt)?;
        stream.send(&serialize(&self.record.verifier))
    }

    pub fn receive<T: Communicate>(stream: &mut T) -> Result<Self, Error> {
        let identity = expect_frame(stream, "identity")?;
        let salt = expect_frame(stream, "salt")?;
        let verifier = deserialize(&expect_frame(stream, "verifier")?);
        Ok(Registration {
            identity,
            record: UserRecord { salt, verifier },
        })
    }
}

impl AuthResult {
    pub fn send<T: Communicate>(self, stream: &mut T) -> Result<(), Error> {
        stream.send(&[self.to_byte()])
    }

    pub fn receive<T: Communicate>(stream: &mut T) -> Result<Self, Error> {
        let byte = expect_byte(stream, "login result")?;
        AuthResult::from_byte(byte).ok_or_else(|| SrpError::MalformedMessage("login result").into())
    }
}
