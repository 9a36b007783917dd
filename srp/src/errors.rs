use crate::algo::SessionState;

// Messages never carry passwords, exponents or derived keys.
#[derive(Debug, Fail, PartialEq)]
pub enum SrpError {
    #[fail(display = "invalid protocol parameters: {}", reason)]
    InvalidParameters { reason: &'static str },

    #[fail(display = "degenerate public value")]
    DegeneratePublicValue,

    #[fail(display = "public value out of range")]
    PublicValueOutOfRange,

    #[fail(display = "unknown identity")]
    UnknownIdentity,

    #[fail(display = "identity already registered")]
    IdentityTaken,

    #[fail(display = "server did not send the scrambling parameter")]
    MissingScrambler,

    #[fail(display = "server sent an unexpected scrambling parameter")]
    UnexpectedScrambler,

    #[fail(display = "operation not allowed in state {:?}", state)]
    UnexpectedState { state: SessionState },

    #[fail(display = "connection closed before {} was received", _0)]
    MissingMessage(&'static str),

    #[fail(display = "malformed {}", _0)]
    MalformedMessage(&'static str),

    #[fail(display = "server rejected login")]
    LoginFailed,

    #[fail(display = "password not found after {} candidates", candidates)]
    DictionaryExhausted { candidates: usize },
}
