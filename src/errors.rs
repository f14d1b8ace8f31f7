//! Adapter error hierarchy.
//!
//! Categorizes every failure a caller can observe synchronously. Note that a
//! request whose submission succeeded and whose completion carries a non-ok
//! service code is *not* an `Error`: the code travels inside the operation's
//! typed reply and the caller inspects it there. `Error` covers the paths
//! where no (or no well-formed) completion is delivered.

use crate::constants::Code;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request rejected before any asynchronous work began.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// The engine refused the submission synchronously.
    #[error("submission rejected by engine: {}", .0.message())]
    Submit(Code),

    /// Establishing the engine session failed at construction time.
    #[error("session construction failed: {}", .0.message())]
    Connect(Code),

    /// `wait_connected` exceeded its deadline.
    #[error("timed out waiting for connected state")]
    WaitTimeout,

    /// The session was closed while the call was outstanding, or the
    /// operation was issued against a closed handle.
    #[error("session closed")]
    SessionClosed,

    /// A completion arrived with a payload shape the operation cannot
    /// decode. Adapter invariant violation, fatal to that one call.
    #[error("unexpected reply payload for {op}")]
    UnexpectedReply { op: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum PreconditionError {
    /// The connection is not in the connected state.
    #[error("session not connected")]
    NotConnected,

    /// Malformed node path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Any other malformed argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Engine status code associated with this error, if one exists.
    pub fn code(&self) -> Option<Code> {
        match self {
            Error::Submit(code) | Error::Connect(code) => Some(*code),
            Error::Precondition(PreconditionError::NotConnected) => Some(Code::InvalidState),
            Error::Precondition(_) => Some(Code::BadArguments),
            Error::SessionClosed => Some(Code::Closing),
            Error::WaitTimeout | Error::UnexpectedReply { .. } => None,
        }
    }
}
