use crate::session::{ConnectionState, SessionRole};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignalingError>;

/// Everything an operator action can fail with. None of these is fatal:
/// the session is always left in the state it had before the action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// Pasted text is not a well-formed signaling message.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A session is already negotiating or connected; hang up first.
    #[error("a session is already active (state: {state})")]
    SessionAlreadyActive { state: ConnectionState },

    /// Message arrived out of sequence for the current role/state.
    #[error("unexpected {message} (role: {role}, state: {state})")]
    UnexpectedMessage {
        message: &'static str,
        role: SessionRole,
        state: ConnectionState,
    },

    /// The transport could not produce or accept a session description.
    #[error("negotiation failed: {0}")]
    NegotiationFailed(String),

    /// No local capture source.
    #[error("local media unavailable: {0}")]
    MediaUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for SignalingError {
    fn from(e: serde_json::Error) -> Self {
        SignalingError::MalformedMessage(e.to_string())
    }
}

impl SignalingError {
    pub fn negotiation(e: impl std::fmt::Display) -> Self {
        SignalingError::NegotiationFailed(e.to_string())
    }
}
