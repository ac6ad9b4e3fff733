use crate::utils::random_id;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionRole {
    #[default]
    Unassigned,
    /// Pressed start and sent the offer
    Caller,
    /// Answered a pasted offer
    Callee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    AwaitingAnswer,
    AwaitingLocalAnswer,
    Connected,
    Closed,
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionRole::Unassigned => "unassigned",
            SessionRole::Caller => "caller",
            SessionRole::Callee => "callee",
        })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Idle => "idle",
            ConnectionState::AwaitingAnswer => "awaiting-answer",
            ConnectionState::AwaitingLocalAnswer => "awaiting-local-answer",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        })
    }
}

/// Identity of one session. Completions and transport events carry the
/// token of the session that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        SessionToken(random_id())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
