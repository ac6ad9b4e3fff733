use super::state::{ConnectionState, SessionRole, SessionToken};
use crate::error::{Result, SignalingError};
use crate::signaling::CandidateRecord;
use std::collections::VecDeque;

/// What happened to an inbound candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateDisposition {
    /// Remote description is in place; hand it to the transport now.
    Apply(CandidateRecord),
    /// Queued until the remote description is applied.
    Buffered,
    /// The peer connection is gone.
    Dropped,
}

/// The single connection a controller owns.
///
/// Holds role, lifecycle state and the transport handle `H`. Candidates that
/// arrive before the remote description are queued here and released in
/// arrival order exactly once, by [`ConnectionSession::remote_description_applied`].
#[derive(Debug)]
pub struct ConnectionSession<H> {
    token: Option<SessionToken>,
    role: SessionRole,
    state: ConnectionState,
    pending: VecDeque<CandidateRecord>,
    remote_description_set: bool,
    handle: Option<H>,
}

impl<H> Default for ConnectionSession<H> {
    fn default() -> Self {
        Self {
            token: None,
            role: SessionRole::Unassigned,
            state: ConnectionState::Idle,
            pending: VecDeque::new(),
            remote_description_set: false,
            handle: None,
        }
    }
}

impl<H> ConnectionSession<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub fn remote_description_set(&self) -> bool {
        self.remote_description_set
    }

    pub fn pending_candidates(&self) -> impl Iterator<Item = &CandidateRecord> {
        self.pending.iter()
    }

    /// True when `token` names the live session; completions from
    /// superseded or closed sessions fail this check.
    pub fn matches(&self, token: &SessionToken) -> bool {
        self.token.as_ref() == Some(token)
    }

    /// True from `begin` until the session is reset or the transport reports
    /// the connection closed, including while the first description is still
    /// being generated.
    pub fn is_live(&self) -> bool {
        self.handle.is_some() && self.state != ConnectionState::Closed
    }

    /// Creates a session with `role`, taking ownership of `handle`.
    ///
    /// Rejected while another session is live. A closed session is replaced
    /// and its handle returned so the caller can release it. Candidates
    /// already buffered stay queued for the new session.
    pub fn begin(
        &mut self,
        token: SessionToken,
        role: SessionRole,
        handle: H,
    ) -> Result<Option<H>> {
        if self.is_live() {
            return Err(SignalingError::SessionAlreadyActive { state: self.state });
        }
        debug_assert_ne!(role, SessionRole::Unassigned);

        let superseded = self.handle.replace(handle);
        self.token = Some(token);
        self.role = role;
        self.state = ConnectionState::Idle;
        self.remote_description_set = false;
        Ok(superseded)
    }

    /// Moves to `next` if the transition is legal for the current role.
    pub fn enter(&mut self, next: ConnectionState) -> Result<()> {
        use ConnectionState::*;
        use SessionRole::*;

        let legal = match (self.role, self.state, next) {
            (Caller, Idle, AwaitingAnswer)
            | (Caller, AwaitingAnswer, Connected)
            | (Callee, Idle, AwaitingLocalAnswer)
            | (Callee, AwaitingLocalAnswer, Connected) => true,
            (_, current, Closed) => self.handle.is_some() && current != Closed,
            _ => false,
        };
        if !legal {
            return Err(SignalingError::UnexpectedMessage {
                message: "state transition",
                role: self.role,
                state: self.state,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Routes an inbound candidate: apply, buffer, or drop.
    pub fn accept_candidate(&mut self, record: CandidateRecord) -> CandidateDisposition {
        if self.state == ConnectionState::Closed {
            return CandidateDisposition::Dropped;
        }
        if self.remote_description_set {
            CandidateDisposition::Apply(record)
        } else {
            self.pending.push_back(record);
            CandidateDisposition::Buffered
        }
    }

    /// Marks the remote description as applied and hands back every buffered
    /// candidate in arrival order. The queue stays empty afterwards.
    pub fn remote_description_applied(&mut self) -> Vec<CandidateRecord> {
        self.remote_description_set = true;
        self.pending.drain(..).collect()
    }

    /// Back to a fresh idle session. Returns the handle to release, if any.
    pub fn reset(&mut self) -> Option<H> {
        std::mem::take(self).handle
    }

    /// Like [`reset`](Self::reset), but candidates still waiting for a remote
    /// description stay queued for the next session.
    pub fn abandon(&mut self) -> Option<H> {
        let pending = std::mem::take(&mut self.pending);
        let handle = self.reset();
        self.pending = pending;
        handle
    }
}
