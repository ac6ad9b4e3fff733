//! The transport side of a call: local media, the peer connection handle and
//! the events it raises. The controller only talks to these traits;
//! [`WebRtcTransport`] is the webrtc-rs implementation.

pub mod connection;
pub mod ice;
pub mod media;

pub use connection::{WebRtcPeer, WebRtcTransport};
pub use ice::{analyze_candidates, CandidateSummary};
pub use media::LocalStream;

use crate::config::RtcSettings;
use crate::error::Result;
use crate::session::SessionToken;
use crate::signaling::{CandidateRecord, SessionDescription};
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

/// Something the peer connection reports on its own schedule.
#[derive(Debug)]
pub enum PeerEvent<R> {
    LocalCandidate(CandidateRecord),
    /// End-of-candidates signal
    CandidatesComplete,
    RemoteStreamAvailable(R),
    RemoteStreamRemoved,
    /// Connection failed or was closed by the other side
    ConnectionClosed,
}

/// Peer event stamped with the session that owns the handle.
#[derive(Debug)]
pub struct TaggedEvent<R> {
    pub token: SessionToken,
    pub event: PeerEvent<R>,
}

/// Sender given to a handle at creation time; every event it forwards is
/// tagged with the session token.
pub struct PeerEvents<R> {
    token: SessionToken,
    tx: UnboundedSender<TaggedEvent<R>>,
}

impl<R> Clone for PeerEvents<R> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<R> PeerEvents<R> {
    pub fn new(token: SessionToken, tx: UnboundedSender<TaggedEvent<R>>) -> Self {
        Self { token, tx }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Forwards `event`. A controller that has gone away is not an error.
    pub fn emit(&self, event: PeerEvent<R>) {
        let _ = self.tx.send(TaggedEvent {
            token: self.token.clone(),
            event,
        });
    }
}

/// Media and peer-connection factory.
#[async_trait]
pub trait Transport: Send {
    type LocalStream: Clone + Send + Sync + 'static;
    type RemoteStream: Send + 'static;
    type Handle: PeerHandle;

    /// Fails with `MediaUnavailable` when there is nothing to capture.
    async fn acquire_local_media(&mut self) -> Result<Self::LocalStream>;

    /// Builds a peer connection. `local` is `None` for a receive-only peer.
    async fn create_peer_handle(
        &mut self,
        settings: &RtcSettings,
        local: Option<Self::LocalStream>,
        events: PeerEvents<Self::RemoteStream>,
    ) -> Result<Self::Handle>;
}

/// One peer connection.
#[async_trait]
pub trait PeerHandle: Clone + Send + Sync + 'static {
    async fn create_offer(&self) -> Result<SessionDescription>;
    async fn create_answer(&self) -> Result<SessionDescription>;
    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;
    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;
    async fn add_candidate(&self, record: CandidateRecord) -> Result<()>;
    async fn close(&self);
}
