//! Session controller: the operator-facing operations.
//!
//! Drives the [`ConnectionSession`] against a [`Transport`] and writes every
//! outbound message to an [`OperatorSurface`]. Runs on a single task: offer
//! and answer generation are futures owned by the controller, and transport
//! callbacks arrive over a channel. Both are stamped with the session token,
//! so anything that resolves after `close()` or after a newer session began
//! is dropped.

use crate::config::RtcSettings;
use crate::error::{Result, SignalingError};
use crate::logger::dump_candidate;
use crate::peer::{analyze_candidates, PeerEvent, PeerEvents, PeerHandle, TaggedEvent, Transport};
use crate::session::{
    CandidateDisposition, ConnectionSession, ConnectionState, SessionRole, SessionToken,
};
use crate::signaling::{
    decode, encode, frame_record, split_batch, CandidateRecord, SessionDescription,
    SignalingMessage, ICE_SEPARATOR,
};
use crate::surface::OperatorSurface;
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What a pasted text turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    Offer,
    Answer,
    Candidates { accepted: usize, rejected: usize },
}

/// A finished offer/answer request.
pub struct Completion {
    token: SessionToken,
    step: Step,
}

enum Step {
    Offer(Result<SessionDescription>),
    Answer(Result<SessionDescription>),
}

impl Step {
    fn label(&self) -> &'static str {
        match self {
            Step::Offer(_) => "offer",
            Step::Answer(_) => "answer",
        }
    }
}

/// Work that arrived while nobody was calling into the controller.
pub enum Background<R> {
    Completion(Completion),
    Peer(TaggedEvent<R>),
}

pub struct SessionController<T: Transport, S> {
    transport: T,
    surface: S,
    settings: RtcSettings,
    session: ConnectionSession<T::Handle>,
    local_media: Option<T::LocalStream>,
    local_candidates: Vec<CandidateRecord>,
    pending: FuturesUnordered<BoxFuture<'static, Completion>>,
    events_tx: mpsc::UnboundedSender<TaggedEvent<T::RemoteStream>>,
    events_rx: mpsc::UnboundedReceiver<TaggedEvent<T::RemoteStream>>,
}

impl<T, S> SessionController<T, S>
where
    T: Transport,
    S: OperatorSurface<T::RemoteStream>,
{
    pub fn new(transport: T, surface: S, settings: RtcSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            surface,
            settings,
            session: ConnectionSession::new(),
            local_media: None,
            local_candidates: Vec::new(),
            pending: FuturesUnordered::new(),
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn role(&self) -> SessionRole {
        self.session.role()
    }

    pub fn session(&self) -> &ConnectionSession<T::Handle> {
        &self.session
    }

    pub fn settings(&self) -> &RtcSettings {
        &self.settings
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn has_local_media(&self) -> bool {
        self.local_media.is_some()
    }

    /// Local candidates gathered by the current session so far.
    pub fn local_candidates(&self) -> &[CandidateRecord] {
        &self.local_candidates
    }

    // ------------------------------------------------------------------
    // operator actions
    // ------------------------------------------------------------------

    /// Starts local capture. Kept across sessions until
    /// [`stop_local_media`](Self::stop_local_media).
    pub async fn acquire_local_media(&mut self) -> Result<()> {
        let result = self.local_stream().await.map(|_| ());
        self.reported(result)
    }

    pub fn stop_local_media(&mut self) {
        if self.local_media.take().is_some() {
            info!("Local media stopped");
        }
    }

    /// Caller side: opens a session and asks the transport for an offer.
    /// The offer is emitted once it resolves (see [`settle`](Self::settle)).
    pub async fn start(&mut self) -> Result<()> {
        let result = self.try_start().await;
        self.reported(result)
    }

    /// Callee side: answers a pasted offer.
    pub async fn receive_offer(&mut self, offer: SessionDescription) -> Result<()> {
        let result = self.try_receive_offer(offer).await;
        self.reported(result)
    }

    /// Caller side: completes the handshake with a pasted answer.
    pub async fn receive_answer(&mut self, answer: SessionDescription) -> Result<()> {
        let result = self.try_receive_answer(answer).await;
        self.reported(result)
    }

    /// Applies a remote candidate now, or queues it until the remote
    /// description is in place.
    pub async fn receive_candidate(&mut self, record: CandidateRecord) {
        dump_candidate("REMOTE", &record);
        match self.session.accept_candidate(record) {
            CandidateDisposition::Apply(record) => {
                if let Some(handle) = self.session.handle().cloned() {
                    apply_candidate(&handle, record).await;
                }
            }
            CandidateDisposition::Buffered => {
                debug!("Remote description not set yet, queuing candidate");
            }
            CandidateDisposition::Dropped => {
                warn!("Peer connection is closed, dropping candidate");
            }
        }
    }

    /// Routes one paste from the inbound fields.
    ///
    /// Text containing the candidate separator is a batch; anything else must
    /// be a single message and is dispatched by its `type`.
    pub async fn ingest_text(&mut self, text: &str) -> Result<Ingested> {
        if text.contains(ICE_SEPARATOR) {
            return Ok(self.ingest_batch(text).await);
        }

        let msg = match decode(text) {
            Ok(msg) => msg,
            Err(e) => return self.reported(Err(e)),
        };
        info!("Received {}...", msg.label());
        match msg {
            SignalingMessage::Offer { sdp } => {
                self.receive_offer(SessionDescription::offer(sdp)).await?;
                Ok(Ingested::Offer)
            }
            SignalingMessage::Answer { sdp } => {
                self.receive_answer(SessionDescription::answer(sdp)).await?;
                Ok(Ingested::Answer)
            }
            SignalingMessage::Candidate(record) => {
                self.receive_candidate(record).await;
                Ok(Ingested::Candidates {
                    accepted: 1,
                    rejected: 0,
                })
            }
        }
    }

    pub async fn hang_up(&mut self) {
        info!("Hang up.");
        self.close().await;
    }

    /// Releases the peer connection and forgets the session. No-op when idle.
    pub async fn close(&mut self) {
        match self.session.reset() {
            Some(handle) => {
                handle.close().await;
                info!("Session closed");
            }
            None => debug!("close: no session"),
        }
        self.local_candidates.clear();
    }

    // ------------------------------------------------------------------
    // background work
    // ------------------------------------------------------------------

    /// Waits for the next completion or transport event. Cancel safe, so it
    /// can sit in a `select!` next to operator input.
    pub async fn next_background(&mut self) -> Background<T::RemoteStream> {
        tokio::select! {
            Some(done) = self.pending.next(), if !self.pending.is_empty() => Background::Completion(done),
            Some(event) = self.events_rx.recv() => Background::Peer(event),
            else => std::future::pending().await,
        }
    }

    pub async fn handle_background(&mut self, work: Background<T::RemoteStream>) {
        match work {
            Background::Completion(done) => self.complete(done).await,
            Background::Peer(event) => self.dispatch(event),
        }
    }

    /// Runs every outstanding offer/answer request to completion and drains
    /// the transport events queued so far.
    pub async fn settle(&mut self) {
        loop {
            if let Some(done) = self.pending.next().await {
                self.complete(done).await;
                continue;
            }
            match self.events_rx.try_recv() {
                Ok(event) => self.dispatch(event),
                Err(_) => break,
            }
        }
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    async fn try_start(&mut self) -> Result<()> {
        self.ensure_no_active_session()?;
        let media = self.local_stream().await?;
        let (token, peer) = self.open_session(SessionRole::Caller, Some(media)).await?;

        info!("Caller session {token}: creating offer...");
        self.pending.push(Box::pin(async move {
            let result = async {
                let offer = peer.create_offer().await?;
                peer.set_local_description(offer.clone()).await?;
                Ok::<_, SignalingError>(offer)
            }
            .await;
            Completion {
                token,
                step: Step::Offer(result),
            }
        }));
        Ok(())
    }

    async fn try_receive_offer(&mut self, offer: SessionDescription) -> Result<()> {
        self.ensure_no_active_session()?;
        if self.local_media.is_none() {
            info!("No local media running, answering receive-only");
        }
        let media = self.local_media.clone();
        let (token, peer) = self.open_session(SessionRole::Callee, media).await?;
        self.session.enter(ConnectionState::AwaitingLocalAnswer)?;

        if let Err(e) = peer.set_remote_description(offer).await {
            self.abort_session().await;
            return Err(e);
        }
        self.flush_buffered(&peer).await;

        info!("Callee session {token}: creating answer...");
        self.pending.push(Box::pin(async move {
            let result = async {
                let answer = peer.create_answer().await?;
                peer.set_local_description(answer.clone()).await?;
                Ok::<_, SignalingError>(answer)
            }
            .await;
            Completion {
                token,
                step: Step::Answer(result),
            }
        }));
        Ok(())
    }

    async fn try_receive_answer(&mut self, answer: SessionDescription) -> Result<()> {
        let unexpected = SignalingError::UnexpectedMessage {
            message: "answer",
            role: self.session.role(),
            state: self.session.state(),
        };
        if self.session.role() != SessionRole::Caller
            || self.session.state() != ConnectionState::AwaitingAnswer
        {
            return Err(unexpected);
        }
        let Some(peer) = self.session.handle().cloned() else {
            return Err(unexpected);
        };

        // a rejected answer leaves us waiting for a better one
        peer.set_remote_description(answer).await?;
        self.flush_buffered(&peer).await;
        self.session.enter(ConnectionState::Connected)?;
        info!("Answer applied, session connected");
        Ok(())
    }

    async fn ingest_batch(&mut self, text: &str) -> Ingested {
        let mut accepted = 0;
        let mut rejected = 0;

        for record in split_batch(text, ICE_SEPARATOR) {
            match decode(record) {
                Ok(SignalingMessage::Candidate(candidate)) => {
                    self.receive_candidate(candidate).await;
                    accepted += 1;
                }
                Ok(other) => {
                    let e = SignalingError::MalformedMessage(format!(
                        "expected a candidate in the batch, found an {}",
                        other.label()
                    ));
                    let _ = self.reported::<()>(Err(e));
                    rejected += 1;
                }
                Err(e) => {
                    let _ = self.reported::<()>(Err(e));
                    rejected += 1;
                }
            }
        }
        debug!("Candidate batch: {accepted} accepted, {rejected} rejected");
        Ingested::Candidates { accepted, rejected }
    }

    fn ensure_no_active_session(&self) -> Result<()> {
        if self.session.is_live() {
            return Err(SignalingError::SessionAlreadyActive {
                state: self.session.state(),
            });
        }
        Ok(())
    }

    async fn local_stream(&mut self) -> Result<T::LocalStream> {
        if let Some(media) = &self.local_media {
            return Ok(media.clone());
        }
        let media = self.transport.acquire_local_media().await?;
        info!("Local media acquired");
        self.local_media = Some(media.clone());
        Ok(media)
    }

    /// Builds a handle and installs it as the current session.
    async fn open_session(
        &mut self,
        role: SessionRole,
        local: Option<T::LocalStream>,
    ) -> Result<(SessionToken, T::Handle)> {
        let token = SessionToken::generate();
        let events = PeerEvents::new(token.clone(), self.events_tx.clone());
        let peer = self
            .transport
            .create_peer_handle(&self.settings, local, events)
            .await?;

        match self.session.begin(token.clone(), role, peer.clone()) {
            Ok(superseded) => {
                if let Some(old) = superseded {
                    debug!("Releasing closed peer connection");
                    old.close().await;
                }
            }
            Err(e) => {
                peer.close().await;
                return Err(e);
            }
        }
        self.local_candidates.clear();
        Ok((token, peer))
    }

    async fn flush_buffered(&mut self, peer: &T::Handle) {
        let buffered = self.session.remote_description_applied();
        if !buffered.is_empty() {
            info!("Applying {} buffered candidate(s)", buffered.len());
        }
        for record in buffered {
            apply_candidate(peer, record).await;
        }
    }

    /// Tears down a session whose negotiation failed. Remote candidates that
    /// never reached the transport are kept for the next attempt.
    async fn abort_session(&mut self) {
        if let Some(handle) = self.session.abandon() {
            handle.close().await;
        }
        self.local_candidates.clear();
    }

    async fn complete(&mut self, done: Completion) {
        if !self.session.matches(&done.token) {
            debug!(
                "Discarding {} from stale session {}",
                done.step.label(),
                done.token
            );
            return;
        }

        let (next, result) = match done.step {
            Step::Offer(result) => (ConnectionState::AwaitingAnswer, result),
            Step::Answer(result) => (ConnectionState::Connected, result),
        };
        match result {
            Ok(desc) => {
                if let Err(e) = self.session.enter(next) {
                    let _ = self.reported::<()>(Err(e));
                    return;
                }
                self.send_description(desc);
            }
            Err(e) => {
                warn!("Create description failed: {e}");
                self.abort_session().await;
                let e = match e {
                    SignalingError::NegotiationFailed(_) => e,
                    other => SignalingError::negotiation(other),
                };
                let _ = self.reported::<()>(Err(e));
            }
        }
    }

    fn dispatch(&mut self, tagged: TaggedEvent<T::RemoteStream>) {
        if !self.session.matches(&tagged.token) {
            debug!("Ignoring event from stale session {}", tagged.token);
            return;
        }

        match tagged.event {
            PeerEvent::LocalCandidate(record) => {
                let text = encode(&SignalingMessage::Candidate(record.clone()));
                debug!("---sending candidate text --- {text}");
                self.surface.append_candidate(&frame_record(&text));
                self.local_candidates.push(record);
            }
            PeerEvent::CandidatesComplete => {
                info!("End of candidates.");
                analyze_candidates(&self.local_candidates);
            }
            PeerEvent::RemoteStreamAvailable(stream) => {
                info!("Added remote stream");
                self.surface.remote_stream_added(stream);
            }
            PeerEvent::RemoteStreamRemoved => {
                info!("Remove remote stream");
                self.surface.remote_stream_removed();
            }
            PeerEvent::ConnectionClosed => match self.session.enter(ConnectionState::Closed) {
                Ok(()) => warn!("Peer connection closed; hang up to start a new call"),
                Err(_) => debug!("Connection close reported twice"),
            },
        }
    }

    fn send_description(&mut self, desc: SessionDescription) {
        let text = encode(&desc.into());
        debug!("---sending sdp text --- {text}");
        self.surface.show_description(&text);
    }

    fn reported<V>(&mut self, result: Result<V>) -> Result<V> {
        if let Err(e) = &result {
            warn!("{e}");
            self.surface.report(e);
        }
        result
    }
}

async fn apply_candidate<H: PeerHandle>(peer: &H, record: CandidateRecord) {
    if let Err(e) = peer.add_candidate(record).await {
        warn!("Failed to add candidate: {e}");
    }
}
