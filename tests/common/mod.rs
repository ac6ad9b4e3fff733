#![allow(dead_code)]

use async_trait::async_trait;
use paste_rtc_lib::signaling::SdpKind;
use paste_rtc_lib::{
    CandidateRecord, PeerEvent, PeerEvents, PeerHandle, Result, RtcSettings, SessionController,
    SessionDescription, SignalingError, TextFields, Transport,
};
use std::sync::{Arc, Mutex, MutexGuard};

pub const MOCK_OFFER: &str = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\ns=mock offer\r\n";
pub const MOCK_ANSWER: &str = "v=0\r\no=- 2 1 IN IP4 127.0.0.1\r\ns=mock answer\r\n";

/// What the controller asked of the transport, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreatePeer { with_media: bool },
    CreateOffer,
    CreateAnswer,
    SetLocal(SdpKind),
    SetRemote(SdpKind),
    AddCandidate(String),
    Close,
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    sinks: Vec<PeerEvents<String>>,
    no_media: bool,
    fail_offer: bool,
    fail_answer: bool,
    fail_remote: bool,
}

/// Shared between the test and the mock: records calls and decides failures.
#[derive(Clone, Default)]
pub struct Script {
    inner: Arc<Mutex<Inner>>,
}

impl Script {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls made after the first `SetRemote`.
    pub fn calls_after_set_remote(&self) -> Vec<Call> {
        let calls = self.calls();
        let start = calls
            .iter()
            .position(|c| matches!(c, Call::SetRemote(_)))
            .expect("no set_remote_description call");
        calls[start + 1..].to_vec()
    }

    pub fn added_candidates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::AddCandidate(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    /// Event sink handed to the `n`th peer handle.
    pub fn sink(&self, n: usize) -> PeerEvents<String> {
        self.lock().sinks[n].clone()
    }

    pub fn emit(&self, n: usize, event: PeerEvent<String>) {
        self.sink(n).emit(event);
    }

    pub fn without_media(&self) {
        self.lock().no_media = true;
    }

    pub fn fail_offer(&self) {
        self.lock().fail_offer = true;
    }

    pub fn fail_answer(&self) {
        self.lock().fail_answer = true;
    }

    pub fn fail_remote(&self, fail: bool) {
        self.lock().fail_remote = fail;
    }
}

pub struct MockTransport {
    script: Script,
}

#[derive(Clone)]
pub struct MockPeer {
    script: Script,
}

#[async_trait]
impl Transport for MockTransport {
    type LocalStream = String;
    type RemoteStream = String;
    type Handle = MockPeer;

    async fn acquire_local_media(&mut self) -> Result<String> {
        if self.script.lock().no_media {
            return Err(SignalingError::MediaUnavailable("no camera".into()));
        }
        Ok("camera".into())
    }

    async fn create_peer_handle(
        &mut self,
        _settings: &RtcSettings,
        local: Option<String>,
        events: PeerEvents<String>,
    ) -> Result<MockPeer> {
        let mut inner = self.script.lock();
        inner.calls.push(Call::CreatePeer {
            with_media: local.is_some(),
        });
        inner.sinks.push(events);
        Ok(MockPeer {
            script: self.script.clone(),
        })
    }
}

#[async_trait]
impl PeerHandle for MockPeer {
    async fn create_offer(&self) -> Result<SessionDescription> {
        self.script.record(Call::CreateOffer);
        if self.script.lock().fail_offer {
            return Err(SignalingError::NegotiationFailed("no codecs".into()));
        }
        Ok(SessionDescription::offer(MOCK_OFFER))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.script.record(Call::CreateAnswer);
        if self.script.lock().fail_answer {
            return Err(SignalingError::NegotiationFailed("no common codecs".into()));
        }
        Ok(SessionDescription::answer(MOCK_ANSWER))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.script.record(Call::SetLocal(desc.kind));
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.script.record(Call::SetRemote(desc.kind));
        if self.script.lock().fail_remote {
            return Err(SignalingError::NegotiationFailed("bad fingerprint".into()));
        }
        Ok(())
    }

    async fn add_candidate(&self, record: CandidateRecord) -> Result<()> {
        self.script.record(Call::AddCandidate(record.candidate));
        Ok(())
    }

    async fn close(&self) {
        self.script.record(Call::Close);
    }
}

pub type Controller = SessionController<MockTransport, TextFields>;

pub fn controller() -> (Controller, Script) {
    let script = Script::default();
    let transport = MockTransport {
        script: script.clone(),
    };
    let controller = SessionController::new(transport, TextFields::new(), RtcSettings::default());
    (controller, script)
}

pub fn candidate(n: u16) -> CandidateRecord {
    CandidateRecord {
        sdp_mline_index: Some(0),
        sdp_mid: Some("0".into()),
        candidate: format!("candidate:{n} 1 udp 2130706431 192.168.1.{n} 5000{n} typ host"),
    }
}

pub fn candidate_json(n: u16) -> String {
    paste_rtc_lib::signaling::encode(&candidate(n).into())
}

pub fn offer_json() -> String {
    paste_rtc_lib::signaling::encode(&SessionDescription::offer(MOCK_OFFER).into())
}

pub fn answer_json() -> String {
    paste_rtc_lib::signaling::encode(&SessionDescription::answer(MOCK_ANSWER).into())
}
