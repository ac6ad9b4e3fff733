use crate::error::{Result, SignalingError};
use serde::{Deserialize, Serialize};

/// One message of the copy-paste handshake.
///
/// Serialized as the JSON a browser produces for `RTCSessionDescription`
/// (`{"type":"offer","sdp":"..."}`) and for trickled ICE candidates
/// (`{"type":"candidate","sdpMLineIndex":0,"sdpMid":"0","candidate":"..."}`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalingMessage {
    Offer { sdp: String },
    Answer { sdp: String },
    Candidate(CandidateRecord),
}

/// ICE candidate as it travels between the two operators
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
    #[serde(rename = "sdpMid")]
    pub sdp_mid: Option<String>,
    pub candidate: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Session description handed to / received from the transport.
/// The `sdp` body is opaque here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

impl From<SessionDescription> for SignalingMessage {
    fn from(desc: SessionDescription) -> Self {
        match desc.kind {
            SdpKind::Offer => SignalingMessage::Offer { sdp: desc.sdp },
            SdpKind::Answer => SignalingMessage::Answer { sdp: desc.sdp },
        }
    }
}

impl From<CandidateRecord> for SignalingMessage {
    fn from(rec: CandidateRecord) -> Self {
        SignalingMessage::Candidate(rec)
    }
}

impl SignalingMessage {
    /// Name used in logs and sequencing errors.
    pub fn label(&self) -> &'static str {
        match self {
            SignalingMessage::Offer { .. } => "offer",
            SignalingMessage::Answer { .. } => "answer",
            SignalingMessage::Candidate(_) => "candidate",
        }
    }

    fn validate(self) -> Result<Self> {
        let (field, value) = match &self {
            SignalingMessage::Offer { sdp } | SignalingMessage::Answer { sdp } => ("sdp", sdp),
            SignalingMessage::Candidate(rec) => ("candidate", &rec.candidate),
        };
        if value.trim().is_empty() {
            return Err(SignalingError::MalformedMessage(format!(
                "{} has an empty `{field}`",
                self.label()
            )));
        }
        Ok(self)
    }
}

pub fn encode(msg: &SignalingMessage) -> String {
    // a derived Serialize over Strings and Options cannot fail
    serde_json::to_string(msg).unwrap_or_default()
}

pub fn decode(text: &str) -> Result<SignalingMessage> {
    let msg: SignalingMessage = serde_json::from_str(text.trim())?;
    msg.validate()
}
