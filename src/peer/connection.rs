use super::media::LocalStream;
use super::{PeerEvent, PeerEvents, PeerHandle, Transport};
use crate::config::{MediaConstraints, RtcSettings, ServerConfig};
use crate::error::{Result, SignalingError};
use crate::logger::dump_candidate;
use crate::signaling::{CandidateRecord, SdpKind, SessionDescription};
use crate::utils::add_ice_url_scheme;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Transport backed by webrtc-rs.
pub struct WebRtcTransport {
    capture: MediaConstraints,
}

impl WebRtcTransport {
    pub fn new(settings: &RtcSettings) -> Self {
        Self {
            capture: settings.capture,
        }
    }
}

/// Handle to one `RTCPeerConnection`
#[derive(Clone)]
pub struct WebRtcPeer {
    pc: Arc<RTCPeerConnection>,
}

#[async_trait]
impl Transport for WebRtcTransport {
    type LocalStream = LocalStream;
    type RemoteStream = Arc<TrackRemote>;
    type Handle = WebRtcPeer;

    async fn acquire_local_media(&mut self) -> Result<LocalStream> {
        LocalStream::capture(self.capture)
    }

    async fn create_peer_handle(
        &mut self,
        settings: &RtcSettings,
        local: Option<LocalStream>,
        events: PeerEvents<Arc<TrackRemote>>,
    ) -> Result<WebRtcPeer> {
        settings.validate()?;
        let api = build_api()?;
        let pc = Arc::new(
            api.new_peer_connection(rtc_config(settings))
                .await
                .map_err(SignalingError::negotiation)?,
        );
        info!("Peer connection created for session {}", events.token());

        // local candidates go straight to the controller
        let ev = events.clone();
        pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
            let ev = ev.clone();
            Box::pin(async move {
                match cand {
                    Some(c) => match c.to_json() {
                        Ok(init) => {
                            let record = CandidateRecord::from(init);
                            dump_candidate("LOCAL", &record);
                            ev.emit(PeerEvent::LocalCandidate(record));
                        }
                        Err(e) => warn!("Failed to serialize local candidate: {e}"),
                    },
                    None => {
                        debug!("ICE candidate gathering completed (null candidate received)");
                        ev.emit(PeerEvent::CandidatesComplete);
                    }
                }
            })
        }));

        pc.on_ice_gathering_state_change(Box::new(move |state| {
            debug!("ICE gathering state changed to: {:?}", state);
            Box::pin(async {})
        }));

        let remote_seen = Arc::new(AtomicBool::new(false));

        let ev = events.clone();
        let seen = remote_seen.clone();
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                info!("Added remote {:?} track {}", track.kind(), track.id());
                seen.store(true, Ordering::SeqCst);
                ev.emit(PeerEvent::RemoteStreamAvailable(track));
                Box::pin(async {})
            },
        ));

        let ev = events.clone();
        let seen = remote_seen;
        pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
            info!("Peer connection state changed to: {:?}", st);
            match st {
                RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed => {
                    if seen.swap(false, Ordering::SeqCst) {
                        info!("Remove remote stream");
                        ev.emit(PeerEvent::RemoteStreamRemoved);
                    }
                    ev.emit(PeerEvent::ConnectionClosed);
                }
                RTCPeerConnectionState::Disconnected => {
                    warn!("Peer connection disconnected, waiting for ICE to recover");
                }
                _ => {}
            }
            Box::pin(async {})
        }));

        if let Some(stream) = &local {
            debug!("Adding local stream {}...", stream.id());
            for track in stream.tracks() {
                let sender = pc
                    .add_track(Arc::clone(track) as Arc<dyn TrackLocal + Send + Sync>)
                    .await
                    .map_err(SignalingError::negotiation)?;
                // RTCP has to be drained for the interceptors to work
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 1500];
                    while sender.read(&mut buf).await.is_ok() {}
                });
            }
        }

        for (wanted, kind) in [
            (settings.receive.audio, RTPCodecType::Audio),
            (settings.receive.video, RTPCodecType::Video),
        ] {
            let sending = local.as_ref().is_some_and(|s| s.has_kind(kind));
            if wanted && !sending {
                pc.add_transceiver_from_kind(
                    kind,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await
                .map_err(SignalingError::negotiation)?;
            }
        }

        Ok(WebRtcPeer { pc })
    }
}

#[async_trait]
impl PeerHandle for WebRtcPeer {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(SignalingError::negotiation)?;
        from_rtc(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(SignalingError::negotiation)?;
        from_rtc(answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.pc
            .set_local_description(to_rtc(desc)?)
            .await
            .map_err(SignalingError::negotiation)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.pc
            .set_remote_description(to_rtc(desc)?)
            .await
            .map_err(SignalingError::negotiation)
    }

    async fn add_candidate(&self, record: CandidateRecord) -> Result<()> {
        self.pc
            .add_ice_candidate(record.into())
            .await
            .map_err(SignalingError::negotiation)
    }

    async fn close(&self) {
        if let Err(e) = self.pc.close().await {
            warn!("Failed to close peer connection: {e}");
        }
    }
}

fn build_api() -> Result<API> {
    let mut media = MediaEngine::default();
    media
        .register_default_codecs()
        .map_err(SignalingError::negotiation)?;
    let registry = register_default_interceptors(Registry::new(), &mut media)
        .map_err(SignalingError::negotiation)?;

    Ok(APIBuilder::new()
        .with_media_engine(media)
        .with_interceptor_registry(registry)
        .build())
}

/// Peer connection configuration
fn rtc_config(settings: &RtcSettings) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: get_user_ice_servers(&settings.ice_servers),
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}

pub fn get_user_ice_servers(servers: &[ServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|config| RTCIceServer {
            urls: vec![add_ice_url_scheme(config)],
            username: config.username.clone().unwrap_or_default(),
            credential: config.credential.clone().unwrap_or_default(),
        })
        .collect()
}

fn from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription> {
    match desc.sdp_type {
        RTCSdpType::Offer => Ok(SessionDescription::offer(desc.sdp)),
        RTCSdpType::Answer => Ok(SessionDescription::answer(desc.sdp)),
        other => Err(SignalingError::NegotiationFailed(format!(
            "unexpected description type {other:?}"
        ))),
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let parsed = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp),
    };
    parsed.map_err(SignalingError::negotiation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RtcSettings;
    use crate::peer::TaggedEvent;
    use crate::session::SessionToken;
    use tokio::sync::mpsc;

    #[test]
    fn ice_servers_get_schemes_and_empty_credentials() {
        let servers = get_user_ice_servers(&[ServerConfig {
            id: "lan".into(),
            r#type: "stun".into(),
            url: "192.168.1.1:3478".into(),
            username: None,
            credential: None,
        }]);
        assert_eq!(servers[0].urls, vec!["stun:192.168.1.1:3478".to_string()]);
        assert!(servers[0].username.is_empty());
    }

    #[test]
    fn garbage_sdp_is_a_negotiation_failure() {
        let err = to_rtc(SessionDescription::offer("not an sdp")).unwrap_err();
        assert!(matches!(err, SignalingError::NegotiationFailed(_)));
    }

    #[tokio::test]
    async fn offer_from_one_peer_is_answered_by_another() {
        let settings = RtcSettings::default();
        let (tx, _rx) = mpsc::unbounded_channel::<TaggedEvent<Arc<TrackRemote>>>();
        let mut transport = WebRtcTransport::new(&settings);

        let media = transport.acquire_local_media().await.unwrap();
        let caller = transport
            .create_peer_handle(
                &settings,
                Some(media),
                PeerEvents::new(SessionToken::generate(), tx.clone()),
            )
            .await
            .unwrap();
        let callee = transport
            .create_peer_handle(&settings, None, PeerEvents::new(SessionToken::generate(), tx))
            .await
            .unwrap();

        let offer = caller.create_offer().await.unwrap();
        assert_eq!(offer.kind, SdpKind::Offer);
        assert!(offer.sdp.contains("m=video"));
        caller.set_local_description(offer.clone()).await.unwrap();

        callee.set_remote_description(offer).await.unwrap();
        let answer = callee.create_answer().await.unwrap();
        assert_eq!(answer.kind, SdpKind::Answer);
        callee.set_local_description(answer.clone()).await.unwrap();
        caller.set_remote_description(answer).await.unwrap();

        caller.close().await;
        callee.close().await;
    }
}
