use crate::config::MediaConstraints;
use crate::error::{Result, SignalingError};
use crate::utils::random_id;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

/// Local capture as a set of sample tracks. Whatever produces frames
/// (camera, file, test pattern) feeds them through [`LocalStream::write_sample`].
#[derive(Clone)]
pub struct LocalStream {
    id: String,
    tracks: Vec<Arc<TrackLocalStaticSample>>,
}

impl LocalStream {
    /// Creates one track per requested kind.
    pub fn capture(constraints: MediaConstraints) -> Result<Self> {
        if constraints.is_empty() {
            return Err(SignalingError::MediaUnavailable(
                "no audio or video source configured".into(),
            ));
        }

        let id = format!("paste-rtc-{}", random_id());
        let mut tracks = Vec::new();
        if constraints.video {
            tracks.push(Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_VP8.to_owned(),
                    clock_rate: 90000,
                    ..Default::default()
                },
                "video".to_owned(),
                id.clone(),
            )));
        }
        if constraints.audio {
            tracks.push(Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_OPUS.to_owned(),
                    clock_rate: 48000,
                    channels: 2,
                    ..Default::default()
                },
                "audio".to_owned(),
                id.clone(),
            )));
        }
        info!("Local stream {id} ready with {} track(s)", tracks.len());
        Ok(Self { id, tracks })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Arc<TrackLocalStaticSample>] {
        &self.tracks
    }

    pub fn has_kind(&self, kind: RTPCodecType) -> bool {
        self.tracks.iter().any(|t| t.kind() == kind)
    }

    /// Pushes one encoded frame to the track of `kind`. Frames for a kind
    /// the stream does not carry are ignored.
    pub async fn write_sample(
        &self,
        kind: RTPCodecType,
        data: Bytes,
        duration: Duration,
    ) -> Result<()> {
        let Some(track) = self.tracks.iter().find(|t| t.kind() == kind) else {
            debug!("Dropping {kind:?} sample: stream {} has no such track", self.id);
            return Ok(());
        };
        track
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await
            .map_err(|e| SignalingError::MediaUnavailable(e.to_string()))
    }
}
