use crate::signaling::CandidateRecord;
use tracing::{info, warn};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;

impl From<RTCIceCandidateInit> for CandidateRecord {
    fn from(init: RTCIceCandidateInit) -> Self {
        CandidateRecord {
            candidate: init.candidate,
            sdp_mid: init.sdp_mid,
            sdp_mline_index: init.sdp_mline_index,
        }
    }
}

impl From<CandidateRecord> for RTCIceCandidateInit {
    fn from(rec: CandidateRecord) -> Self {
        RTCIceCandidateInit {
            candidate: rec.candidate,
            sdp_mid: rec.sdp_mid,
            sdp_mline_index: rec.sdp_mline_index,
            username_fragment: None,
        }
    }
}

/// Candidate counts by type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateSummary {
    pub host: usize,
    pub srflx: usize,
    pub relay: usize,
}

impl CandidateSummary {
    pub fn total(&self) -> usize {
        self.host + self.srflx + self.relay
    }
}

pub fn analyze_candidates(candidates: &[CandidateRecord]) -> CandidateSummary {
    let mut summary = CandidateSummary::default();

    for candidate in candidates {
        if candidate.candidate.contains("typ host") {
            summary.host += 1;
        } else if candidate.candidate.contains("typ srflx") {
            summary.srflx += 1;
        } else if candidate.candidate.contains("typ relay") {
            summary.relay += 1;
        }
    }

    info!(
        "Candidate analysis: {} host, {} srflx, {} relay",
        summary.host, summary.srflx, summary.relay
    );

    if summary.total() == 0 {
        warn!("No usable ICE candidates gathered; the other side will not reach us");
    } else if summary.srflx + summary.relay == 0 {
        info!("Only host candidates: the call works on the local network only");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(line: &str) -> CandidateRecord {
        CandidateRecord {
            sdp_mline_index: Some(0),
            sdp_mid: Some("0".into()),
            candidate: line.into(),
        }
    }

    #[test]
    fn counts_by_type() {
        let summary = analyze_candidates(&[
            cand("candidate:1 1 udp 2130706431 192.168.1.2 50000 typ host"),
            cand("candidate:2 1 udp 1694498815 203.0.113.9 50001 typ srflx raddr 0.0.0.0 rport 0"),
            cand("candidate:3 1 udp 16777215 198.51.100.1 3478 typ relay raddr 0.0.0.0 rport 0"),
            cand("candidate:4 1 tcp 1518280447 192.168.1.2 9 typ host tcptype active"),
        ]);
        assert_eq!(
            summary,
            CandidateSummary {
                host: 2,
                srflx: 1,
                relay: 1
            }
        );
    }

    #[test]
    fn converts_to_webrtc_init_without_ufrag() {
        let rec = cand("candidate:1 1 udp 1 10.0.0.1 9 typ host");
        let init: RTCIceCandidateInit = rec.clone().into();
        assert_eq!(init.username_fragment, None);
        assert_eq!(CandidateRecord::from(init), rec);
    }
}
