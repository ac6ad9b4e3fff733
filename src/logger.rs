use crate::signaling::CandidateRecord;
use once_cell::sync::OnceCell;
use std::fmt;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Local wall-clock timestamps, millisecond precision
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

fn default_directive() -> &'static str {
    if crate::config::LOGGING_ENABLED && crate::config::dev::ENABLE_LOGGING {
        "paste_rtc_lib=debug,paste_rtc=debug,webrtc=warn"
    } else {
        "warn"
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the build default.
/// Safe to call more than once.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive()));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(LocalTime)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Prints a trickled ICE candidate as it shows up
pub fn dump_candidate(label: &str, cand: &CandidateRecord) {
    tracing::debug!(
        "Trickle {label}: candidate={} sdp_mid={:?} sdp_mline_index={:?}",
        cand.candidate,
        cand.sdp_mid,
        cand.sdp_mline_index
    );
}
