pub mod config;
pub mod console;
pub mod controller;
pub mod error;
pub mod logger;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod surface;
pub mod utils;

pub use config::RtcSettings;
pub use controller::{Background, Ingested, SessionController};
pub use error::{Result, SignalingError};
pub use peer::{PeerEvent, PeerEvents, PeerHandle, TaggedEvent, Transport, WebRtcTransport};
pub use session::{ConnectionState, SessionRole, SessionToken};
pub use signaling::{CandidateRecord, SessionDescription, SignalingMessage};
pub use surface::{ConsoleSurface, OperatorSurface, TextFields};

pub fn run() {
    logger::init();

    let settings = match RtcSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("ICE servers: {:?}", settings.ice_urls());

    let runtime = tokio::runtime::Runtime::new().expect("error while starting the tokio runtime");
    runtime.block_on(async move {
        let transport = WebRtcTransport::new(&settings);
        let mut controller = SessionController::new(transport, ConsoleSurface::new(), settings);
        if let Err(e) = console::run(&mut controller).await {
            tracing::error!("console input failed: {e}");
        }
    });
}
