pub mod batch;
pub mod codec;

pub use batch::{batch_of, frame_record, split_batch, ICE_SEPARATOR};
pub use codec::{decode, encode, CandidateRecord, SdpKind, SessionDescription, SignalingMessage};
