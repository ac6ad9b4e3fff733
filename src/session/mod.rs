pub mod connection;
pub mod state;

pub use connection::{CandidateDisposition, ConnectionSession};
pub use state::{ConnectionState, SessionRole, SessionToken};
