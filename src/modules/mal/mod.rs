mod cache;
mod client;
mod types;

pub use client::MalClient;
pub use types::{MalCandidate, MalFull, MetadataGate};
