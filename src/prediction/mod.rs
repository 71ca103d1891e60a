mod client;
mod types;

pub use client::{PredictionClient, ReplicateClient};
pub use types::*;
