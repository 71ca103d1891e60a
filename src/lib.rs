pub mod art;
pub mod audio;
pub mod config;
pub mod error;
pub mod generation;
pub mod history;
pub mod prediction;
pub mod server;

pub use error::{Error, Result};
