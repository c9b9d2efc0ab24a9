//! Loading of presentation scripts into the timeline engine

pub mod config;
pub mod decode;
pub mod loader;
pub mod script;
pub mod sources;
pub mod time;

use thiserror::Error;
use tokio::task::JoinError;

// Re-exports
pub use config::{LoadOptions, ViewerVersion};
pub use loader::{load_into, spawn_load, spawn_load_async, LoadReport, ScriptLoader};
pub use script::{ScriptItem, ScriptTime, ScriptType};
pub use sources::{JsonlSource, ScriptSource, VecSource};

pub type DataResult<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading a script
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid deck id: {0}")]
    InvalidDeckId(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Join error: {0}")]
    Join(#[from] JoinError),

    #[error("Source error: {0}")]
    Source(String),
}

impl DataError {
    /// Errors that end a load. Everything else only costs the item that
    /// raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DataError::Io(_) | DataError::Join(_) | DataError::Source(_))
    }
}
