use thiserror::Error;

/// Errors raised by the replay engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no presentation data is loaded")]
    NotLoaded,

    #[error("failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("engine has been shut down")]
    ShutDown,

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
