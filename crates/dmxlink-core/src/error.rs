//! Error types for the connection manager and its collaborators.

use thiserror::Error;

/// The daemon could not be reached.
///
/// Expected while the daemon is starting up or absent; the retry loop treats it
/// as "try again later" and never surfaces it to the caller.
#[derive(Error, Debug)]
#[error("Daemon not running: {reason}")]
pub struct DaemonUnavailable {
    pub reason: String,
}

impl DaemonUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failures raised out of a live session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Connection to daemon lost: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Daemon closed the connection")]
    Closed,

    #[error("JSON serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Invalid configuration detected before any worker is spawned.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Socket path is empty")]
    EmptySocketPath,

    #[error("Socket directory does not exist: {0}")]
    MissingSocketDir(String),

    #[error("Write timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Errors returned synchronously by `start_connection`.
#[derive(Error, Debug)]
pub enum StartError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Failed to spawn connection worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// A payload that cannot be sent as a single DMX frame.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame has {len} channels, a universe holds at most {max}")]
    TooLong { len: usize, max: usize },
}
