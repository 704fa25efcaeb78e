//! Auto-reconnecting connection manager for a DMX lighting daemon.
//!
//! A [`ConnectionManager`] keeps one session to the daemon alive on a
//! background worker, reconnecting whenever the daemon goes away, and lets
//! callers send DMX frames and read the latest frame received per universe
//! without ever blocking on the network.
//!
//! The daemon itself is reached through the [`SessionFactory`] /
//! [`DaemonSession`] traits; [`SocketSessionFactory`] implements them over a
//! Unix socket speaking NDJSON.

pub mod buffer;
pub mod config;
pub mod error;
pub mod frame;
pub mod manager;
pub mod protocol;
pub mod retry;
pub mod session;
pub mod state;

// Re-export commonly used types
pub use buffer::ReceiveBuffer;
pub use config::{ManagerConfig, SocketConfig};
pub use error::{ConfigError, DaemonUnavailable, FrameError, SessionError, StartError};
pub use frame::{DmxFrame, Universe, DMX_UNIVERSE_SIZE};
pub use manager::{ConnectionManager, ConnectionManagerBuilder, StateListener};
pub use retry::RetryPolicy;
pub use session::socket::{SocketSession, SocketSessionFactory};
pub use session::{CompletionCallback, DaemonSession, SessionFactory};
pub use state::{ConnectionState, StatusSnapshot};
