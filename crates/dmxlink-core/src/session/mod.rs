//! The daemon collaborator contract.
//!
//! The manager never speaks to the daemon directly. It asks a
//! [`SessionFactory`] for a [`DaemonSession`], drives that session's blocking
//! run-loop on its worker thread, and submits frames through it.

pub mod socket;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::{ConfigError, DaemonUnavailable, SessionError};
use crate::frame::{DmxFrame, Universe};

/// Called once with the daemon's verdict on a submitted frame.
pub type CompletionCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Produces sessions bound to one live daemon connection each.
pub trait SessionFactory: Send + Sync + 'static {
    type Session: DaemonSession;

    /// Synchronous setup check run by `start_connection` before any worker
    /// exists. Errors here are reported to the caller.
    fn prepare(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Try to connect. Must not block for long; the retry loop calls it
    /// repeatedly while the daemon is away.
    fn acquire(&self) -> Result<Self::Session, DaemonUnavailable>;
}

/// An established connection to the daemon.
///
/// `run` is called from the worker thread only; `send_frame` and `stop` may be
/// called from any thread while `run` is blocked.
pub trait DaemonSession: Send + Sync + 'static {
    /// Block dispatching inbound frames to `on_frame` and completion callbacks
    /// for earlier sends.
    ///
    /// Returns `Ok(())` once [`stop`](Self::stop) has been called and an error
    /// when the connection fails on its own.
    fn run(&self, on_frame: &mut dyn FnMut(Universe, DmxFrame)) -> Result<(), SessionError>;

    /// Submit a frame. `on_complete` is invoked from inside `run` when the
    /// daemon acknowledges (`true`) or rejects (`false`) it. If the session ends
    /// first the callback is dropped without being called.
    fn send_frame(&self, universe: Universe, frame: DmxFrame, on_complete: CompletionCallback);

    /// Ask `run` to return and release the connection. Idempotent.
    fn stop(&self);
}
