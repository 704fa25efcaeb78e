//! Background connection manager.
//!
//! A [`ConnectionManager`] owns at most one worker thread. The worker loops
//! through the connection states: it probes the daemon at a fixed interval
//! while `Waiting`, enters the session's blocking run-loop once `Connected`,
//! and falls back to `Waiting` whenever the session dies on its own. Callers
//! only ever block inside [`ConnectionManager::stop_connection`], which joins
//! the worker.
//!
//! ```text
//! Standby --start--> Waiting --acquired--> Connected --> Running
//!                     ^   |                                 |
//!                     |   +-- unavailable (sleep, retry)    |
//!                     +------ transport error / rejected ---+
//! any --stop--> Stopping --worker joined--> Standby
//! ```

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use crate::buffer::ReceiveBuffer;
use crate::config::ManagerConfig;
use crate::error::StartError;
use crate::frame::{DmxFrame, Universe};
use crate::retry::RetryPolicy;
use crate::session::{DaemonSession, SessionFactory};
use crate::state::{ConnectionState, StatusSnapshot};

/// Observer for state transitions.
///
/// Called on every transition, including each repeated `Waiting` while the
/// daemon stays away, in the order the transitions happened. Runs on whichever
/// thread made the transition, without the state lock held, so it may read the
/// manager or send frames. It must not call `start_connection`/`stop_connection`.
pub type StateListener = Box<dyn Fn(ConnectionState) + Send + Sync + 'static>;

struct Inner<S> {
    state: ConnectionState,
    since: DateTime<Utc>,
    connected: bool,
    searching: bool,
    session: Option<Arc<S>>,
    /// Bumped for every acquired session so late callbacks from an old
    /// session cannot tear down its successor.
    generation: u64,
}

impl<S> Inner<S> {
    fn enter(&mut self, state: ConnectionState) {
        self.state = state;
        self.since = Utc::now();
    }
}

struct Shared<S> {
    inner: Mutex<Inner<S>>,
    /// Signalled when `searching` is cleared, cutting the retry sleep short.
    wake: Condvar,
    /// Held from a state change until its listener call has returned.
    order: Mutex<()>,
    listener: Option<StateListener>,
}

impl<S: DaemonSession> Shared<S> {
    fn new(listener: Option<StateListener>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ConnectionState::Standby,
                since: Utc::now(),
                connected: false,
                searching: false,
                session: None,
                generation: 0,
            }),
            wake: Condvar::new(),
            order: Mutex::new(()),
            listener,
        }
    }

    /// Apply `change` under the state lock and report the resulting state.
    ///
    /// `change` returns `None` to leave without reporting. Transitions racing
    /// on different threads reach the listener in the order they were applied.
    fn transition<T>(&self, change: impl FnOnce(&mut Inner<S>) -> Option<T>) -> Option<T> {
        let _order = self.order.lock();
        let (state, out) = {
            let mut inner = self.inner.lock();
            let out = change(&mut inner)?;
            (inner.state, out)
        };
        debug!(state = %state, "connection state changed");
        if let Some(listener) = &self.listener {
            listener(state);
        }
        Some(out)
    }

    /// A frame sent through session `generation` was rejected: treat it as
    /// connection loss.
    fn reject(&self, generation: u64, universe: Universe) {
        let rejected = self.transition(|inner| {
            if inner.generation != generation || !inner.state.has_session() {
                return None;
            }
            inner.connected = false;
            inner.enter(ConnectionState::Waiting);
            Some(inner.session.clone())
        });
        let Some(session) = rejected else {
            return;
        };

        warn!(universe, "daemon rejected frame; reconnecting");
        if let Some(session) = session {
            session.stop();
        }
    }
}

/// Builder for a [`ConnectionManager`].
pub struct ConnectionManagerBuilder<F> {
    factory: F,
    config: ManagerConfig,
    listener: Option<StateListener>,
}

impl<F: SessionFactory> ConnectionManagerBuilder<F> {
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn listener(mut self, listener: impl Fn(ConnectionState) + Send + Sync + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn build(self) -> ConnectionManager<F> {
        ConnectionManager {
            factory: Arc::new(self.factory),
            config: self.config,
            shared: Arc::new(Shared::new(self.listener)),
            buffer: ReceiveBuffer::new(),
            worker: Mutex::new(None),
        }
    }
}

/// Keeps one auto-reconnecting session to the daemon alive in the background.
///
/// All methods take `&self`; wrap the manager in an `Arc` to control it from
/// several threads. Dropping the manager stops it.
pub struct ConnectionManager<F: SessionFactory> {
    factory: Arc<F>,
    config: ManagerConfig,
    shared: Arc<Shared<F::Session>>,
    buffer: ReceiveBuffer,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<F: SessionFactory> ConnectionManager<F> {
    pub fn new(factory: F) -> Self {
        Self::builder(factory).build()
    }

    pub fn builder(factory: F) -> ConnectionManagerBuilder<F> {
        ConnectionManagerBuilder {
            factory,
            config: ManagerConfig::default(),
            listener: None,
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Spawn the worker and start searching for the daemon.
    ///
    /// Does nothing when already started. Configuration problems reported by
    /// the factory are returned here and leave the manager in `Standby`.
    pub fn start_connection(&self) -> Result<(), StartError> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            debug!("start requested while already started");
            return Ok(());
        }

        self.factory.prepare()?;

        self.shared.transition(|inner| {
            inner.connected = false;
            inner.searching = false;
            inner.session = None;
            inner.enter(ConnectionState::Waiting);
            Some(())
        });

        let task = Worker {
            factory: Arc::clone(&self.factory),
            shared: Arc::clone(&self.shared),
            buffer: self.buffer.clone(),
            retry: self.config.retry,
        };
        let spawned = thread::Builder::new()
            .name("dmxlink-worker".to_string())
            .spawn(move || task.run());

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                info!("connection worker started");
                Ok(())
            }
            Err(e) => {
                self.shared.transition(|inner| {
                    inner.enter(ConnectionState::Standby);
                    Some(())
                });
                Err(StartError::Spawn(e))
            }
        }
    }

    /// Stop searching or stop the live session, then wait for the worker to
    /// exit.
    ///
    /// Once this returns the state is `Standby` and the receive buffer will
    /// not be written again until the next `start_connection`. Safe to call
    /// from any thread and more than once.
    pub fn stop_connection(&self) {
        let mut worker = self.worker.lock();
        let Some(handle) = worker.take() else {
            return;
        };

        // No frame may reach the session once `Stopping` is visible.
        let session = self
            .shared
            .transition(|inner| {
                inner.searching = false;
                inner.connected = false;
                inner.enter(ConnectionState::Stopping);
                Some(inner.session.clone())
            })
            .flatten();
        self.shared.wake.notify_all();

        match session {
            Some(session) => {
                info!("stopping daemon session");
                session.stop();
            }
            None => info!("stopped searching for daemon"),
        }

        if handle.join().is_err() {
            error!("connection worker panicked");
        }

        self.shared.transition(|inner| {
            inner.session = None;
            inner.connected = false;
            inner.searching = false;
            inner.enter(ConnectionState::Standby);
            Some(())
        });
        info!("connection worker stopped");
    }

    /// Stop when active, start when in `Standby`.
    pub fn toggle_connection(&self) -> Result<(), StartError> {
        if self.current_state().is_active() {
            self.stop_connection();
            Ok(())
        } else {
            self.start_connection()
        }
    }

    pub fn current_state(&self) -> ConnectionState {
        self.shared.inner.lock().state
    }

    /// A session is live and accepting frames.
    pub fn is_connected(&self) -> bool {
        self.shared.inner.lock().connected
    }

    /// The worker is in its retry loop.
    pub fn is_searching(&self) -> bool {
        self.shared.inner.lock().searching
    }

    pub fn status(&self) -> StatusSnapshot {
        let inner = self.shared.inner.lock();
        StatusSnapshot {
            state: inner.state,
            connected: inner.connected,
            searching: inner.searching,
            since: inner.since,
        }
    }

    /// Submit one frame without waiting for the daemon.
    ///
    /// Returns `false` and drops the frame outside `Connected`/`Running`, when
    /// no session is connected, or when the payload exceeds one universe. A rejection reported later by the daemon
    /// drops the connection and sends the manager back to `Waiting`.
    pub fn send_frame(&self, universe: Universe, payload: &[u8]) -> bool {
        let frame = match DmxFrame::from_slice(payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(universe, error = %e, "dropping frame");
                return false;
            }
        };

        let (session, generation) = {
            let inner = self.shared.inner.lock();
            match (&inner.session, inner.connected && inner.state.has_session()) {
                (Some(session), true) => (Arc::clone(session), inner.generation),
                _ => return false,
            }
        };

        let shared: Weak<Shared<F::Session>> = Arc::downgrade(&self.shared);
        session.send_frame(
            universe,
            frame,
            Box::new(move |ok| {
                if ok {
                    return;
                }
                if let Some(shared) = shared.upgrade() {
                    shared.reject(generation, universe);
                }
            }),
        );
        true
    }

    /// Latest frame received for `universe`, if any.
    pub fn received_data(&self, universe: Universe) -> Option<Vec<u8>> {
        self.buffer.latest(universe).map(DmxFrame::into_inner)
    }

    pub fn receive_buffer(&self) -> &ReceiveBuffer {
        &self.buffer
    }
}

impl<F: SessionFactory> Drop for ConnectionManager<F> {
    fn drop(&mut self) {
        self.stop_connection();
    }
}

/// State owned by the worker thread.
struct Worker<F: SessionFactory> {
    factory: Arc<F>,
    shared: Arc<Shared<F::Session>>,
    buffer: ReceiveBuffer,
    retry: RetryPolicy,
}

impl<F: SessionFactory> Worker<F> {
    fn run(self) {
        loop {
            let state = self.shared.inner.lock().state;
            match state {
                ConnectionState::Waiting => {
                    if !self.wait_for_daemon() {
                        break;
                    }
                }
                ConnectionState::Connected => self.enter_running(),
                ConnectionState::Running => self.run_session(),
                ConnectionState::Standby
                | ConnectionState::Stopping
                | ConnectionState::Starting => break,
            }
        }
        debug!("connection worker exiting");
    }

    /// Retry loop. Returns `true` once a session is recorded, `false` when the
    /// search was called off.
    fn wait_for_daemon(&self) -> bool {
        {
            let mut inner = self.shared.inner.lock();
            if inner.state != ConnectionState::Waiting {
                return false;
            }
            inner.connected = false;
            inner.searching = true;
        }
        info!("waiting for daemon");

        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            match self.factory.acquire() {
                Ok(session) => return self.record_session(session, attempt),
                Err(e) => {
                    debug!(attempt, error = %e, "daemon unavailable");
                    let still_waiting = self.shared.transition(|inner| {
                        (inner.searching && inner.state == ConnectionState::Waiting).then_some(())
                    });
                    if still_waiting.is_none() {
                        info!("stopped waiting for daemon");
                        return false;
                    }

                    let delay = self.retry.interval();
                    let mut inner = self.shared.inner.lock();
                    if inner.searching {
                        self.shared
                            .wake
                            .wait_while_for(&mut inner, |inner| inner.searching, delay);
                    }
                    if !inner.searching {
                        info!("stopped waiting for daemon");
                        return false;
                    }
                }
            }
        }
    }

    fn record_session(&self, session: F::Session, attempt: u64) -> bool {
        let session = Arc::new(session);
        let recorded = self.shared.transition(|inner| {
            if !inner.searching || inner.state != ConnectionState::Waiting {
                return None;
            }
            inner.searching = false;
            inner.connected = true;
            inner.generation += 1;
            inner.session = Some(Arc::clone(&session));
            inner.enter(ConnectionState::Connected);
            Some(())
        });
        if recorded.is_none() {
            // Stopped while the daemon was answering: the session never runs.
            session.stop();
            info!("stopped waiting for daemon");
            return false;
        }
        info!(attempt, "connected to daemon");
        true
    }

    fn enter_running(&self) {
        self.shared.transition(|inner| {
            if inner.state != ConnectionState::Connected {
                return None;
            }
            inner.enter(ConnectionState::Running);
            Some(())
        });
    }

    fn run_session(&self) {
        let current = {
            let inner = self.shared.inner.lock();
            inner.session.clone().map(|session| (session, inner.generation))
        };
        let Some((session, generation)) = current else {
            self.shared.transition(|inner| {
                if inner.state != ConnectionState::Running {
                    return None;
                }
                inner.connected = false;
                inner.enter(ConnectionState::Waiting);
                Some(())
            });
            return;
        };

        debug!("entering session run-loop");
        let buffer = &self.buffer;
        let result = session.run(&mut |universe, frame| buffer.store(universe, frame));
        session.stop();

        {
            let mut inner = self.shared.inner.lock();
            if inner.generation == generation {
                inner.session = None;
                inner.connected = false;
            }
            if inner.state == ConnectionState::Stopping {
                debug!("session run-loop exited on stop");
                return;
            }
        }

        match result {
            Err(e) => warn!(error = %e, "connection to daemon lost"),
            Ok(()) => info!("daemon session ended"),
        }
        // A rejection has already moved to `Waiting`; a stop owns the state.
        self.shared.transition(|inner| {
            if matches!(inner.state, ConnectionState::Waiting | ConnectionState::Stopping) {
                return None;
            }
            inner.enter(ConnectionState::Waiting);
            Some(())
        });
    }
}
