//! Scripted in-memory sessions for exercising the manager.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::{CompletionCallback, DaemonSession, SessionFactory};
use crate::error::{ConfigError, DaemonUnavailable, SessionError};
use crate::frame::{DmxFrame, Universe};

/// What the next `acquire` call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acquire {
    Unavailable,
    Connect,
}

enum Event {
    Frame(Universe, DmxFrame),
    Complete(bool),
    TransportFailure,
}

#[derive(Default)]
pub(crate) struct MockFactory {
    script: Mutex<VecDeque<Acquire>>,
    sessions: Mutex<Vec<Arc<MockLink>>>,
    attempts: AtomicUsize,
    broken_config: AtomicBool,
    on_acquire: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl MockFactory {
    pub(crate) fn new(script: &[Acquire]) -> Arc<Self> {
        let factory = Self::default();
        factory.script.lock().extend(script.iter().copied());
        Arc::new(factory)
    }

    /// Factory whose `prepare` fails.
    pub(crate) fn misconfigured() -> Arc<Self> {
        let factory = Self::default();
        factory.broken_config.store(true, Ordering::SeqCst);
        Arc::new(factory)
    }

    pub(crate) fn push(&self, outcome: Acquire) {
        self.script.lock().push_back(outcome);
    }

    /// Run `hook` at the start of every `acquire`, on the worker thread.
    pub(crate) fn on_acquire(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_acquire.lock() = Some(Box::new(hook));
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Handle to the n-th session handed out.
    pub(crate) fn link(&self, index: usize) -> Arc<MockLink> {
        Arc::clone(&self.sessions.lock()[index])
    }
}

impl SessionFactory for Arc<MockFactory> {
    type Session = MockSession;

    fn prepare(&self) -> Result<(), ConfigError> {
        if self.broken_config.load(Ordering::SeqCst) {
            return Err(ConfigError::MissingSocketDir("/nonexistent".to_string()));
        }
        Ok(())
    }

    fn acquire(&self) -> Result<MockSession, DaemonUnavailable> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.on_acquire.lock().as_ref() {
            hook();
        }
        match self.script.lock().pop_front() {
            Some(Acquire::Connect) => {
                let link = Arc::new(MockLink::default());
                self.sessions.lock().push(Arc::clone(&link));
                Ok(MockSession { link })
            }
            Some(Acquire::Unavailable) => Err(DaemonUnavailable::new("scripted outage")),
            None => Err(DaemonUnavailable::new("script exhausted")),
        }
    }
}

/// Test-side view of one session: inject traffic, inspect what was sent.
#[derive(Default)]
pub(crate) struct MockLink {
    events: Mutex<VecDeque<Event>>,
    wake: Condvar,
    callbacks: Mutex<VecDeque<CompletionCallback>>,
    sent: Mutex<Vec<(Universe, DmxFrame)>>,
    stopped: AtomicBool,
    running: AtomicBool,
}

impl MockLink {
    fn push(&self, event: Event) {
        self.events.lock().push_back(event);
        self.wake.notify_all();
    }

    pub(crate) fn inject_frame(&self, universe: Universe, values: &[u8]) {
        self.push(Event::Frame(universe, DmxFrame::from_slice(values).unwrap()));
    }

    /// Answer the oldest outstanding send.
    pub(crate) fn complete_next(&self, ok: bool) {
        self.push(Event::Complete(ok));
    }

    pub(crate) fn fail_transport(&self) {
        self.push(Event::TransportFailure);
    }

    pub(crate) fn sent(&self) -> Vec<(Universe, DmxFrame)> {
        self.sent.lock().clone()
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockSession {
    link: Arc<MockLink>,
}

impl MockSession {
    fn next_event(&self) -> Option<Event> {
        let mut events = self.link.events.lock();
        loop {
            if self.link.is_stopped() {
                return None;
            }
            if let Some(event) = events.pop_front() {
                return Some(event);
            }
            self.link.wake.wait(&mut events);
        }
    }
}

impl DaemonSession for MockSession {
    fn run(&self, on_frame: &mut dyn FnMut(Universe, DmxFrame)) -> Result<(), SessionError> {
        self.link.running.store(true, Ordering::SeqCst);
        let result = loop {
            match self.next_event() {
                None => break Ok(()),
                Some(Event::Frame(universe, frame)) => on_frame(universe, frame),
                Some(Event::Complete(ok)) => {
                    let callback = self.link.callbacks.lock().pop_front();
                    if let Some(callback) = callback {
                        callback(ok);
                    }
                }
                Some(Event::TransportFailure) => {
                    break Err(SessionError::Transport(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "scripted transport failure",
                    )))
                }
            }
        };
        self.link.running.store(false, Ordering::SeqCst);
        result
    }

    fn send_frame(&self, universe: Universe, frame: DmxFrame, on_complete: CompletionCallback) {
        self.link.sent.lock().push((universe, frame));
        self.link.callbacks.lock().push_back(on_complete);
    }

    fn stop(&self) {
        self.link.stopped.store(true, Ordering::SeqCst);
        // Take the lock so a waiter between its stopped check and `wait` cannot
        // miss the wakeup.
        let _events = self.link.events.lock();
        self.link.wake.notify_all();
    }
}
