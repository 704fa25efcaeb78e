//! Unix socket session speaking NDJSON with the daemon.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{CompletionCallback, DaemonSession, SessionFactory};
use crate::config::SocketConfig;
use crate::error::{ConfigError, DaemonUnavailable, SessionError};
use crate::frame::{DmxFrame, Universe};
use crate::protocol::{Incoming, Request, EVENT_DMX};

/// Connects to the daemon's Unix socket.
#[derive(Debug, Clone)]
pub struct SocketSessionFactory {
    config: SocketConfig,
}

impl SocketSessionFactory {
    pub fn new(config: SocketConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }
}

impl SessionFactory for SocketSessionFactory {
    type Session = SocketSession;

    fn prepare(&self) -> Result<(), ConfigError> {
        self.config.validate()
    }

    fn acquire(&self) -> Result<SocketSession, DaemonUnavailable> {
        let path = &self.config.path;

        if !path.exists() {
            return Err(DaemonUnavailable::new(format!(
                "socket not found: {}",
                path.display()
            )));
        }

        let stream = UnixStream::connect(path).map_err(|e| {
            DaemonUnavailable::new(format!("connect to {} failed: {}", path.display(), e))
        })?;

        SocketSession::from_stream(stream, &self.config)
            .map_err(|e| DaemonUnavailable::new(format!("socket setup failed: {}", e)))
    }
}

/// One live socket connection.
///
/// The stream is split three ways: a reader consumed by `run`, a writer shared
/// by senders, and a handle used only to shut the socket down from `stop`.
pub struct SocketSession {
    reader: Mutex<Option<UnixStream>>,
    writer: Mutex<UnixStream>,
    control: UnixStream,
    pending: Mutex<HashMap<String, CompletionCallback>>,
    stopped: AtomicBool,
}

impl SocketSession {
    fn from_stream(stream: UnixStream, config: &SocketConfig) -> std::io::Result<Self> {
        stream.set_write_timeout(Some(config.write_timeout))?;
        let reader = stream.try_clone()?;
        let control = stream.try_clone()?;

        Ok(Self {
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(stream),
            control,
            pending: Mutex::new(HashMap::new()),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn write_request(&self, request: &Request) -> Result<(), SessionError> {
        let line = request.to_ndjson_line().map_err(SessionError::Serialize)?;
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn dispatch(&self, line: &str, on_frame: &mut dyn FnMut(Universe, DmxFrame)) {
        if line.trim().is_empty() {
            return;
        }

        match Incoming::from_ndjson_line(line) {
            Ok(Incoming::Event(event)) if event.event == EVENT_DMX => {
                on_frame(event.universe, event.data);
            }
            Ok(Incoming::Event(event)) => {
                debug!(event = %event.event, "ignoring unknown daemon event");
            }
            Ok(Incoming::Response(response)) => {
                let callback = self.pending.lock().remove(&response.id);
                match callback {
                    Some(callback) => {
                        if let Some(error) = &response.error {
                            debug!(code = %error.code, message = %error.message, "daemon rejected request");
                        }
                        callback(response.ok);
                    }
                    None => debug!(id = %response.id, "response for unknown request"),
                }
            }
            Err(e) => warn!(error = %e, "skipping unparseable line from daemon"),
        }
    }

    /// Drop callbacks for frames that will never be answered.
    fn abandon_pending(&self) {
        let abandoned = std::mem::take(&mut *self.pending.lock());
        if !abandoned.is_empty() {
            debug!(count = abandoned.len(), "dropping unanswered frames");
        }
    }
}

impl DaemonSession for SocketSession {
    fn run(&self, on_frame: &mut dyn FnMut(Universe, DmxFrame)) -> Result<(), SessionError> {
        let Some(stream) = self.reader.lock().take() else {
            return Err(SessionError::Closed);
        };
        let mut reader = BufReader::new(stream);
        let mut line = String::new();

        let result = loop {
            line.clear();
            let read = reader.read_line(&mut line);

            if self.is_stopped() {
                break Ok(());
            }

            match read {
                Ok(0) => break Err(SessionError::Closed),
                Ok(_) => self.dispatch(&line, on_frame),
                Err(e) => break Err(SessionError::Transport(e)),
            }
        };

        self.abandon_pending();
        result
    }

    fn send_frame(&self, universe: Universe, frame: DmxFrame, on_complete: CompletionCallback) {
        if self.is_stopped() {
            debug!(universe, "session stopped; frame dropped");
            return;
        }

        let request = Request::send_dmx(universe, &frame);
        // Registered before writing so a fast answer always finds its callback.
        self.pending.lock().insert(request.id.clone(), on_complete);

        if let Err(e) = self.write_request(&request) {
            self.pending.lock().remove(&request.id);
            warn!(universe, error = %e, "frame could not be written; dropping session");
            self.stop();
        }
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.control.shutdown(Shutdown::Both) {
            debug!(error = %e, "socket shutdown failed");
        }
    }
}
