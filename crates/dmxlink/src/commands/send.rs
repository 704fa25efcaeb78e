//! `send`: deliver one frame and disconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use dmxlink_core::{
    ConnectionManager, ConnectionState, DmxFrame, ManagerConfig, SocketSessionFactory, Universe,
};
use serde_json::json;
use tracing::info;

use crate::output::OutputControls;

const POLL: Duration = Duration::from_millis(20);

/// Time allowed for the daemon to reject the frame before disconnecting.
const SETTLE: Duration = Duration::from_millis(200);

pub fn run(
    factory: SocketSessionFactory,
    config: ManagerConfig,
    universe: Universe,
    values: &[u8],
    wait: Duration,
    out: &OutputControls,
) -> Result<()> {
    let frame = DmxFrame::from_slice(values).context("Invalid frame")?;

    let dropped = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&dropped);
    let manager = ConnectionManager::builder(factory)
        .config(config)
        .listener(move |state| {
            if state == ConnectionState::Waiting {
                flag.store(true, Ordering::SeqCst);
            }
        })
        .build();
    manager
        .start_connection()
        .context("Failed to start connection")?;

    let deadline = Instant::now() + wait;
    while manager.current_state() != ConnectionState::Running {
        if Instant::now() >= deadline {
            manager.stop_connection();
            bail!(
                "Daemon not reachable at {} after {:.1}s",
                manager.factory().config().path.display(),
                wait.as_secs_f64()
            );
        }
        thread::sleep(POLL);
    }

    dropped.store(false, Ordering::SeqCst);
    if !manager.send_frame(universe, frame.as_slice()) {
        manager.stop_connection();
        bail!("Connection dropped before the frame could be sent");
    }

    // A rejection sends the manager back to Waiting.
    thread::sleep(SETTLE);
    manager.stop_connection();

    if dropped.load(Ordering::SeqCst) {
        bail!("Connection lost after sending to universe {}", universe);
    }

    info!(universe, channels = frame.len(), "frame sent");
    out.print(&json!({
        "universe": universe,
        "channels": frame.len(),
        "sent": true,
    }));
    Ok(())
}
