//! `monitor`: stay connected and print what arrives.

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use dmxlink_core::{ConnectionManager, ManagerConfig, SocketSessionFactory, Universe};
use serde_json::json;

use crate::output::OutputControls;

/// Run until Enter is pressed (or stdin closes), printing each state change
/// and every universe whose latest frame differs from what was last printed.
pub fn run(
    factory: SocketSessionFactory,
    config: ManagerConfig,
    universes: &[Universe],
    interval: Duration,
    out: &OutputControls,
) -> Result<()> {
    let (state_tx, state_rx) = mpsc::channel();
    let manager = ConnectionManager::builder(factory)
        .config(config)
        .listener(move |state| {
            let _ = state_tx.send(state);
        })
        .build();

    manager
        .start_connection()
        .context("Failed to start connection")?;
    eprintln!(
        "watching {} (press Enter to stop)",
        manager.factory().config().path.display()
    );

    let (quit_tx, quit_rx) = mpsc::channel::<()>();
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        let _ = quit_tx.send(());
    });

    let mut printed: HashMap<Universe, Vec<u8>> = HashMap::new();
    loop {
        for state in state_rx.try_iter() {
            out.print(&json!({ "state": state }));
        }

        let watched = if universes.is_empty() {
            manager.receive_buffer().universes()
        } else {
            universes.to_vec()
        };
        for universe in watched {
            let Some(data) = manager.received_data(universe) else {
                continue;
            };
            if printed.get(&universe) != Some(&data) {
                out.print(&json!({ "universe": universe, "data": data }));
                printed.insert(universe, data);
            }
        }

        match quit_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Blocks until the worker has exited.
    manager.stop_connection();
    for state in state_rx.try_iter() {
        out.print(&json!({ "state": state }));
    }
    out.print(&manager.status());
    Ok(())
}
