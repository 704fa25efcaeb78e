//! `status`: probe the daemon once.

use anyhow::{bail, Result};
use dmxlink_core::{DaemonSession, SessionFactory, SocketSessionFactory};
use serde_json::json;

use crate::output::OutputControls;

pub fn run(factory: &SocketSessionFactory, out: &OutputControls) -> Result<()> {
    let socket = factory.config().path.display().to_string();

    match factory.acquire() {
        Ok(session) => {
            session.stop();
            out.print(&json!({ "socket": socket, "reachable": true }));
            Ok(())
        }
        Err(e) => {
            out.print(&json!({
                "socket": socket,
                "reachable": false,
                "reason": e.reason,
            }));
            bail!("Daemon not running");
        }
    }
}
