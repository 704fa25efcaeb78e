//! Latest received frame per universe.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::frame::{DmxFrame, Universe};

/// Last-known-good inbound frame for each universe.
///
/// Cloning yields another handle to the same buffer. The worker writes from
/// its run-loop; any thread may read. Every write replaces the previous frame
/// for that universe, so readers only ever see the current channel values.
#[derive(Debug, Clone, Default)]
pub struct ReceiveBuffer {
    frames: Arc<Mutex<HashMap<Universe, DmxFrame>>>,
}

impl ReceiveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored frame for `universe`.
    pub fn store(&self, universe: Universe, frame: DmxFrame) {
        self.frames.lock().insert(universe, frame);
    }

    /// Most recent frame for `universe`, or `None` if nothing has arrived.
    pub fn latest(&self, universe: Universe) -> Option<DmxFrame> {
        self.frames.lock().get(&universe).cloned()
    }

    /// Universes that have received at least one frame, ascending.
    pub fn universes(&self) -> Vec<Universe> {
        let mut universes: Vec<Universe> = self.frames.lock().keys().copied().collect();
        universes.sort_unstable();
        universes
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}
