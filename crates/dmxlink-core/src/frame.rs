//! DMX frame payloads.

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Number of channels in one DMX universe.
pub const DMX_UNIVERSE_SIZE: usize = 512;

/// Universe identifier as understood by the daemon.
pub type Universe = u32;

/// Channel values for one universe, at most [`DMX_UNIVERSE_SIZE`] long.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct DmxFrame(Vec<u8>);

impl DmxFrame {
    pub fn new(channels: Vec<u8>) -> Result<Self, FrameError> {
        if channels.len() > DMX_UNIVERSE_SIZE {
            return Err(FrameError::TooLong {
                len: channels.len(),
                max: DMX_UNIVERSE_SIZE,
            });
        }
        Ok(Self(channels))
    }

    pub fn from_slice(channels: &[u8]) -> Result<Self, FrameError> {
        Self::new(channels.to_vec())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl TryFrom<Vec<u8>> for DmxFrame {
    type Error = FrameError;

    fn try_from(channels: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(channels)
    }
}

impl From<DmxFrame> for Vec<u8> {
    fn from(frame: DmxFrame) -> Self {
        frame.0
    }
}
