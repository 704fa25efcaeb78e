//! Command implementations.

pub mod monitor;
pub mod send;
pub mod status;
