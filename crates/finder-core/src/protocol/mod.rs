//! Protocol module containing the wire tokens and protocol defaults.

pub mod defaults;
pub mod tokens;

pub use defaults::*;
pub use tokens::{Token, DISCOVERY_PROBE, EXIT, HEARTBEAT};
