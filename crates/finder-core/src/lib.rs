//! # finder-core
//!
//! Shared library for DeviceFinder containing the wire tokens, the discovery
//! configuration model, and the subnet arithmetic used by the sweep strategy.
//!
//! This crate has zero dependencies on sockets, timers, or OS interface APIs.
//! Everything here is plain data and pure functions, so it is tested without
//! touching the network.
//!
//! # Architecture overview
//!
//! DeviceFinder locates a peer device on a LAN.  Several independent discovery
//! strategies push a probe datagram onto the network while a listener waits for
//! the peer to answer with a `heartbeat`.  The first heartbeat that arrives is
//! acknowledged with `EXIT` and discovery stops.
//!
//! - **`protocol`** – The three literal byte tokens spoken on the wire and the
//!   default ports / service record values.
//!
//! - **`domain`** – `DiscoveryConfig` and the `DiscoveryPlan` derived from it,
//!   `SubnetRange` (which addresses a sweep visits), and the `Confirmation`
//!   event raised when a peer proves it is alive.

pub mod domain;
pub mod protocol;

pub use domain::config::{DiscoveryConfig, DiscoveryPlan, Strategy};
pub use domain::events::{Confirmation, Transport};
pub use domain::subnet::{SubnetError, SubnetRange};
pub use protocol::tokens::Token;
