//! Application layer for the finder agent.
//!
//! Use cases here orchestrate the discovery and confirmation state machines
//! without performing any I/O themselves.  They depend on traits (such as
//! [`pairing::DiscoveryControl`]) that the infrastructure layer implements, so
//! tests can drive them with mocks.
//!
//! # Sub-modules
//!
//! - **`pairing`** – The `PairingCoordinator`: consumes confirmation events
//!   from the listener and stops discovery exactly once.

pub mod pairing;
