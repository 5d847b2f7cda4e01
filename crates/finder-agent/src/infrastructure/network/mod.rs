//! Network infrastructure for the finder agent.
//!
//! # Sub-modules
//!
//! - **`outbound`** – The single outbound UDP socket every discovery strategy
//!   writes through, behind the `DatagramSink` trait.
//!
//! - **`advertise`** – Publishes the mDNS service record used by the
//!   advertisement strategy.
//!
//! - **`discovery`** – The `DiscoveryEngine`: owns the strategy timers of one
//!   discovery session and the single `stop()` cancellation point.
//!
//! - **`listener`** – The `ConfirmationListener`: TCP accept socket and UDP
//!   receive socket that answer `heartbeat` with `EXIT` and raise
//!   confirmation events.
//!
//! No socket is shared between directions: the engine only writes through the
//! outbound socket and the listener only reads (and replies) on its own sockets.

pub mod advertise;
pub mod discovery;
pub mod listener;
pub mod outbound;
