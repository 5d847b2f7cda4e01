//! Domain layer: pure discovery rules with no socket or timer dependencies.
//!
//! - **`config`** – What the user asked for (`DiscoveryConfig`) and what the
//!   engine will actually run (`DiscoveryPlan`).  A direct target always
//!   overrides the three method flags.
//!
//! - **`subnet`** – `SubnetRange`, the set of unicast host addresses a subnet
//!   sweep visits for a given local address and mask.
//!
//! - **`events`** – `Confirmation`, the one event that crosses from the
//!   listener to the pairing coordinator.

pub mod config;
pub mod events;
pub mod subnet;
