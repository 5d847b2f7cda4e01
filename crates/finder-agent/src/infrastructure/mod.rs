//! Infrastructure layer for the finder agent.
//!
//! Contains OS-facing adapters: UDP/TCP sockets, the mDNS responder, local
//! interface enumeration, and configuration file storage.
//!
//! **Dependency rule**: this layer may depend on `application` and `finder_core`,
//! but MUST NOT be imported by the `application` or domain layers.

pub mod interfaces;
pub mod network;
pub mod storage;
