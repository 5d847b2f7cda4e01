//! Storage infrastructure: the persisted settings file.
//!
//! The `config` sub-module reads and writes the TOML file holding the
//! discovery settings (target address, selected methods, ports, send
//! frequency).  A missing file is not an error: the defaults are used and the
//! file is written the first time settings are saved.

pub mod config;
