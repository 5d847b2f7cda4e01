//! Default ports, timings, and the advertised service record.
//!
//! All of these can be overridden through configuration; nothing here is
//! process-wide mutable state.

use std::time::Duration;

// ── Ports ─────────────────────────────────────────────────────────────────────

/// UDP port the peer listens on for discovery probes.
pub const UDP_TARGET_PORT: u16 = 9910;

/// UDP port the confirmation listener binds.
pub const UDP_LISTEN_PORT: u16 = 68;

/// TCP port the confirmation listener binds.
pub const TCP_LISTEN_PORT: u16 = 80;

// ── Service advertisement ─────────────────────────────────────────────────────

/// mDNS service type published by the advertisement strategy.
pub const SERVICE_TYPE: &str = "_test._tcp.local.";

/// mDNS instance name published by the advertisement strategy.
pub const SERVICE_NAME: &str = "JumpWDevice";

/// Port carried in the advertised record.  Independent of the TCP listen port.
pub const SERVICE_PORT: u16 = 8080;

// ── Timing ────────────────────────────────────────────────────────────────────

/// Default broadcast period in milliseconds.
pub const DEFAULT_SEND_FREQUENCY_MS: u32 = 1000;

/// Tick period of the subnet sweep and the direct probe.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Safety cap on broadcast sends per discovery session.
pub const MAX_BROADCAST_ATTEMPTS: u32 = 30;

/// Silence window after which an accepted TCP connection is force-closed.
pub const TCP_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
