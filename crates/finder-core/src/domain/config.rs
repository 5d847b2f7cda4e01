//! Discovery configuration and the plan derived from it.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::defaults::{
    DEFAULT_SEND_FREQUENCY_MS, TCP_LISTEN_PORT, UDP_LISTEN_PORT, UDP_TARGET_PORT,
};

/// One independent way of announcing presence or probing for a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Periodic datagram to the limited broadcast address.
    Broadcast,
    /// Continuous mDNS service record.
    Advertisement,
    /// Unicast probe to every host in the local subnet.
    SubnetSweep,
    /// Unicast probe to one configured address.
    DirectProbe,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Broadcast => "broadcast",
            Strategy::Advertisement => "advertisement",
            Strategy::SubnetSweep => "subnet-sweep",
            Strategy::DirectProbe => "direct-probe",
        };
        f.write_str(name)
    }
}

/// Everything the discovery engine and listener need for one run.
///
/// Validation (valid IP text, at least one method selected) belongs to the
/// settings layer.  The engine treats a config with no method selected as a
/// run that sends nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub use_broadcast: bool,
    #[serde(default)]
    pub use_advertisement: bool,
    #[serde(default)]
    pub use_sweep: bool,
    /// When set, only the direct probe runs.
    #[serde(default)]
    pub direct_target: Option<Ipv4Addr>,
    #[serde(default = "default_tcp_listen_port")]
    pub tcp_listen_port: u16,
    #[serde(default = "default_udp_listen_port")]
    pub udp_listen_port: u16,
    #[serde(default = "default_udp_target_port")]
    pub udp_target_port: u16,
    /// Broadcast period in milliseconds.
    #[serde(default = "default_send_frequency_ms")]
    pub send_frequency_ms: u32,
}

fn default_tcp_listen_port() -> u16 {
    TCP_LISTEN_PORT
}
fn default_udp_listen_port() -> u16 {
    UDP_LISTEN_PORT
}
fn default_udp_target_port() -> u16 {
    UDP_TARGET_PORT
}
fn default_send_frequency_ms() -> u32 {
    DEFAULT_SEND_FREQUENCY_MS
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            use_broadcast: false,
            use_advertisement: false,
            use_sweep: false,
            direct_target: None,
            tcp_listen_port: default_tcp_listen_port(),
            udp_listen_port: default_udp_listen_port(),
            udp_target_port: default_udp_target_port(),
            send_frequency_ms: default_send_frequency_ms(),
        }
    }
}

impl DiscoveryConfig {
    /// Resolves which strategies run.  A direct target wins over every flag.
    pub fn plan(&self) -> DiscoveryPlan {
        match self.direct_target {
            Some(target) => DiscoveryPlan::Direct(target),
            None => DiscoveryPlan::Strategies {
                broadcast: self.use_broadcast,
                advertisement: self.use_advertisement,
                sweep: self.use_sweep,
            },
        }
    }

    /// Broadcast tick period.  A zero frequency is clamped to 1 ms so the
    /// timer can never spin.
    pub fn broadcast_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.send_frequency_ms.max(1)))
    }
}

/// The strategies a discovery session will actually run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPlan {
    /// Probe exactly one address; nothing else runs.
    Direct(Ipv4Addr),
    /// Any combination of the three LAN-wide strategies.
    Strategies {
        broadcast: bool,
        advertisement: bool,
        sweep: bool,
    },
}

impl DiscoveryPlan {
    /// The strategies enabled by this plan, in a stable order.
    pub fn strategies(&self) -> Vec<Strategy> {
        match *self {
            DiscoveryPlan::Direct(_) => vec![Strategy::DirectProbe],
            DiscoveryPlan::Strategies {
                broadcast,
                advertisement,
                sweep,
            } => [
                (broadcast, Strategy::Broadcast),
                (advertisement, Strategy::Advertisement),
                (sweep, Strategy::SubnetSweep),
            ]
            .into_iter()
            .filter_map(|(enabled, strategy)| enabled.then_some(strategy))
            .collect(),
        }
    }

    /// Returns `true` when the plan sends nothing at all.
    pub fn is_empty(&self) -> bool {
        self.strategies().is_empty()
    }
}
