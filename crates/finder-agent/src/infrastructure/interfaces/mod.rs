//! Local interface lookup: which IPv4 address and mask this host sweeps from.
//!
//! The subnet sweep needs exactly one local address and its netmask.  Hosts
//! often have several candidates (VPN tunnels, hypervisor bridges, container
//! networks, Bluetooth PAN), so the oracle skips anything that looks virtual
//! and returns the first physical-looking IPv4 entry.
//!
//! # Testability
//!
//! The engine depends on the [`AddressOracle`] trait; tests use
//! [`mock::StaticAddressOracle`].  The selection rule itself is the pure
//! function [`select_interface`], tested here on synthetic candidates.

use std::net::Ipv4Addr;

use if_addrs::IfAddr;
use thiserror::Error;
use tracing::{debug, trace};

pub mod mock;

/// Name fragments (lower-case) of interfaces never used for sweeping.
const EXCLUDED_NAME_FRAGMENTS: &[&str] = &[
    "vmware",
    "virtualbox",
    "vbox",
    "bluetooth",
    "docker",
    "veth",
    "br-",
    "virbr",
];

/// Error returned when no usable interface exists.
#[derive(Debug, Error)]
pub enum AddressError {
    /// No up, non-loopback, non-virtual, IPv4-capable interface was found.
    #[error("no usable IPv4 interface found")]
    NotFound,
    /// The OS interface list could not be read.
    #[error("failed to enumerate network interfaces: {0}")]
    Enumerate(#[from] std::io::Error),
}

/// A local IPv4 address together with its netmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

/// Supplies the local address the subnet sweep runs from.
pub trait AddressOracle: Send + Sync {
    /// # Errors
    ///
    /// [`AddressError::NotFound`] when the host has no usable interface.
    fn local_address_and_mask(&self) -> Result<InterfaceAddress, AddressError>;
}

/// One IPv4 interface entry as seen by the selection rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceCandidate {
    pub name: String,
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub is_loopback: bool,
}

/// Picks the first candidate that is not loopback and not virtual-looking.
pub fn select_interface<I>(candidates: I) -> Option<InterfaceAddress>
where
    I: IntoIterator<Item = InterfaceCandidate>,
{
    candidates.into_iter().find_map(|c| {
        if c.is_loopback || c.ip.is_loopback() || c.ip.is_unspecified() {
            trace!("skipping loopback interface {}", c.name);
            return None;
        }
        if c.ip.is_link_local() {
            trace!("skipping link-local address {} on {}", c.ip, c.name);
            return None;
        }
        let lower = c.name.to_ascii_lowercase();
        if EXCLUDED_NAME_FRAGMENTS.iter().any(|f| lower.contains(f)) {
            trace!("skipping virtual interface {}", c.name);
            return None;
        }
        Some(InterfaceAddress {
            ip: c.ip,
            netmask: c.netmask,
        })
    })
}

/// [`AddressOracle`] backed by the OS interface list (`if-addrs`).
#[derive(Debug, Default, Clone, Copy)]
pub struct IfAddrsOracle;

impl IfAddrsOracle {
    pub fn new() -> Self {
        Self
    }
}

impl AddressOracle for IfAddrsOracle {
    fn local_address_and_mask(&self) -> Result<InterfaceAddress, AddressError> {
        let interfaces = if_addrs::get_if_addrs()?;
        let candidates = interfaces.into_iter().filter_map(|iface| {
            let is_loopback = iface.is_loopback();
            match iface.addr {
                IfAddr::V4(v4) => Some(InterfaceCandidate {
                    name: iface.name,
                    ip: v4.ip,
                    netmask: v4.netmask,
                    is_loopback,
                }),
                IfAddr::V6(_) => None,
            }
        });

        let selected = select_interface(candidates).ok_or(AddressError::NotFound)?;
        debug!("local address {} mask {}", selected.ip, selected.netmask);
        Ok(selected)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, ip: [u8; 4], loopback: bool) -> InterfaceCandidate {
        InterfaceCandidate {
            name: name.to_string(),
            ip: Ipv4Addr::from(ip),
            netmask: Ipv4Addr::new(255, 255, 255, 0),
            is_loopback: loopback,
        }
    }

    #[test]
    fn test_select_interface_skips_loopback() {
        // Arrange
        let candidates = vec![
            candidate("lo", [127, 0, 0, 1], true),
            candidate("eth0", [192, 168, 1, 10], false),
        ];

        // Act
        let selected = select_interface(candidates);

        // Assert
        assert_eq!(
            selected,
            Some(InterfaceAddress {
                ip: Ipv4Addr::new(192, 168, 1, 10),
                netmask: Ipv4Addr::new(255, 255, 255, 0),
            })
        );
    }

    #[test]
    fn test_select_interface_skips_virtual_and_bluetooth_names() {
        let candidates = vec![
            candidate("VMware Network Adapter VMnet8", [192, 168, 56, 1], false),
            candidate("Bluetooth Network Connection", [10, 9, 9, 1], false),
            candidate("docker0", [172, 17, 0, 1], false),
            candidate("wlan0", [10, 0, 0, 23], false),
        ];

        let selected = select_interface(candidates).expect("wlan0 is usable");

        assert_eq!(selected.ip, Ipv4Addr::new(10, 0, 0, 23));
    }

    #[test]
    fn test_select_interface_skips_link_local() {
        let candidates = vec![
            candidate("eth1", [169, 254, 3, 4], false),
            candidate("eth0", [192, 168, 0, 2], false),
        ];

        let selected = select_interface(candidates).unwrap();

        assert_eq!(selected.ip, Ipv4Addr::new(192, 168, 0, 2));
    }

    #[test]
    fn test_select_interface_returns_none_when_nothing_usable() {
        let candidates = vec![
            candidate("lo", [127, 0, 0, 1], true),
            candidate("vboxnet0", [192, 168, 56, 1], false),
        ];

        assert_eq!(select_interface(candidates), None);
    }

    #[test]
    fn test_if_addrs_oracle_result_is_never_loopback() {
        // Depends on the host; only assert invariants of a successful lookup.
        if let Ok(addr) = IfAddrsOracle::new().local_address_and_mask() {
            assert!(!addr.ip.is_loopback());
            assert!(!addr.ip.is_unspecified());
        }
    }
}
