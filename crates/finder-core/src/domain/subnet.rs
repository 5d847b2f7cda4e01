//! Subnet arithmetic for the sweep strategy.
//!
//! # How the sweep range is computed
//!
//! Given the local address and its netmask, both treated as 32-bit integers:
//!
//! ```text
//! local     = 192.168.1.10   = 0xC0A8010A
//! mask      = 255.255.255.0  = 0xFFFFFF00
//! network   = local & mask   = 192.168.1.0
//! broadcast = network | !mask = 192.168.1.255
//! hosts     = network+1 .. broadcast (exclusive), minus `local`
//!           = 192.168.1.1 ..= 192.168.1.254 without .10
//! ```
//!
//! Both ends are excluded because they are the network identifier and the
//! directed broadcast address, not hosts.

use std::net::Ipv4Addr;

use thiserror::Error;

/// Reasons a local address / mask pair cannot be swept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubnetError {
    /// The mask has a 0 bit before a 1 bit (e.g. `255.0.255.0`).
    #[error("netmask {0} is not contiguous")]
    NonContiguousMask(Ipv4Addr),
    /// The local address is unspecified or loopback.
    #[error("local address {0} is not a usable LAN address")]
    UnusableAddress(Ipv4Addr),
    /// /31 and /32 masks have no address strictly between network and broadcast.
    #[error("/{prefix} subnet has no sweepable hosts")]
    NoHosts { prefix: u32 },
}

/// The unicast host range of the local subnet, excluding the local address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetRange {
    local: Ipv4Addr,
    network: u32,
    broadcast: u32,
    prefix: u32,
}

impl SubnetRange {
    /// Builds the sweep range for `local` inside the subnet described by `mask`.
    ///
    /// # Errors
    ///
    /// Returns a [`SubnetError`] when the pair does not describe a sweepable
    /// LAN subnet.
    pub fn new(local: Ipv4Addr, mask: Ipv4Addr) -> Result<Self, SubnetError> {
        if local.is_unspecified() || local.is_loopback() {
            return Err(SubnetError::UnusableAddress(local));
        }

        let mask_bits = u32::from(mask);
        // A contiguous mask has all of its 1 bits at the top, so its inverse
        // plus one is a power of two (or zero for 0.0.0.0).
        if (!mask_bits).wrapping_add(1) & !mask_bits != 0 {
            return Err(SubnetError::NonContiguousMask(mask));
        }
        let prefix = mask_bits.count_ones();
        if prefix > 30 {
            return Err(SubnetError::NoHosts { prefix });
        }

        let network = u32::from(local) & mask_bits;
        let broadcast = network | !mask_bits;
        Ok(Self {
            local,
            network,
            broadcast,
            prefix,
        })
    }

    pub fn local(&self) -> Ipv4Addr {
        self.local
    }

    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.broadcast)
    }

    pub fn prefix_len(&self) -> u32 {
        self.prefix
    }

    /// Every address strictly between network and broadcast, minus `local`.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        let local = u32::from(self.local);
        (self.network + 1..self.broadcast)
            .filter(move |addr| *addr != local)
            .map(Ipv4Addr::from)
    }

    /// Number of addresses [`hosts`](Self::hosts) yields.
    pub fn host_count(&self) -> usize {
        let span = (self.broadcast - self.network - 1) as usize;
        if self.contains(self.local) {
            span - 1
        } else {
            span
        }
    }

    /// Returns `true` when `addr` lies strictly between network and broadcast.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let addr = u32::from(addr);
        addr > self.network && addr < self.broadcast
    }
}
