//! Fixed-answer address oracle for tests.

use std::net::Ipv4Addr;

use super::{AddressError, AddressOracle, InterfaceAddress};

/// An [`AddressOracle`] that always returns the same answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticAddressOracle {
    answer: Option<InterfaceAddress>,
}

impl StaticAddressOracle {
    /// An oracle reporting `ip` / `netmask`.
    pub fn new(ip: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        Self {
            answer: Some(InterfaceAddress { ip, netmask }),
        }
    }

    /// An oracle that never finds a usable interface.
    pub fn not_found() -> Self {
        Self { answer: None }
    }
}

impl AddressOracle for StaticAddressOracle {
    fn local_address_and_mask(&self) -> Result<InterfaceAddress, AddressError> {
        self.answer.ok_or(AddressError::NotFound)
    }
}
