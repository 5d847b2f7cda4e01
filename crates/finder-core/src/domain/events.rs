//! The confirmation event raised when a peer's heartbeat is acknowledged.

use std::fmt;
use std::net::SocketAddr;

/// Transport on which a heartbeat arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Udp,
    Tcp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Udp => f.write_str("udp"),
            Transport::Tcp => f.write_str("tcp"),
        }
    }
}

/// A peer proved it is alive and was told to stop retrying.
///
/// Both transports may raise one for the same peer; consumers are expected
/// to act on the first and ignore the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    /// Source address of the heartbeat.
    pub peer: SocketAddr,
    pub transport: Transport,
}

impl Confirmation {
    pub fn new(peer: SocketAddr, transport: Transport) -> Self {
        Self { peer, transport }
    }

    /// The peer IP as text, as reported to the UI layer.
    pub fn address(&self) -> String {
        self.peer.ip().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_drops_the_port() {
        let c = Confirmation::new("10.0.0.5:55000".parse().unwrap(), Transport::Udp);
        assert_eq!(c.address(), "10.0.0.5");
    }

    #[test]
    fn test_transport_display() {
        assert_eq!(Transport::Udp.to_string(), "udp");
        assert_eq!(Transport::Tcp.to_string(), "tcp");
    }
}
