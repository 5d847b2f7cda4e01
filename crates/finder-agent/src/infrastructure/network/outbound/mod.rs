//! Outbound datagram socket shared by all discovery strategies.
//!
//! The socket is created once per process with `SO_BROADCAST` enabled so the
//! same handle can reach `255.255.255.255` and any unicast host.  Sends are
//! fire-and-forget: a failed send is logged by the caller and never aborts a
//! strategy.
//!
//! # Testability
//!
//! Strategies write through the [`DatagramSink`] trait; tests use
//! [`mock::RecordingSink`] to capture every send without touching the network.

use std::io;
use std::net::{SocketAddr, SocketAddrV4};

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::debug;

pub mod mock;

/// Error raised when the outbound socket cannot be allocated.
///
/// This is the one failure the owning process treats as fatal.
#[derive(Debug, Error)]
#[error("failed to create outbound discovery socket: {0}")]
pub struct SinkError(#[from] io::Error);

/// Destination for discovery datagrams.
#[async_trait]
pub trait DatagramSink: Send + Sync {
    /// Sends `payload` to `target`, returning the number of bytes written.
    async fn send_to(&self, payload: &[u8], target: SocketAddrV4) -> io::Result<usize>;
}

/// Broadcast-capable UDP sender backed by a tokio socket.
pub struct UdpDatagramSender {
    socket: UdpSocket,
}

impl UdpDatagramSender {
    /// Creates the outbound socket on an ephemeral port of all interfaces.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the OS refuses to allocate or configure the socket.
    pub fn bind() -> Result<Self, SinkError> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_broadcast(true)?;
        socket.set_multicast_loop_v4(true)?;

        let addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], 0));
        socket.bind(&addr.into())?;
        socket.set_nonblocking(true)?;

        let socket = UdpSocket::from_std(socket.into())?;
        debug!("outbound discovery socket bound on {:?}", socket.local_addr());
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl DatagramSink for UdpDatagramSender {
    async fn send_to(&self, payload: &[u8], target: SocketAddrV4) -> io::Result<usize> {
        self.socket.send_to(payload, SocketAddr::V4(target)).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bind_creates_socket_on_ephemeral_port() {
        // Arrange / Act
        let sender = UdpDatagramSender::bind().expect("bind outbound socket");

        // Assert
        let addr = sender.local_addr().unwrap();
        assert_ne!(addr.port(), 0, "OS must assign an ephemeral port");
    }

    #[tokio::test]
    async fn test_send_to_delivers_payload_to_loopback_peer() {
        // Arrange
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_port = peer.local_addr().unwrap().port();
        let sender = UdpDatagramSender::bind().unwrap();

        // Act
        let sent = sender
            .send_to(b"probe", SocketAddrV4::new(Ipv4Addr::LOCALHOST, peer_port))
            .await
            .unwrap();

        // Assert
        let mut buf = [0u8; 16];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), peer.recv_from(&mut buf))
            .await
            .expect("datagram must arrive")
            .unwrap();
        assert_eq!(sent, 5);
        assert_eq!(&buf[..len], b"probe");
    }
}
