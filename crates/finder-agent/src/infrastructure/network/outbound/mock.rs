//! Recording datagram sink for unit and integration tests.
//!
//! Captures every send instead of writing to a socket, so tests can assert
//! exactly which addresses a strategy targeted and how many times.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::DatagramSink;

/// One captured send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    pub payload: Vec<u8>,
    pub target: SocketAddrV4,
}

/// A [`DatagramSink`] that records instead of sending.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SentDatagram>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every send fails with `NetworkUnreachable` after recording.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of sends addressed to `ip` (any port).
    pub fn count_to(&self, ip: Ipv4Addr) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| *d.target.ip() == ip)
            .count()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[async_trait]
impl DatagramSink for RecordingSink {
    async fn send_to(&self, payload: &[u8], target: SocketAddrV4) -> io::Result<usize> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentDatagram {
                payload: payload.to_vec(),
                target,
            });
        if self.fail {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "recording sink configured to fail",
            ));
        }
        Ok(payload.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_sink_captures_sends() {
        // Arrange
        let sink = RecordingSink::new();
        let target = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 7), 9910);

        // Act
        let n = sink.send_to(b"abc", target).await.unwrap();

        // Assert
        assert_eq!(n, 3);
        assert_eq!(
            sink.sent(),
            vec![SentDatagram {
                payload: b"abc".to_vec(),
                target
            }]
        );
        assert_eq!(sink.count_to(Ipv4Addr::new(10, 0, 0, 7)), 1);
    }

    #[tokio::test]
    async fn test_failing_sink_records_then_errors() {
        let sink = RecordingSink::failing();
        let target = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 7), 9910);

        let result = sink.send_to(b"abc", target).await;

        assert!(result.is_err());
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn test_clear_empties_the_log() {
        let sink = RecordingSink::new();
        sink.send_to(b"x", SocketAddrV4::new(Ipv4Addr::LOCALHOST, 1))
            .await
            .unwrap();

        sink.clear();

        assert_eq!(sink.count(), 0);
    }
}
