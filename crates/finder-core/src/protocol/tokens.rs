//! The literal byte tokens exchanged between the finder and a peer.
//!
//! There is no framing, length prefix, or encoding: a datagram (or a single
//! TCP read) either *is* one of these byte strings or it is ignored.
//!
//! ```text
//! Finder                               Peer
//! ──────                               ────
//! "Hello, Device! From Finder!"  ──►   (broadcast / sweep / direct probe)
//!                                ◄──   "heartbeat"   (UDP or TCP)
//! "EXIT"                         ──►   peer stops retrying
//! ```

/// Liveness probe sent by the peer to the listener.
pub const HEARTBEAT: &[u8] = b"heartbeat";

/// Discovery payload pushed out by every discovery strategy.
pub const DISCOVERY_PROBE: &[u8] = b"Hello, Device! From Finder!";

/// Confirmation reply telling the peer to stop retrying.
pub const EXIT: &[u8] = b"EXIT";

/// One of the three protocol tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Heartbeat,
    DiscoveryProbe,
    Exit,
}

impl Token {
    /// Classifies a raw payload by exact byte equality.
    ///
    /// Returns `None` for anything that is not byte-for-byte one of the tokens;
    /// no trimming or case folding is applied, so `b"heartbeat\n"` is unknown.
    pub fn classify(payload: &[u8]) -> Option<Token> {
        [Token::Heartbeat, Token::DiscoveryProbe, Token::Exit]
            .into_iter()
            .find(|token| token.as_bytes() == payload)
    }

    /// The bytes written on the wire for this token.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Token::Heartbeat => HEARTBEAT,
            Token::DiscoveryProbe => DISCOVERY_PROBE,
            Token::Exit => EXIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_recognises_each_token() {
        assert_eq!(Token::classify(b"heartbeat"), Some(Token::Heartbeat));
        assert_eq!(
            Token::classify(b"Hello, Device! From Finder!"),
            Some(Token::DiscoveryProbe)
        );
        assert_eq!(Token::classify(b"EXIT"), Some(Token::Exit));
    }

    #[test]
    fn test_classify_is_exact_byte_comparison() {
        // Trailing newline, case change, and prefix must all be rejected.
        assert_eq!(Token::classify(b"heartbeat\n"), None);
        assert_eq!(Token::classify(b"HEARTBEAT"), None);
        assert_eq!(Token::classify(b"heart"), None);
        assert_eq!(Token::classify(b"exit"), None);
    }

    #[test]
    fn test_classify_empty_payload_is_unknown() {
        assert_eq!(Token::classify(b""), None);
    }

    #[test]
    fn test_as_bytes_matches_constants() {
        assert_eq!(Token::Heartbeat.as_bytes(), HEARTBEAT);
        assert_eq!(Token::DiscoveryProbe.as_bytes(), DISCOVERY_PROBE);
        assert_eq!(Token::Exit.as_bytes(), EXIT);
    }
}
