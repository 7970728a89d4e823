//! Datagram transport layer for lanlobby.
//!
//! The lobby protocol is connectionless: every participant binds the same
//! UDP port, broadcasts presence to the whole segment, and answers specific
//! peers by unicast. This crate hides the socket behind the [`Transport`]
//! trait so the protocol engine can be driven over a real network or over
//! an in-process [`MemoryNetwork`] in tests.
//!
//! The engine is frame-driven, so the trait is deliberately non-blocking:
//! sends are fire-and-forget and [`Transport::poll_recv`] returns `Ok(None)`
//! when nothing is queued.
//!
//! # Feature Flags
//!
//! - `udp` (default): [`UdpTransport`] over a `tokio` UDP socket

mod error;
mod memory;
#[cfg(feature = "udp")]
mod udp;

pub use error::TransportError;
pub use memory::{MemoryNetwork, MemoryTransport};
#[cfg(feature = "udp")]
pub use udp::UdpTransport;

use std::fmt;
use std::net::Ipv4Addr;

/// Largest payload a transport will carry in one datagram.
///
/// Ethernet MTU (1500) minus the IPv4 and UDP headers. Anything larger
/// would fragment, and fragmented broadcasts are routinely dropped.
pub const MAX_DATAGRAM_SIZE: usize = 1472;

/// Where an outbound datagram is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Every participant on the segment, including the sender.
    Broadcast,
    /// A single participant.
    Unicast(Ipv4Addr),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast => write!(f, "broadcast"),
            Self::Unicast(ip) => write!(f, "{ip}"),
        }
    }
}

/// A datagram received from a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// IPv4 address of the sender.
    pub from: Ipv4Addr,
    /// Raw payload bytes.
    pub data: Vec<u8>,
}

/// A non-blocking datagram endpoint.
pub trait Transport: Send + 'static {
    /// The address other participants see this endpoint as.
    fn local_ip(&self) -> Ipv4Addr;

    /// Queues a datagram for delivery.
    ///
    /// Delivery is best-effort. Back-pressure from the OS is not an error:
    /// the datagram is dropped and the call returns `Ok`.
    ///
    /// # Errors
    /// Returns [`TransportError::TooLarge`] if `data` exceeds
    /// [`MAX_DATAGRAM_SIZE`], or [`TransportError::SendFailed`] on a hard
    /// socket failure.
    fn send(&mut self, to: Destination, data: &[u8]) -> Result<(), TransportError>;

    /// Returns the next queued datagram, or `None` when nothing is waiting.
    ///
    /// # Errors
    /// Returns [`TransportError::ReceiveFailed`] on a hard socket failure.
    fn poll_recv(&mut self) -> Result<Option<Datagram>, TransportError>;
}

pub(crate) fn check_size(data: &[u8]) -> Result<(), TransportError> {
    if data.len() > MAX_DATAGRAM_SIZE {
        return Err(TransportError::TooLarge {
            size: data.len(),
            max: MAX_DATAGRAM_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_display() {
        assert_eq!(Destination::Broadcast.to_string(), "broadcast");
        let unicast = Destination::Unicast(Ipv4Addr::new(192, 168, 1, 7));
        assert_eq!(unicast.to_string(), "192.168.1.7");
    }

    #[test]
    fn test_check_size_accepts_limit() {
        let data = vec![0u8; MAX_DATAGRAM_SIZE];
        assert!(check_size(&data).is_ok());
    }

    #[test]
    fn test_check_size_rejects_oversized() {
        let data = vec![0u8; MAX_DATAGRAM_SIZE + 1];
        let err = check_size(&data).unwrap_err();
        assert!(matches!(
            err,
            TransportError::TooLarge { size, max } if size == MAX_DATAGRAM_SIZE + 1 && max == MAX_DATAGRAM_SIZE
        ));
    }
}
