//! Integration tests for the UDP transport.
//!
//! These bind real sockets on the loopback interface. Each test uses its
//! own port (0 lets the OS pick) so they can run in parallel.

#[cfg(feature = "udp")]
mod udp {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use lanlobby_transport::{Destination, Transport, UdpTransport};

    /// Polls until a datagram arrives or the deadline passes.
    ///
    /// `poll_recv` never blocks, so the test yields to the runtime between
    /// attempts to let the reactor observe readiness.
    async fn recv_within(
        t: &mut UdpTransport,
        limit: Duration,
    ) -> Option<lanlobby_transport::Datagram> {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if let Some(d) = t.poll_recv().expect("recv should not fail") {
                return Some(d);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_bind_picks_port_and_reports_ip() {
        let t = UdpTransport::bind_with_ip(Ipv4Addr::LOCALHOST, 0)
            .await
            .expect("should bind");
        assert_ne!(t.port(), 0);
        assert_eq!(t.local_ip(), Ipv4Addr::LOCALHOST);
    }

    #[tokio::test]
    async fn test_poll_recv_empty_returns_none() {
        let mut t = UdpTransport::bind_with_ip(Ipv4Addr::LOCALHOST, 0)
            .await
            .expect("should bind");
        assert!(t.poll_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unicast_to_self_round_trips() {
        let mut t = UdpTransport::bind_with_ip(Ipv4Addr::LOCALHOST, 0)
            .await
            .expect("should bind");

        t.send(Destination::Unicast(Ipv4Addr::LOCALHOST), b"ping")
            .expect("send should succeed");

        let got = recv_within(&mut t, Duration::from_secs(2))
            .await
            .expect("datagram should arrive");
        assert_eq!(got.data, b"ping");
        assert_eq!(got.from, Ipv4Addr::LOCALHOST);
    }
}
