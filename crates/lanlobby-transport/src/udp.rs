//! UDP broadcast transport using `tokio`.
//!
//! The socket is registered with the tokio reactor but only ever touched
//! through the `try_*` calls, so the engine's frame loop never awaits on
//! network I/O. Readiness is refreshed whenever the runtime parks between
//! frames.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket as StdUdpSocket};

use tokio::net::UdpSocket;

use crate::{check_size, Datagram, Destination, Transport, TransportError, MAX_DATAGRAM_SIZE};

/// A [`Transport`] bound to a UDP port on every interface.
pub struct UdpTransport {
    socket: UdpSocket,
    local_ip: Ipv4Addr,
    port: u16,
    broadcast_addr: Ipv4Addr,
    buf: Vec<u8>,
}

impl UdpTransport {
    /// Binds `0.0.0.0:port` with broadcast enabled.
    ///
    /// The advertised local address is discovered from the routing table.
    /// Use [`bind_with_ip`](Self::bind_with_ip) on multi-homed machines.
    pub async fn bind(port: u16) -> Result<Self, TransportError> {
        let local_ip = discover_local_ip().unwrap_or(Ipv4Addr::LOCALHOST);
        Self::bind_with_ip(local_ip, port).await
    }

    /// Binds `0.0.0.0:port`, advertising `local_ip` as this endpoint.
    pub async fn bind_with_ip(local_ip: Ipv4Addr, port: u16) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(TransportError::BindFailed)?;
        socket.set_broadcast(true).map_err(TransportError::BindFailed)?;
        let port = socket
            .local_addr()
            .map_err(TransportError::BindFailed)?
            .port();
        tracing::info!(%local_ip, port, "UDP transport bound");
        Ok(Self {
            socket,
            local_ip,
            port,
            broadcast_addr: Ipv4Addr::BROADCAST,
            buf: vec![0; MAX_DATAGRAM_SIZE],
        })
    }

    /// Overrides the broadcast address (defaults to `255.255.255.255`).
    ///
    /// Useful for directed broadcast such as `192.168.1.255`.
    pub fn with_broadcast_addr(mut self, addr: Ipv4Addr) -> Self {
        self.broadcast_addr = addr;
        self
    }

    /// The port the socket is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Transport for UdpTransport {
    fn local_ip(&self) -> Ipv4Addr {
        self.local_ip
    }

    fn send(&mut self, to: Destination, data: &[u8]) -> Result<(), TransportError> {
        check_size(data)?;
        let ip = match to {
            Destination::Broadcast => self.broadcast_addr,
            Destination::Unicast(ip) => ip,
        };
        let target = SocketAddr::V4(SocketAddrV4::new(ip, self.port));
        match self.socket.try_send_to(data, target) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                tracing::debug!(%to, len = data.len(), "send buffer full, datagram dropped");
                Ok(())
            }
            Err(source) => Err(TransportError::SendFailed { to, source }),
        }
    }

    fn poll_recv(&mut self) -> Result<Option<Datagram>, TransportError> {
        loop {
            match self.socket.try_recv_from(&mut self.buf) {
                Ok((len, SocketAddr::V4(from))) => {
                    return Ok(Some(Datagram {
                        from: *from.ip(),
                        data: self.buf[..len].to_vec(),
                    }));
                }
                // IPv6 senders cannot take part in an IPv4 lobby.
                Ok((_, SocketAddr::V6(_))) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                // Windows reports ICMP port-unreachable from an earlier send here.
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(e) => return Err(TransportError::ReceiveFailed(e)),
            }
        }
    }
}

/// Finds the address of the interface carrying the default route.
///
/// Connecting a UDP socket sends nothing; it only asks the kernel to pick
/// a source address.
fn discover_local_ip() -> Option<Ipv4Addr> {
    let socket = StdUdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect(SocketAddrV4::new(Ipv4Addr::new(10, 255, 255, 255), 9)).ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) if !addr.ip().is_unspecified() => Some(*addr.ip()),
        _ => None,
    }
}
