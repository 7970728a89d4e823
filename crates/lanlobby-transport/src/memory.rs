//! In-process broadcast domain.
//!
//! A [`MemoryNetwork`] behaves like a single LAN segment: every endpoint
//! that joins it gets its own inbound queue, a broadcast lands in every
//! queue (the sender's included, as with real UDP broadcast loopback), and
//! a unicast to an address nobody holds disappears silently.
//!
//! Links can be taken down to simulate a peer that has gone quiet, which
//! is how the liveness tests exercise host and player drop-out.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{check_size, Datagram, Destination, Transport, TransportError};

#[derive(Debug, Default)]
struct Segment {
    queues: HashMap<Ipv4Addr, VecDeque<Datagram>>,
    /// Endpoints whose traffic is dropped in both directions.
    down: HashSet<Ipv4Addr>,
}

/// A shared, cloneable handle to one simulated segment.
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    segment: Arc<Mutex<Segment>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a new endpoint at `ip`.
    ///
    /// Attaching the same address twice replaces the earlier queue.
    pub fn join(&self, ip: Ipv4Addr) -> MemoryTransport {
        self.lock().queues.insert(ip, VecDeque::new());
        tracing::debug!(%ip, "endpoint joined memory network");
        MemoryTransport {
            ip,
            network: self.clone(),
        }
    }

    /// Takes the link for `ip` down (or back up).
    ///
    /// While down, nothing `ip` sends is delivered and nothing addressed
    /// to it is queued.
    pub fn set_link_down(&self, ip: Ipv4Addr, down: bool) {
        let mut segment = self.lock();
        if down {
            segment.down.insert(ip);
        } else {
            segment.down.remove(&ip);
        }
    }

    /// Number of datagrams waiting in `ip`'s inbound queue.
    pub fn pending(&self, ip: Ipv4Addr) -> usize {
        self.lock().queues.get(&ip).map_or(0, VecDeque::len)
    }

    fn lock(&self) -> MutexGuard<'_, Segment> {
        // A panicking test thread must not wedge every other endpoint.
        self.segment.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn deliver(&self, from: Ipv4Addr, to: Destination, data: &[u8]) {
        let mut segment = self.lock();
        if segment.down.contains(&from) {
            return;
        }
        let Segment { queues, down } = &mut *segment;
        match to {
            Destination::Broadcast => {
                for (ip, queue) in queues.iter_mut() {
                    if !down.contains(ip) {
                        queue.push_back(Datagram {
                            from,
                            data: data.to_vec(),
                        });
                    }
                }
            }
            Destination::Unicast(ip) => {
                if down.contains(&ip) {
                    return;
                }
                if let Some(queue) = queues.get_mut(&ip) {
                    queue.push_back(Datagram {
                        from,
                        data: data.to_vec(),
                    });
                }
            }
        }
    }

    fn take(&self, ip: Ipv4Addr) -> Option<Datagram> {
        self.lock().queues.get_mut(&ip)?.pop_front()
    }
}

/// One endpoint on a [`MemoryNetwork`].
#[derive(Debug)]
pub struct MemoryTransport {
    ip: Ipv4Addr,
    network: MemoryNetwork,
}

impl MemoryTransport {
    /// The network this endpoint is attached to.
    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }
}

impl Transport for MemoryTransport {
    fn local_ip(&self) -> Ipv4Addr {
        self.ip
    }

    fn send(&mut self, to: Destination, data: &[u8]) -> Result<(), TransportError> {
        check_size(data)?;
        self.network.deliver(self.ip, to, data);
        Ok(())
    }

    fn poll_recv(&mut self) -> Result<Option<Datagram>, TransportError> {
        Ok(self.network.take(self.ip))
    }
}
