//! A player seen in the lobby.

use std::net::Ipv4Addr;

use lanlobby_setup::sanitize_name;

/// Someone who announced themselves on the lobby port.
///
/// Players are keyed by address: a machine has exactly one lobby
/// identity at a time, and a new name from the same address is a rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanPlayer {
    pub ip: Ipv4Addr,
    pub name: String,
    pub login: String,
    pub host: String,
    /// Engine-clock milliseconds of the last packet from this player.
    pub last_heard: u64,
}

impl LanPlayer {
    pub fn new(
        ip: Ipv4Addr,
        name: &str,
        login: impl Into<String>,
        host: impl Into<String>,
        now_ms: u64,
    ) -> Self {
        Self {
            ip,
            name: sanitize_name(name),
            login: login.into(),
            host: host.into(),
            last_heard: now_ms,
        }
    }
}

/// What recording an announcement did to the player list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerUpdate {
    /// First time this address was heard from.
    Added,
    /// Known address, new name.
    Renamed { old_name: String },
    /// Nothing changed except the liveness timestamp.
    Refreshed,
}
