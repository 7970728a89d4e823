//! A game discovered through announcements.

use std::net::Ipv4Addr;

use lanlobby_setup::GameInfo;

/// A game as the lobby knows it: a name, the host's setup, and when the
/// host last announced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanGameInfo {
    pub name: String,
    pub info: GameInfo,
    /// The game was reached by address rather than found by broadcast.
    pub is_direct_connect: bool,
    /// Engine-clock milliseconds of the last announcement.
    pub last_heard: u64,
}

impl LanGameInfo {
    pub fn new(name: impl Into<String>, info: GameInfo, is_direct_connect: bool, now_ms: u64) -> Self {
        Self {
            name: name.into(),
            info,
            is_direct_connect,
            last_heard: now_ms,
        }
    }

    pub fn host_ip(&self) -> Option<Ipv4Addr> {
        self.info.host_ip()
    }

    pub fn host_name(&self) -> &str {
        self.info.slot(0).map_or("", |slot| slot.name())
    }

    pub fn is_in_progress(&self) -> bool {
        self.info.is_in_progress()
    }

    /// Whether someone could still take a seat.
    pub fn is_joinable(&self) -> bool {
        !self.info.is_in_progress() && self.info.first_open_slot().is_some()
    }
}
