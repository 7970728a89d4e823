//! Error types for the roster.

use std::net::Ipv4Addr;

/// Errors raised while recording announcements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    /// Another host already announced a game with this name.
    ///
    /// Game names are the lobby's key, so the first announcer keeps the
    /// name until their game ages out.
    #[error("game {name:?} is already hosted by {owner}")]
    GameNameTaken { name: String, owner: Ipv4Addr },

    /// An announcement for a game without a human in slot 0.
    #[error("game {0:?} has no host")]
    NoHost(String),
}
