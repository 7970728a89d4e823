//! The engine's collaborators.
//!
//! The engine never draws anything, never touches the map directory and
//! never runs a match. It asks three narrow questions of whoever embeds
//! it:
//!
//! - [`LobbyEvents`]: "this happened, re-render". Every callback has an
//!   empty default so a frontend only implements what it shows.
//! - [`MapCache`]: "do you have this map, at this checksum?"
//! - [`GameBootstrap`]: "start the match with this setup and seed".
//!
//! [`LobbyFrontend`] bundles the three so the engine owns a single
//! collaborator value.

use std::net::Ipv4Addr;

use lanlobby_protocol::{ChatKind, ReturnCode};
use lanlobby_roster::{LanGameInfo, LanPlayer};
use lanlobby_setup::GameInfo;

/// Notifications from the engine, all delivered from inside `update()` or
/// a `request_*` call.
#[allow(unused_variables)]
pub trait LobbyEvents {
    /// The visible game list changed.
    fn on_game_list(&mut self, games: &[&LanGameInfo]) {}

    /// The lobby player list changed.
    fn on_player_list(&mut self, players: &[&LanPlayer]) {}

    /// Outcome of `request_game_create`.
    fn on_game_create(&mut self, result: ReturnCode) {}

    /// Outcome of a join request. `game` is set only on success.
    fn on_game_join(&mut self, result: ReturnCode, game: Option<&LanGameInfo>) {}

    /// Someone took a seat in the current game.
    fn on_player_join(&mut self, slot: usize, name: &str) {}

    /// Someone left the current game. Called with the local name when
    /// this participant leaves.
    fn on_player_leave(&mut self, name: &str) {}

    /// The host of the current game left or stopped responding. The
    /// engine is back in the lobby when this fires.
    fn on_host_leave(&mut self) {}

    /// The slot list of the current game changed.
    fn on_slot_list(&mut self, game: &GameInfo) {}

    fn on_accept(&mut self, ip: Ipv4Addr, accepted: bool) {}

    fn on_has_map(&mut self, ip: Ipv4Addr, has_map: bool) {}

    /// A chat line. System lines come from the engine itself and carry
    /// the local address.
    fn on_chat(&mut self, name: &str, ip: Ipv4Addr, text: &str, kind: ChatKind) {}

    /// The setup was updated by `ip`, who sits in `slot`.
    fn on_game_options(&mut self, ip: Ipv4Addr, slot: usize, options: &str) {}

    fn on_game_start_timer(&mut self, seconds: i32) {}

    /// The match is starting. The simulation has been handed the setup
    /// when this fires.
    fn on_game_start(&mut self) {}

    /// A lobby player changed names, or a rename of the local player was
    /// refused (the current name is reported back).
    fn on_name_change(&mut self, ip: Ipv4Addr, name: &str) {}

    /// A participant switched away from the game window.
    fn on_inactive(&mut self, ip: Ipv4Addr) {}

    /// The match started but the map isn't present. The engine has left
    /// the game.
    fn on_map_transfer_failed(&mut self, map: &str) {}
}

/// What the local map cache knows about one map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapMetadata {
    pub crc: u32,
    pub size: u32,
    /// Seats the map provides.
    pub num_players: usize,
}

/// Lookup into the local map collection.
pub trait MapCache {
    fn find_map(&self, path: &str) -> Option<MapMetadata>;

    /// Whether the map at `path` is present with checksum `crc`.
    fn has_map(&self, path: &str, crc: u32) -> bool {
        self.find_map(path).is_some_and(|meta| meta.crc == crc)
    }
}

/// Hands a frozen setup over to the match.
pub trait GameBootstrap {
    fn start_simulation(&mut self, game: &GameInfo, seed: i32);
}

/// Everything the engine calls out to.
pub trait LobbyFrontend: LobbyEvents + MapCache + GameBootstrap + Send + 'static {}

impl<T> LobbyFrontend for T where T: LobbyEvents + MapCache + GameBootstrap + Send + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneMap;

    impl MapCache for OneMap {
        fn find_map(&self, path: &str) -> Option<MapMetadata> {
            (path == "maps/alpine").then_some(MapMetadata {
                crc: 0xBEEF,
                size: 100,
                num_players: 4,
            })
        }
    }

    #[test]
    fn test_has_map_checks_crc() {
        assert!(OneMap.has_map("maps/alpine", 0xBEEF));
        assert!(!OneMap.has_map("maps/alpine", 0xBEEE));
        assert!(!OneMap.has_map("maps/desert", 0xBEEF));
    }
}
