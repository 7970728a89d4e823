//! The roster: every player and game heard from recently.
//!
//! # Concurrency note
//!
//! `Roster` uses plain `HashMap`s and is not shared between tasks. The
//! engine that owns it is driven from a single update loop, so nothing
//! here needs a lock.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::{LanGameInfo, LanPlayer, PlayerUpdate, RosterError};

/// What recording a game announcement did to the game list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameUpdate {
    Added,
    Updated,
}

/// Lobby players keyed by address and discovered games keyed by name.
///
/// ## Lifecycle
///
/// ```text
/// announce ──→ upsert_*() ──→ (announcements keep refreshing last_heard)
///                                   │
///                                   ▼ (silent for longer than max_age)
///                             expire_*() ──→ removed, returned to caller
/// ```
#[derive(Debug, Default)]
pub struct Roster {
    players: HashMap<Ipv4Addr, LanPlayer>,
    games: HashMap<String, LanGameInfo>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everyone. Used when leaving the lobby.
    pub fn clear(&mut self) {
        self.players.clear();
        self.games.clear();
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Records a player announcement.
    pub fn upsert_player(&mut self, player: LanPlayer) -> PlayerUpdate {
        let ip = player.ip;
        match self.players.get_mut(&ip) {
            None => {
                tracing::debug!(%ip, name = %player.name, "player joined lobby");
                self.players.insert(ip, player);
                PlayerUpdate::Added
            }
            Some(existing) if existing.name != player.name => {
                let old_name = std::mem::replace(existing, player).name;
                tracing::debug!(%ip, %old_name, new_name = %existing.name, "player renamed");
                PlayerUpdate::Renamed { old_name }
            }
            Some(existing) => {
                existing.login = player.login;
                existing.host = player.host;
                existing.last_heard = player.last_heard;
                PlayerUpdate::Refreshed
            }
        }
    }

    /// Refreshes a player's liveness. Returns `false` for an unknown address.
    pub fn touch_player(&mut self, ip: Ipv4Addr, now_ms: u64) -> bool {
        match self.players.get_mut(&ip) {
            Some(player) => {
                player.last_heard = now_ms;
                true
            }
            None => false,
        }
    }

    pub fn remove_player(&mut self, ip: Ipv4Addr) -> Option<LanPlayer> {
        let removed = self.players.remove(&ip);
        if let Some(player) = &removed {
            tracing::debug!(%ip, name = %player.name, "player left lobby");
        }
        removed
    }

    pub fn player(&self, ip: Ipv4Addr) -> Option<&LanPlayer> {
        self.players.get(&ip)
    }

    /// Finds a player by name, ignoring case.
    pub fn player_by_name(&self, name: &str) -> Option<&LanPlayer> {
        let wanted = name.to_lowercase();
        self.players
            .values()
            .find(|p| p.name.to_lowercase() == wanted)
    }

    /// Players ordered by name, ignoring case.
    pub fn players(&self) -> Vec<&LanPlayer> {
        let mut players: Vec<_> = self.players.values().collect();
        players.sort_by_cached_key(|p| (p.name.to_lowercase(), p.ip));
        players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Removes every player not heard from within `max_age_ms`.
    ///
    /// Returns the removed players so the caller can report them.
    pub fn expire_players(&mut self, now_ms: u64, max_age_ms: u64) -> Vec<LanPlayer> {
        let stale: Vec<Ipv4Addr> = self
            .players
            .values()
            .filter(|p| is_stale(p.last_heard, now_ms, max_age_ms))
            .map(|p| p.ip)
            .collect();
        let expired: Vec<LanPlayer> = stale
            .into_iter()
            .filter_map(|ip| self.players.remove(&ip))
            .collect();
        for player in &expired {
            tracing::info!(ip = %player.ip, name = %player.name, "player expired");
        }
        expired
    }

    // -----------------------------------------------------------------------
    // Games
    // -----------------------------------------------------------------------

    /// Records a game announcement.
    ///
    /// # Errors
    /// [`RosterError::NoHost`] if slot 0 is not a human,
    /// [`RosterError::GameNameTaken`] if a different host already owns
    /// the name.
    pub fn upsert_game(&mut self, game: LanGameInfo) -> Result<GameUpdate, RosterError> {
        let Some(host) = game.host_ip() else {
            return Err(RosterError::NoHost(game.name));
        };
        match self.games.get_mut(&game.name) {
            Some(existing) => {
                let owner = existing.host_ip();
                if owner != Some(host) {
                    return Err(RosterError::GameNameTaken {
                        name: game.name,
                        owner: owner.unwrap_or(Ipv4Addr::UNSPECIFIED),
                    });
                }
                *existing = game;
                Ok(GameUpdate::Updated)
            }
            None => {
                tracing::debug!(name = %game.name, %host, "game discovered");
                self.games.insert(game.name.clone(), game);
                Ok(GameUpdate::Added)
            }
        }
    }

    pub fn game(&self, name: &str) -> Option<&LanGameInfo> {
        self.games.get(name)
    }

    pub fn game_mut(&mut self, name: &str) -> Option<&mut LanGameInfo> {
        self.games.get_mut(name)
    }

    /// The game hosted at `ip`, if any.
    pub fn game_by_host(&self, ip: Ipv4Addr) -> Option<&LanGameInfo> {
        self.games.values().find(|g| g.host_ip() == Some(ip))
    }

    /// Refreshes the liveness of the game hosted at `ip`. Returns `false`
    /// if that address hosts nothing we know of.
    pub fn touch_game_by_host(&mut self, ip: Ipv4Addr, now_ms: u64) -> bool {
        match self.games.values_mut().find(|g| g.host_ip() == Some(ip)) {
            Some(game) => {
                game.last_heard = now_ms;
                true
            }
            None => false,
        }
    }

    pub fn remove_game(&mut self, name: &str) -> Option<LanGameInfo> {
        let removed = self.games.remove(name);
        if removed.is_some() {
            tracing::debug!(%name, "game removed");
        }
        removed
    }

    /// Games ordered by name, ignoring case.
    pub fn games(&self) -> Vec<&LanGameInfo> {
        let mut games: Vec<_> = self.games.values().collect();
        games.sort_by_cached_key(|g| (g.name.to_lowercase(), g.name.clone()));
        games
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    /// Removes every game not announced within `max_age_ms`, except the
    /// one named `keep` (the game this participant is in).
    pub fn expire_games(
        &mut self,
        now_ms: u64,
        max_age_ms: u64,
        keep: Option<&str>,
    ) -> Vec<LanGameInfo> {
        let stale: Vec<String> = self
            .games
            .values()
            .filter(|g| Some(g.name.as_str()) != keep)
            .filter(|g| is_stale(g.last_heard, now_ms, max_age_ms))
            .map(|g| g.name.clone())
            .collect();
        let expired: Vec<LanGameInfo> = stale
            .into_iter()
            .filter_map(|name| self.games.remove(&name))
            .collect();
        for game in &expired {
            tracing::info!(name = %game.name, "game expired");
        }
        expired
    }
}

fn is_stale(last_heard: u64, now_ms: u64, max_age_ms: u64) -> bool {
    last_heard.saturating_add(max_age_ms) < now_ms
}

// =========================================================================
// Tests
// =========================================================================
