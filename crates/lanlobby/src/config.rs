//! Engine settings.

use lanlobby_setup::SetupLimits;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Everything the engine needs to know that isn't negotiated on the wire.
///
/// All durations are engine-clock milliseconds. The three drop factors are
/// multiples of `resend_interval_ms`: a peer that re-announces every resend
/// interval is only forgotten after missing several announcements in a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanConfig {
    /// UDP port every participant binds and broadcasts to.
    pub lobby_port: u16,
    /// Port written into human slots for the match itself.
    pub game_port: u16,
    pub update_interval_ms: u64,
    pub resend_interval_ms: u64,
    /// How long a join or leave may stay pending.
    pub action_timeout_ms: u64,
    pub lobby_stale_factor: u64,
    pub player_drop_factor: u64,
    pub host_drop_factor: u64,
    /// Countdown before the match starts. `0` starts immediately.
    pub start_countdown_secs: i32,
    /// Non-observer players required to start.
    pub min_players: usize,
    pub exe_crc: u32,
    pub ini_crc: u32,
    /// Whether a host refuses joiners whose build checksums differ.
    pub check_crc: bool,
    /// Local serial. Empty means the duplicate-serial check is skipped
    /// for this participant.
    pub serial: String,
    pub limits: SetupLimits,
}

impl Default for LanConfig {
    fn default() -> Self {
        Self {
            lobby_port: 8086,
            game_port: 8088,
            update_interval_ms: 200,
            resend_interval_ms: 10_000,
            action_timeout_ms: 5_000,
            lobby_stale_factor: 2,
            player_drop_factor: 8,
            host_drop_factor: 16,
            start_countdown_secs: 5,
            min_players: 2,
            exe_crc: 0,
            ini_crc: 0,
            check_crc: true,
            serial: String::new(),
            limits: SetupLimits::default(),
        }
    }
}

impl LanConfig {
    /// Fixes settings that would stall or spin the engine, warning about
    /// each correction.
    pub fn validated(mut self) -> Self {
        fix_zero(&mut self.update_interval_ms, "update_interval_ms", 1);
        fix_zero(&mut self.resend_interval_ms, "resend_interval_ms", 1);
        fix_zero(&mut self.action_timeout_ms, "action_timeout_ms", 1);
        fix_zero(&mut self.lobby_stale_factor, "lobby_stale_factor", 1);
        fix_zero(&mut self.player_drop_factor, "player_drop_factor", 1);
        fix_zero(&mut self.host_drop_factor, "host_drop_factor", 1);
        if self.start_countdown_secs < 0 {
            warn!(
                start_countdown_secs = self.start_countdown_secs,
                "negative countdown, starting immediately"
            );
            self.start_countdown_secs = 0;
        }
        self.limits = self.limits.validated();
        self
    }

    /// Lobby players and discovered games older than this are pruned.
    pub fn lobby_stale_ms(&self) -> u64 {
        self.lobby_stale_factor.saturating_mul(self.resend_interval_ms)
    }

    /// A host forgets a joiner silent for longer than this.
    pub fn player_drop_ms(&self) -> u64 {
        self.player_drop_factor.saturating_mul(self.resend_interval_ms)
    }

    /// A joiner gives up on a host silent for longer than this.
    pub fn host_drop_ms(&self) -> u64 {
        self.host_drop_factor.saturating_mul(self.resend_interval_ms)
    }
}

fn fix_zero(value: &mut u64, field: &'static str, minimum: u64) {
    if *value < minimum {
        warn!(field, value = *value, minimum, "setting too small, clamping");
        *value = minimum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LanConfig::default();
        assert_eq!(config.lobby_port, 8086);
        assert_eq!(config.lobby_stale_ms(), 20_000);
        assert_eq!(config.player_drop_ms(), 80_000);
        assert_eq!(config.host_drop_ms(), 160_000);
    }

    #[test]
    fn test_validated_clamps() {
        let config = LanConfig {
            update_interval_ms: 0,
            host_drop_factor: 0,
            start_countdown_secs: -3,
            limits: SetupLimits {
                num_colors: 0,
                num_templates: 4,
            },
            ..Default::default()
        }
        .validated();
        assert_eq!(config.update_interval_ms, 1);
        assert_eq!(config.host_drop_factor, 1);
        assert_eq!(config.start_countdown_secs, 0);
        assert_eq!(config.limits.num_colors, 1);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: LanConfig =
            serde_json::from_str(r#"{"lobby_port": 9000, "serial": "ABC"}"#).unwrap();
        assert_eq!(config.lobby_port, 9000);
        assert_eq!(config.serial, "ABC");
        assert_eq!(config.resend_interval_ms, 10_000);
    }
}
