//! Setup limits and shared sentinels.

use serde::{Deserialize, Serialize};

/// Number of seats in every game.
pub const MAX_SLOTS: usize = 8;

/// Highest team number plus one. Teams pair up at most half the seats.
pub const MAX_TEAMS: i32 = (MAX_SLOTS / 2) as i32;

/// "Random" / "not chosen" for colour, start position and team.
pub const UNSET: i32 = -1;

/// Player template meaning "pick a faction at random".
pub const TEMPLATE_RANDOM: i32 = -1;

/// Player template for a spectator. The lowest legal template value.
pub const TEMPLATE_OBSERVER: i32 = -2;

// ---------------------------------------------------------------------------
// SetupLimits
// ---------------------------------------------------------------------------

/// Catalogue sizes every participant must agree on.
///
/// These come from game data (the colour table and the faction list)
/// rather than from the protocol, so they are configured rather than
/// hard-coded. A value outside these bounds in a received options string
/// makes the whole string invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupLimits {
    /// Number of selectable player colours.
    pub num_colors: i32,

    /// Number of selectable player templates (factions).
    pub num_templates: i32,
}

impl Default for SetupLimits {
    fn default() -> Self {
        Self {
            num_colors: 8,
            num_templates: 12,
        }
    }
}

impl SetupLimits {
    /// Forces both counts to at least 1.
    pub fn validated(mut self) -> Self {
        if self.num_colors < 1 {
            tracing::warn!(num_colors = self.num_colors, "num_colors must be positive, using 1");
            self.num_colors = 1;
        }
        if self.num_templates < 1 {
            tracing::warn!(
                num_templates = self.num_templates,
                "num_templates must be positive, using 1"
            );
            self.num_templates = 1;
        }
        self
    }

    pub fn color_in_range(&self, color: i32) -> bool {
        (UNSET..self.num_colors).contains(&color)
    }

    pub fn template_in_range(&self, template: i32) -> bool {
        (TEMPLATE_OBSERVER..self.num_templates).contains(&template)
    }

    pub fn start_position_in_range(&self, start: i32) -> bool {
        (UNSET..MAX_SLOTS as i32).contains(&start)
    }

    pub fn team_in_range(&self, team: i32) -> bool {
        (UNSET..MAX_TEAMS).contains(&team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_default() {
        let limits = SetupLimits::default();
        assert_eq!(limits.num_colors, 8);
        assert_eq!(limits.num_templates, 12);
    }

    #[test]
    fn test_limits_validated_clamps_non_positive() {
        let limits = SetupLimits {
            num_colors: 0,
            num_templates: -3,
        }
        .validated();
        assert_eq!(limits.num_colors, 1);
        assert_eq!(limits.num_templates, 1);
    }

    #[test]
    fn test_ranges() {
        let limits = SetupLimits::default();
        assert!(limits.color_in_range(UNSET));
        assert!(limits.color_in_range(7));
        assert!(!limits.color_in_range(8));
        assert!(!limits.color_in_range(-2));

        assert!(limits.template_in_range(TEMPLATE_OBSERVER));
        assert!(limits.template_in_range(11));
        assert!(!limits.template_in_range(12));
        assert!(!limits.template_in_range(-3));

        assert!(limits.start_position_in_range(7));
        assert!(!limits.start_position_in_range(8));

        assert!(limits.team_in_range(3));
        assert!(!limits.team_in_range(4));
    }

    #[test]
    fn test_limits_serde_round_trip() {
        let limits = SetupLimits {
            num_colors: 10,
            num_templates: 9,
        };
        let json = serde_json::to_string(&limits).unwrap();
        let back: SetupLimits = serde_json::from_str(&json).unwrap();
        assert_eq!(back, limits);
    }
}
