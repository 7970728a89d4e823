//! The local preference file.
//!
//! A handful of `key=value` lines remembering what the player picked last
//! time:
//!
//! ```text
//! # written by lanlobby
//! UserName=Ann
//! Color=3
//! PlayerTemplate=-1
//! Map=maps/alpine assault/alpine assault.map
//! StartingCash=10000
//! SuperweaponRestrict=0
//! ```
//!
//! Keys this module doesn't know are kept and written back unchanged, so
//! other tools can share the file.

use std::fs;
use std::io;
use std::path::Path;

use lanlobby_setup::{DEFAULT_STARTING_CASH, UNSET};

use crate::PrefsError;

const USER_NAME: &str = "UserName";
const COLOR: &str = "Color";
const PLAYER_TEMPLATE: &str = "PlayerTemplate";
const MAP: &str = "Map";
const STARTING_CASH: &str = "StartingCash";
const SUPERWEAPON_RESTRICT: &str = "SuperweaponRestrict";

/// Preference lines in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanPreferences {
    entries: Vec<(String, String)>,
}

impl LanPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `path`. A missing file yields empty preferences.
    ///
    /// # Errors
    /// [`PrefsError::Read`] if the file exists but can't be read,
    /// [`PrefsError::Malformed`] for a line without `=`.
    pub fn load(path: &Path) -> Result<Self, PrefsError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no preference file, using defaults");
                Ok(Self::new())
            }
            Err(source) => Err(PrefsError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(text: &str) -> Result<Self, PrefsError> {
        let mut prefs = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(PrefsError::Malformed {
                    line: index + 1,
                    text: raw.to_string(),
                });
            };
            prefs.set(key.trim(), value.trim());
        }
        Ok(prefs)
    }

    /// Writes every entry to `path`, replacing the file.
    pub fn save(&self, path: &Path) -> Result<(), PrefsError> {
        fs::write(path, self.to_string()).map_err(|source| PrefsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `key`, keeping its position if it already exists.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    fn get_parsed<N: std::str::FromStr>(&self, key: &str) -> Option<N> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    // -----------------------------------------------------------------------
    // Typed accessors
    // -----------------------------------------------------------------------

    pub fn user_name(&self) -> Option<&str> {
        self.get(USER_NAME).filter(|name| !name.is_empty())
    }

    pub fn set_user_name(&mut self, name: &str) {
        self.set(USER_NAME, name);
    }

    pub fn color(&self) -> i32 {
        self.get_parsed(COLOR).unwrap_or(UNSET)
    }

    pub fn set_color(&mut self, color: i32) {
        self.set(COLOR, color.to_string());
    }

    pub fn player_template(&self) -> i32 {
        self.get_parsed(PLAYER_TEMPLATE).unwrap_or(UNSET)
    }

    pub fn set_player_template(&mut self, template: i32) {
        self.set(PLAYER_TEMPLATE, template.to_string());
    }

    pub fn map(&self) -> Option<&str> {
        self.get(MAP).filter(|map| !map.is_empty())
    }

    pub fn set_map(&mut self, path: &str) {
        self.set(MAP, path);
    }

    pub fn starting_cash(&self) -> u32 {
        self.get_parsed(STARTING_CASH)
            .unwrap_or(DEFAULT_STARTING_CASH)
    }

    pub fn set_starting_cash(&mut self, cash: u32) {
        self.set(STARTING_CASH, cash.to_string());
    }

    pub fn superweapon_restriction(&self) -> u16 {
        self.get_parsed(SUPERWEAPON_RESTRICT).unwrap_or(0)
    }

    pub fn set_superweapon_restriction(&mut self, restriction: u16) {
        self.set(SUPERWEAPON_RESTRICT, restriction.to_string());
    }
}

impl std::fmt::Display for LanPreferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_keeps_unknown_keys() {
        let prefs = LanPreferences::parse(
            "# header\n\nUserName = Ann\nColor=3\nFavouriteUnit=tank\nMap=maps/alpine\n",
        )
        .unwrap();
        assert_eq!(prefs.user_name(), Some("Ann"));
        assert_eq!(prefs.color(), 3);
        assert_eq!(prefs.map(), Some("maps/alpine"));
        assert_eq!(prefs.get("FavouriteUnit"), Some("tank"));
        assert_eq!(
            prefs.to_string(),
            "UserName=Ann\nColor=3\nFavouriteUnit=tank\nMap=maps/alpine\n"
        );
    }

    #[test]
    fn test_defaults_for_missing_or_garbled_values() {
        let prefs = LanPreferences::parse("Color=blue\n").unwrap();
        assert_eq!(prefs.color(), UNSET);
        assert_eq!(prefs.player_template(), UNSET);
        assert_eq!(prefs.starting_cash(), DEFAULT_STARTING_CASH);
        assert_eq!(prefs.superweapon_restriction(), 0);
        assert_eq!(prefs.user_name(), None);
    }

    #[test]
    fn test_malformed_line() {
        let err = LanPreferences::parse("Color=1\njunk\n").unwrap_err();
        assert!(matches!(err, PrefsError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_set_keeps_position() {
        let mut prefs = LanPreferences::parse("Color=1\nMap=a\n").unwrap();
        prefs.set_color(5);
        prefs.set_starting_cash(20_000);
        assert_eq!(prefs.to_string(), "Color=5\nMap=a\nStartingCash=20000\n");
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!(
            "lanlobby-prefs-{}.ini",
            std::process::id()
        ));
        let mut prefs = LanPreferences::new();
        prefs.set_user_name("Joe");
        prefs.set_map("maps/desert");
        prefs.save(&path).unwrap();

        let loaded = LanPreferences::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(loaded, prefs);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("lanlobby-prefs-does-not-exist.ini");
        assert_eq!(LanPreferences::load(&path).unwrap(), LanPreferences::new());
    }
}
