//! Widget configuration (persisted as JSON) and process settings (TOML).

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::character::Character;

pub const DEFAULT_CHARACTER_ID: &str = "default_char";
pub const DEFAULT_CHARACTER_NAME: &str = "Little Hero";
pub const NEW_CHARACTER_NAME: &str = "New Adventurer";

pub const MIN_MAP_SCALE: f64 = 0.5;
pub const MAX_MAP_SCALE: f64 = 5.0;
pub const MIN_OPACITY: f64 = 0.1;

/// Line shown when no dialog line is available at the current affinity
pub const FALLBACK_DIALOG: &str = "Ready for adventure!";

/// Lines shown when the daily click limit is reached
pub const LIMIT_DIALOGS: [&str; 4] = [
    "That's enough for today!",
    "I need a little rest.",
    "See you tomorrow!",
    "You're making me blush...",
];

pub fn default_dialogs() -> Vec<String> {
    [
        "What adventure shall we go on today?",
        "All set!",
        "[Lv.2] I think I'm getting used to this.",
        "[Lv.5] With you, I could go anywhere!",
        "[Lv.10] We're the best partners, right?",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Split a dialog line into its affinity gate and display text.
/// `"[Lv.5] Hi"` -> `(Some(5), "Hi")`, `"Hi"` -> `(None, "Hi")`.
pub fn parse_dialog_line(line: &str) -> (Option<i32>, &str) {
    let Some(rest) = line.strip_prefix("[Lv.") else {
        return (None, line);
    };
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || !rest[digits..].starts_with(']') {
        return (None, line);
    }
    match rest[..digits].parse::<i32>() {
        Ok(level) => (Some(level), rest[digits + 1..].trim_start()),
        Err(_) => (None, line),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default = "default_characters")]
    pub characters: Vec<Character>,
    #[serde(default = "default_active_id")]
    pub active_character_id: String,
    #[serde(default)]
    pub map_image_path: Option<String>,
    #[serde(default = "default_scale")]
    pub map_scale: f64,
    #[serde(default)]
    pub is_map_tiled: bool,
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default = "default_scale")]
    pub opacity: f64,
    #[serde(default = "default_theme")]
    pub theme_color: String,
    #[serde(default = "default_dialogs")]
    pub custom_dialogs: Vec<String>,
}

fn default_characters() -> Vec<Character> {
    vec![Character::with_id(DEFAULT_CHARACTER_ID, DEFAULT_CHARACTER_NAME)]
}

fn default_active_id() -> String {
    DEFAULT_CHARACTER_ID.to_string()
}

fn default_scale() -> f64 {
    1.0
}

fn default_background() -> String {
    "#f0e6d2".to_string()
}

fn default_theme() -> String {
    "#8b5e3c".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            characters: default_characters(),
            active_character_id: default_active_id(),
            map_image_path: None,
            map_scale: default_scale(),
            is_map_tiled: false,
            background_color: default_background(),
            opacity: default_scale(),
            theme_color: default_theme(),
            custom_dialogs: default_dialogs(),
        }
    }
}

impl GlobalConfig {
    /// Fix up a loaded config so the rest of the app can rely on it:
    /// at least one character, a valid active id, in-range numbers.
    pub fn repair(&mut self) {
        if self.characters.is_empty() {
            warn!("Config has no characters, restoring the default one");
            self.characters = default_characters();
        }
        for character in &mut self.characters {
            character.normalize();
        }
        if !self.characters.iter().any(|c| c.id == self.active_character_id) {
            self.active_character_id = self.characters[0].id.clone();
        }
        self.set_map_scale(self.map_scale);
        self.set_opacity(self.opacity);
    }

    /// The active character, falling back to the first one
    pub fn active_character(&self) -> Option<&Character> {
        self.characters
            .iter()
            .find(|c| c.id == self.active_character_id)
            .or_else(|| self.characters.first())
    }

    pub fn active_character_mut(&mut self) -> Option<&mut Character> {
        let index = self
            .characters
            .iter()
            .position(|c| c.id == self.active_character_id)
            .unwrap_or(0);
        self.characters.get_mut(index)
    }

    pub fn character_mut(&mut self, id: &str) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.id == id)
    }

    /// Add a fresh character and make it active
    pub fn add_character(&mut self, name: Option<&str>) -> &Character {
        let character = Character::new(name.unwrap_or(NEW_CHARACTER_NAME));
        info!("Added character {}", character.id);
        self.active_character_id = character.id.clone();
        self.characters.push(character);
        &self.characters[self.characters.len() - 1]
    }

    pub fn select_character(&mut self, id: &str) -> bool {
        if self.characters.iter().any(|c| c.id == id) {
            self.active_character_id = id.to_string();
            true
        } else {
            false
        }
    }

    pub fn rename_character(&mut self, id: &str, name: &str) -> bool {
        match self.character_mut(id) {
            Some(character) => {
                character.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_character_image(&mut self, id: &str, image: Option<String>) -> bool {
        match self.character_mut(id) {
            Some(character) => {
                character.image_path = image;
                true
            }
            None => false,
        }
    }

    /// Delete a character. The last remaining character cannot be deleted.
    pub fn delete_character(&mut self, id: &str) -> bool {
        if self.characters.len() <= 1 {
            return false;
        }
        let before = self.characters.len();
        self.characters.retain(|c| c.id != id);
        if self.characters.len() == before {
            return false;
        }
        if self.active_character_id == id {
            self.active_character_id = self.characters[0].id.clone();
        }
        info!("Deleted character {}", id);
        true
    }

    pub fn set_map_scale(&mut self, scale: f64) {
        self.map_scale = if scale.is_finite() {
            scale.clamp(MIN_MAP_SCALE, MAX_MAP_SCALE)
        } else {
            default_scale()
        };
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = if opacity.is_finite() {
            opacity.clamp(MIN_OPACITY, 1.0)
        } else {
            default_scale()
        };
    }

    /// Dialog lines unlocked at `affinity_level`, with gate prefixes removed
    pub fn available_dialogs(&self, affinity_level: i32) -> Vec<&str> {
        self.custom_dialogs
            .iter()
            .filter_map(|line| match parse_dialog_line(line) {
                (Some(gate), text) if affinity_level >= gate => Some(text),
                (Some(_), _) => None,
                (None, text) => Some(text),
            })
            .collect()
    }

    pub fn random_dialog<R: Rng + ?Sized>(&self, rng: &mut R, affinity_level: i32) -> String {
        self.available_dialogs(affinity_level)
            .choose(rng)
            .map(|s| s.to_string())
            .unwrap_or_else(|| FALLBACK_DIALOG.to_string())
    }

    /// Clear the map for a new season. Characters are kept.
    pub fn reset_map(&mut self) {
        self.map_image_path = None;
        self.map_scale = default_scale();
    }
}

pub fn random_limit_dialog<R: Rng + ?Sized>(rng: &mut R) -> String {
    LIMIT_DIALOGS
        .choose(rng)
        .copied()
        .unwrap_or(LIMIT_DIALOGS[0])
        .to_string()
}

// ============================================================================
// Process settings
// ============================================================================

pub const SETTINGS_FILE: &str = "questmap.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {path} is invalid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings for the `questmap` binary
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Directory holding the persisted config and quest files
    pub data_dir: PathBuf,
    /// `tracing` filter directive, e.g. `questmap=debug`
    pub log_filter: String,
    /// Optional TOML achievement book replacing the built-in one
    pub achievements_file: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_filter: "questmap=info".to_string(),
            achievements_file: None,
        }
    }
}

impl AppSettings {
    /// Load settings; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_dialog_line() {
        assert_eq!(parse_dialog_line("[Lv.5] Hello"), (Some(5), "Hello"));
        assert_eq!(parse_dialog_line("[Lv.12]Hi"), (Some(12), "Hi"));
        assert_eq!(parse_dialog_line("Plain"), (None, "Plain"));
        assert_eq!(parse_dialog_line("[Lv.x] Odd"), (None, "[Lv.x] Odd"));
        assert_eq!(parse_dialog_line("[Lv.3 missing"), (None, "[Lv.3 missing"));
    }

    #[test]
    fn test_dialog_gating() {
        let config = GlobalConfig::default();
        assert_eq!(config.available_dialogs(1).len(), 2);
        assert_eq!(config.available_dialogs(5).len(), 4);
        let all = config.available_dialogs(10);
        assert_eq!(all.len(), 5);
        assert!(all.iter().all(|line| !line.starts_with("[Lv.")));
    }

    #[test]
    fn test_random_dialog_fallback() {
        let mut config = GlobalConfig::default();
        config.custom_dialogs = vec!["[Lv.9] Later".to_string()];
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(config.random_dialog(&mut rng, 1), FALLBACK_DIALOG);
        assert_eq!(config.random_dialog(&mut rng, 9), "Later");
        assert!(LIMIT_DIALOGS.contains(&random_limit_dialog(&mut rng).as_str()));
    }

    #[test]
    fn test_character_management() {
        let mut config = GlobalConfig::default();
        assert!(!config.delete_character(DEFAULT_CHARACTER_ID));

        let new_id = config.add_character(None).id.clone();
        assert_eq!(config.active_character_id, new_id);
        assert_eq!(config.active_character().map(|c| c.name.as_str()), Some(NEW_CHARACTER_NAME));

        assert!(config.rename_character(&new_id, "Sidekick"));
        assert!(config.delete_character(&new_id));
        assert_eq!(config.active_character_id, DEFAULT_CHARACTER_ID);
        assert!(!config.delete_character("ghost"));
    }

    #[test]
    fn test_scale_and_opacity_clamped() {
        let mut config = GlobalConfig::default();
        config.set_map_scale(12.0);
        assert_eq!(config.map_scale, MAX_MAP_SCALE);
        config.set_map_scale(0.1);
        assert_eq!(config.map_scale, MIN_MAP_SCALE);
        config.set_opacity(0.0);
        assert_eq!(config.opacity, MIN_OPACITY);
    }

    #[test]
    fn test_repair_after_load() {
        let json = r#"{"characters":[{"id":"a","name":"A","affinity":250}],"activeCharacterId":"gone","mapScale":9}"#;
        let mut config: GlobalConfig = serde_json::from_str(json).unwrap();
        config.repair();
        assert_eq!(config.active_character_id, "a");
        assert_eq!(config.map_scale, MAX_MAP_SCALE);
        assert_eq!(config.characters[0].affinity_level, 3);
        assert_eq!(config.theme_color, "#8b5e3c");
    }

    #[test]
    fn test_settings_defaults_and_parse() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        assert_eq!(AppSettings::load(&path).unwrap(), AppSettings::default());

        std::fs::write(&path, "data_dir = \"/tmp/qm\"\nlog_filter = \"questmap=debug\"\n").unwrap();
        let settings = AppSettings::load(&path).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/qm"));
        assert_eq!(settings.log_filter, "questmap=debug");

        std::fs::write(&path, "data_dir = 5").unwrap();
        assert!(matches!(AppSettings::load(&path), Err(SettingsError::Parse { .. })));
    }
}
