use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::sequencer::{InsertMode, SequenceTimings};

const DEFAULT_CONFIG: &str = r#"[hotkey]
modifiers = ["Command", "Shift"]
key = "L"

[sequence]
# "paste" pastes over the selection, "keystrokes" deletes it and types
# each character (for fields that refuse paste)
insert_mode = "paste"
copy_delay_ms = 200
paste_delay_ms = 100
restore_delay_ms = 100

[layout]
# table_path = "~/.layout-fix/my-layout.toml"

[app]
start_at_login = false
show_menu_bar_icon = true

[telemetry]
enabled = true
log_path = "~/.layout-fix/layout-fix.log"
"#;

/// Contents of `~/.layout-fix.toml`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct Config {
    /// Conversion hotkey
    pub hotkey: HotkeyConfig,
    /// Capture/replace timing and insertion mode
    #[serde(default)]
    pub sequence: SequenceConfig,
    /// Transliteration table selection
    #[serde(default)]
    pub layout: LayoutConfig,
    /// Login item and menu bar toggles
    #[serde(default)]
    pub app: AppConfig,
    /// Logging
    pub telemetry: TelemetryConfig,
}

/// Hotkey chord, e.g. `["Command", "Shift"]` + `"L"`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct HotkeyConfig {
    /// Modifier names (`Command`, `Shift`, `Option`, `Control` and aliases)
    pub modifiers: Vec<String>,
    /// Key name (`A`-`Z`, `0`-`9`, `Space`)
    pub key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            modifiers: vec!["Command".to_owned(), "Shift".to_owned()],
            key: "L".to_owned(),
        }
    }
}

/// Settings for the selection capture/replace sequence
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SequenceConfig {
    /// How the converted text is put back
    pub insert_mode: InsertMode,
    /// Wait after Command+C before reading the clipboard
    pub copy_delay_ms: u64,
    /// Wait before inserting the converted text
    pub paste_delay_ms: u64,
    /// Wait after inserting, before the clipboard is restored
    pub restore_delay_ms: u64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            insert_mode: InsertMode::Paste,
            copy_delay_ms: 200,
            paste_delay_ms: 100,
            restore_delay_ms: 100,
        }
    }
}

impl SequenceConfig {
    /// Delays as durations
    #[must_use]
    pub const fn timings(&self) -> SequenceTimings {
        SequenceTimings {
            copy_delay: Duration::from_millis(self.copy_delay_ms),
            paste_delay: Duration::from_millis(self.paste_delay_ms),
            restore_delay: Duration::from_millis(self.restore_delay_ms),
        }
    }
}

/// Transliteration table selection
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LayoutConfig {
    /// User table in TOML; the built-in ЙЦУКЕН/QWERTY table when unset
    pub table_path: Option<String>,
}

/// Toggles that used to live in the settings window
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Register a login item
    pub start_at_login: bool,
    /// Show the status bar icon
    pub show_menu_bar_icon: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            start_at_login: false,
            show_menu_bar_icon: true,
        }
    }
}

/// Logging destination
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Log to `log_path` instead of stdout
    pub enabled: bool,
    /// Log file, `~/` is expanded
    pub log_path: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: "~/.layout-fix/layout-fix.log".to_owned(),
        }
    }
}

impl Config {
    /// Load config from `path`, writing the defaults there if it is missing
    ///
    /// # Errors
    /// Returns error if the file cannot be created, read or parsed
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            Self::create_default(path).context("failed to create default config")?;
        }

        let contents = fs::read_to_string(path).context("failed to read config file")?;

        let config: Self = toml::from_str(&contents).context("failed to parse config TOML")?;

        Ok(config)
    }

    /// Write config to `path`
    ///
    /// Comments from a hand-edited file are not preserved.
    ///
    /// # Errors
    /// Returns error if serialization or the write fails
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, contents).context("failed to write config file")?;
        Ok(())
    }

    /// Location of the config file
    ///
    /// # Errors
    /// Returns error if HOME is unset
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".layout-fix.toml"))
    }

    /// Last modification time of the file at `path`, if it exists
    #[must_use]
    pub fn modified_at(path: &Path) -> Option<SystemTime> {
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    /// Resolved user table path, if one is configured
    ///
    /// # Errors
    /// Returns error if the path starts with `~/` and HOME is unset
    pub fn table_path(&self) -> Result<Option<PathBuf>> {
        self.layout
            .table_path
            .as_deref()
            .map(Self::expand_path)
            .transpose()
    }

    fn create_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("failed to create config directory")?;
        }
        fs::write(path, DEFAULT_CONFIG).context("failed to write default config")?;
        Ok(())
    }

    /// Expand ~ in paths to home directory
    ///
    /// # Errors
    /// Returns error if the path starts with `~/` and HOME is unset
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_matches_default_struct() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_load_from_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("layout-fix.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.hotkey.key, "L");
        assert_eq!(config.sequence.insert_mode, InsertMode::Paste);
        assert!(config.app.show_menu_bar_icon);
        assert!(!config.app.start_at_login);
    }

    #[test]
    fn test_optional_sections_fall_back_to_defaults() {
        let minimal = r#"
[hotkey]
modifiers = ["Control", "Option"]
key = "K"

[telemetry]
enabled = false
log_path = "/tmp/layout-fix.log"
"#;
        let config: Config = toml::from_str(minimal).unwrap();
        assert_eq!(config.sequence, SequenceConfig::default());
        assert_eq!(config.app, AppConfig::default());
        assert!(config.layout.table_path.is_none());
    }

    #[test]
    fn test_partial_sequence_section() {
        let text = r#"
[hotkey]
modifiers = ["Command"]
key = "L"

[sequence]
insert_mode = "keystrokes"
copy_delay_ms = 300

[telemetry]
enabled = false
log_path = "/tmp/x.log"
"#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.sequence.insert_mode, InsertMode::Keystrokes);
        assert_eq!(config.sequence.copy_delay_ms, 300);
        assert_eq!(config.sequence.paste_delay_ms, 100);
    }

    #[test]
    fn test_unknown_insert_mode_is_rejected() {
        let text = r#"
[hotkey]
modifiers = ["Command"]
key = "L"

[sequence]
insert_mode = "telepathy"

[telemetry]
enabled = false
log_path = "/tmp/x.log"
"#;
        assert!(toml::from_str::<Config>(text).is_err());
    }

    #[test]
    fn test_save_then_load_keeps_toggles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout-fix.toml");

        let mut config = Config::default();
        config.app.start_at_login = true;
        config.app.show_menu_bar_icon = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_timings() {
        let timings = SequenceConfig::default().timings();
        assert_eq!(timings.copy_delay, Duration::from_millis(200));
        assert_eq!(timings.paste_delay, Duration::from_millis(100));
        assert_eq!(timings.restore_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_modified_at_missing_file() {
        assert!(Config::modified_at(Path::new("/nonexistent/layout-fix.toml")).is_none());
    }

    #[test]
    fn test_expand_path() {
        let home = std::env::var("HOME").unwrap();
        assert_eq!(
            Config::expand_path("~/tables/ru.toml").unwrap(),
            PathBuf::from(home).join("tables/ru.toml")
        );
        assert_eq!(
            Config::expand_path("/etc/ru.toml").unwrap(),
            PathBuf::from("/etc/ru.toml")
        );
    }
}
