//! Display preferences read from `~/.config/task-nerd/task-nerd.toml`.
//!
//! Loading never fails: a missing file, invalid TOML, unknown keys or values
//! of the wrong type all fall back to defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use ratatui::style::Color;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

pub const DEFAULT_THEME: &str = "catppuccin-mocha";
pub const DEFAULT_COMPLETED_DATE_FORMAT: &str = "%m/%d/%y";
pub const CONFIG_ENV: &str = "TASK_NERD_CONFIG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PreviewMode {
    All,
    #[default]
    Incomplete,
    Off,
}

impl FromStr for PreviewMode {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "all" => Ok(Self::All),
            "incomplete" => Ok(Self::Incomplete),
            "off" => Ok(Self::Off),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomTheme {
    pub name: String,
    pub dark: bool,
    pub primary: Option<Color>,
    pub secondary: Option<Color>,
    pub accent: Option<Color>,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub surface: Option<Color>,
    pub warning: Option<Color>,
    pub error: Option<Color>,
    pub success: Option<Color>,
}

impl CustomTheme {
    pub fn is_valid(&self) -> bool {
        self.primary.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub theme: String,
    pub custom_theme: Option<CustomTheme>,
    pub completed_date_format: String,
    pub preview: PreviewMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            custom_theme: None,
            completed_date_format: DEFAULT_COMPLETED_DATE_FORMAT.to_string(),
            preview: PreviewMode::default(),
        }
    }
}

impl Config {
    /// `$TASK_NERD_CONFIG`, else `~/.config/task-nerd/task-nerd.toml`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".config").join("task-nerd").join("task-nerd.toml"))
    }

    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw).unwrap_or_else(|err| {
                log::warn!("ignoring invalid config {}: {err}", path.display());
                Self::default()
            }),
            Err(err) => {
                log::warn!("could not read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        let raw: RawConfig = toml::from_str(raw)?;
        let mut config = Self::default();

        if let Some(theme) = raw.theme {
            config.theme = theme;
        }

        if let Some(format) = raw.completed_date_format {
            if is_valid_date_format(&format) {
                config.completed_date_format = format;
            } else {
                log::warn!("ignoring invalid completed_date_format {format:?}");
            }
        }

        if let Some(mode) = raw.show_description_preview {
            match mode.parse() {
                Ok(mode) => config.preview = mode,
                Err(()) => log::warn!("ignoring unknown show_description_preview {mode:?}"),
            }
        }

        config.custom_theme = raw.custom_theme.map(CustomTheme::from);
        Ok(config)
    }

    /// The custom theme, when it is selected and usable.
    pub fn active_custom_theme(&self) -> Option<&CustomTheme> {
        if self.theme != "custom" {
            return None;
        }
        let custom = self.custom_theme.as_ref().filter(|c| c.is_valid());
        if custom.is_none() {
            log::warn!("theme = \"custom\" needs a [custom_theme] with a primary color; using {DEFAULT_THEME}");
        }
        custom
    }
}

/// On-disk layout. Every field is optional and a value of the wrong type
/// reads as absent, so one bad key never discards the rest of the file.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default, deserialize_with = "lenient")]
    theme: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    completed_date_format: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    show_description_preview: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    custom_theme: Option<RawCustomTheme>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCustomTheme {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    dark: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    primary: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    secondary: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    accent: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    foreground: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    background: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    surface: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    warning: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    error: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    success: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = toml::Value::deserialize(deserializer)?;
    match T::deserialize(value.clone()) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => {
            log::warn!("ignoring config value {value}: {err}");
            Ok(None)
        }
    }
}

fn parse_color(key: &str, raw: Option<String>) -> Option<Color> {
    let raw = raw?;
    match Color::from_str(&raw) {
        Ok(color) => Some(color),
        Err(_) => {
            log::warn!("ignoring unrecognized color {raw:?} for custom_theme.{key}");
            None
        }
    }
}

impl From<RawCustomTheme> for CustomTheme {
    fn from(raw: RawCustomTheme) -> Self {
        Self {
            name: raw.name.unwrap_or_else(|| "custom".to_string()),
            dark: raw.dark.unwrap_or(true),
            primary: parse_color("primary", raw.primary),
            secondary: parse_color("secondary", raw.secondary),
            accent: parse_color("accent", raw.accent),
            foreground: parse_color("foreground", raw.foreground),
            background: parse_color("background", raw.background),
            surface: parse_color("surface", raw.surface),
            warning: parse_color("warning", raw.warning),
            error: parse_color("error", raw.error),
            success: parse_color("success", raw.success),
        }
    }
}

fn is_valid_date_format(format: &str) -> bool {
    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn recognized_keys_are_read() {
        let config = Config::parse(
            r#"
            theme = "light"
            completed_date_format = "%Y-%m-%d"
            show_description_preview = "all"
            "#,
        )
        .unwrap();

        assert_eq!(config.theme, "light");
        assert_eq!(config.completed_date_format, "%Y-%m-%d");
        assert_eq!(config.preview, PreviewMode::All);
    }

    #[test]
    fn unknown_keys_and_bad_values_are_ignored() {
        let config = Config::parse(
            r#"
            theme = 42
            show_description_preview = "sometimes"
            completed_date_format = "%Q"
            mystery = "value"
            "#,
        )
        .unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn custom_theme_without_primary_falls_back() {
        let config = Config::parse(
            r##"
            theme = "custom"
            [custom_theme]
            name = "mine"
            accent = "#ff8800"
            "##,
        )
        .unwrap();

        let custom = config.custom_theme.as_ref().unwrap();
        assert_eq!(custom.accent, Some(Color::Rgb(0xff, 0x88, 0x00)));
        assert!(!custom.is_valid());
        assert!(config.active_custom_theme().is_none());
    }

    #[test]
    fn valid_custom_theme_is_active() {
        let config = Config::parse(
            r##"
            theme = "custom"
            [custom_theme]
            primary = "magenta"
            dark = false
            "##,
        )
        .unwrap();

        let custom = config.active_custom_theme().unwrap();
        assert_eq!(custom.name, "custom");
        assert_eq!(custom.primary, Some(Color::Magenta));
        assert!(!custom.dark);
    }

    #[test]
    fn bad_custom_theme_field_keeps_the_others() {
        let config = Config::parse(
            r##"
            theme = "custom"
            show_description_preview = "off"
            [custom_theme]
            name = 7
            dark = "yes"
            primary = "#102030"
            error = "not-a-color"
            "##,
        )
        .unwrap();

        assert_eq!(config.preview, PreviewMode::Off);
        let custom = config.active_custom_theme().unwrap();
        assert_eq!(custom.name, "custom");
        assert!(custom.dark);
        assert_eq!(custom.primary, Some(Color::Rgb(0x10, 0x20, 0x30)));
        assert_eq!(custom.error, None);
    }

    #[test]
    fn custom_theme_of_wrong_type_is_ignored() {
        let config = Config::parse(r#"custom_theme = "mine""#).unwrap();
        assert_eq!(config.custom_theme, None);
    }

    #[test]
    fn invalid_toml_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("task-nerd.toml");
        fs::write(&path, "theme = [unterminated").unwrap();

        assert_eq!(Config::load_from(&path), Config::default());
        assert_eq!(Config::load_from(&dir.path().join("missing.toml")), Config::default());
    }
}
