use serde::{de::Deserializer, Deserialize, Serialize};
use std::{fmt, path::{Path, PathBuf}};

use crate::ConfigError;

pub const DEFAULT_HOME_DIR_NAME: &str = ".ekami_auto";

/// User-configurable preferences for the Ekami Auto shell and services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "Config::default_ui_color_enabled")]
    pub ui_color_enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Where record collections live. Defaults to the application home.
    pub data_root: Option<PathBuf>,

    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub intake: IntakeSettings,
    #[serde(default)]
    pub loyalty: LoyaltySettings,
    #[serde(default)]
    pub comments: CommentSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "fr-CM".into(),
            currency: "XAF".into(),
            theme: Theme::default(),
            ui_color_enabled: Self::default_ui_color_enabled(),
            data_root: None,
            notifications: NotificationSettings::default(),
            intake: IntakeSettings::default(),
            loyalty: LoyaltySettings::default(),
            comments: CommentSettings::default(),
        }
    }
}

impl Config {
    /// Keys accepted by [`Config::set`].
    pub const KEYS: [&'static str; 14] = [
        "locale",
        "currency",
        "theme",
        "ui_color_enabled",
        "data_root",
        "notifications.enabled",
        "notifications.from_address",
        "notifications.staff_address",
        "intake.max_photos",
        "intake.max_photo_bytes",
        "loyalty.silver",
        "loyalty.gold",
        "loyalty.platinum",
        "comments.require_moderation",
    ];

    pub fn default_ui_color_enabled() -> bool {
        true
    }

    /// `~/.ekami_auto`, or `./.ekami_auto` when no home directory is known.
    pub fn default_home() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_HOME_DIR_NAME)
    }

    pub fn resolve_data_root(&self, home: &Path) -> PathBuf {
        match &self.data_root {
            Some(path) => path.clone(),
            None => home.join("data"),
        }
    }

    /// Rejects settings the services cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let loyalty = &self.loyalty;
        if !(0 < loyalty.silver && loyalty.silver < loyalty.gold && loyalty.gold < loyalty.platinum) {
            return Err(ConfigError::Invalid(
                "loyalty thresholds must climb: 0 < silver < gold < platinum".into(),
            ));
        }
        if self.intake.max_photos == 0 || self.intake.max_photo_bytes == 0 {
            return Err(ConfigError::Invalid(
                "intake photo limits must be greater than zero".into(),
            ));
        }
        if self.notifications.enabled && self.notifications.staff_address.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "notifications need a staff address when enabled".into(),
            ));
        }
        Ok(())
    }

    /// Updates one dotted key from user text, then re-validates the whole config.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut next = self.clone();
        let value = value.trim();
        match key.trim() {
            "locale" => next.locale = value.to_string(),
            "currency" => next.currency = value.to_ascii_uppercase(),
            "theme" => next.theme = Theme::from_str(value),
            "ui_color_enabled" => next.ui_color_enabled = parse_bool(key, value)?,
            "data_root" => {
                next.data_root = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            "notifications.enabled" => next.notifications.enabled = parse_bool(key, value)?,
            "notifications.from_address" => next.notifications.from_address = value.to_string(),
            "notifications.staff_address" => next.notifications.staff_address = value.to_string(),
            "intake.max_photos" => next.intake.max_photos = parse_number(key, value)?,
            "intake.max_photo_bytes" => next.intake.max_photo_bytes = parse_number(key, value)?,
            "loyalty.silver" => next.loyalty.silver = parse_number(key, value)?,
            "loyalty.gold" => next.loyalty.gold = parse_number(key, value)?,
            "loyalty.platinum" => next.loyalty.platinum = parse_number(key, value)?,
            "comments.require_moderation" => {
                next.comments.require_moderation = parse_bool(key, value)?
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown setting `{other}`"
                )))
            }
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::Invalid(format!(
            "`{key}` expects true or false, got `{value}`"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| {
        ConfigError::Invalid(format!("`{key}` expects a whole number, got `{value}`"))
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "NotificationSettings::default_enabled")]
    pub enabled: bool,
    pub from_address: String,
    pub staff_address: String,
}

impl NotificationSettings {
    fn default_enabled() -> bool {
        true
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            from_address: "Ekami Auto <noreply@ekamiauto.com>".into(),
            staff_address: "workshop@ekamiauto.com".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeSettings {
    pub max_photos: usize,
    pub max_photo_bytes: u64,
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            max_photos: 5,
            max_photo_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltySettings {
    pub silver: u64,
    pub gold: u64,
    pub platinum: u64,
}

impl Default for LoyaltySettings {
    fn default() -> Self {
        Self {
            silver: 1_000,
            gold: 5_000,
            platinum: 15_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSettings {
    #[serde(default)]
    pub require_moderation: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Plain,
    #[default]
    Iconic,
}

impl Theme {
    fn from_value(value: Option<String>) -> Self {
        value
            .map(|v| Theme::from_str(v.trim()))
            .unwrap_or_default()
    }

    /// Unknown names fall back to the iconic theme.
    pub fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "plain" => Theme::Plain,
            _ => Theme::Iconic,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Theme::Plain => "plain",
            Theme::Iconic => "iconic",
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(Theme::from_value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_updates_nested_keys() {
        let mut config = Config::default();
        config.set("loyalty.silver", "500").unwrap();
        config.set("comments.require_moderation", "yes").unwrap();
        config.set("currency", "eur").unwrap();

        assert_eq!(config.loyalty.silver, 500);
        assert!(config.comments.require_moderation);
        assert_eq!(config.currency, "EUR");
    }

    #[test]
    fn set_rejects_values_that_break_validation() {
        let mut config = Config::default();
        let err = config.set("loyalty.gold", "100").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert_eq!(config.loyalty.gold, 5_000);

        assert!(config.set("intake.max_photos", "many").is_err());
        assert!(config.set("colour", "blue").is_err());
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"locale":"en-GB","currency":"GBP","theme":null}"#).unwrap();
        assert_eq!(config.theme, Theme::Iconic);
        assert_eq!(config.intake, IntakeSettings::default());
        assert!(config.notifications.enabled);
    }

    #[test]
    fn data_root_defaults_under_home() {
        let config = Config::default();
        let home = Path::new("/tmp/ekami-home");
        assert_eq!(config.resolve_data_root(home), home.join("data"));
    }
}
