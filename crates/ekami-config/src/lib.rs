//! ekami-config
//!
//! Persistent preferences for the Ekami Auto shell: locale, storage location,
//! notification addresses, intake photo limits, loyalty thresholds and comment
//! moderation. Owns the Config model plus disk persistence and backups.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::{
    CommentSettings, Config, IntakeSettings, LoyaltySettings, NotificationSettings, Theme,
};
