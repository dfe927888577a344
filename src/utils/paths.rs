use std::{env, path::PathBuf};

use ekami_config::Config;

pub const HOME_ENV: &str = "EKAMI_HOME";

/// `$EKAMI_HOME` when set and non-empty, otherwise `~/.ekami_auto`.
pub fn app_home() -> PathBuf {
    match env::var_os(HOME_ENV) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => Config::default_home(),
    }
}
