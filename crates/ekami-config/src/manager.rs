use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{Config, ConfigError};

const BACKUP_PREFIX: &str = "config";
const BACKUP_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_BACKUP_RETENTION: usize = 10;

/// Loads, saves and backs up the [`Config`] file.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf, backups_dir: PathBuf) -> Self {
        Self {
            config_path,
            backups_dir,
            retention: DEFAULT_BACKUP_RETENTION,
        }
    }

    /// `<base>/config/config.json` with backups in `<base>/config/backups`.
    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        let config_dir = base.join("config");
        let backups_dir = config_dir.join("backups");
        fs::create_dir_all(&backups_dir)?;
        Ok(Self::new(config_dir.join("config.json"), backups_dir))
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Reads the config file, or returns defaults when none exists yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }
        let config = read_config(&self.config_path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.config_path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.config_path)?;
        tracing::debug!(path = %self.config_path.display(), "configuration saved");
        Ok(())
    }

    /// Writes a timestamped copy and returns its file name.
    pub fn backup(&self, config: &Config, note: Option<&str>) -> Result<String, ConfigError> {
        fs::create_dir_all(&self.backups_dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut stem = format!("{BACKUP_PREFIX}_{timestamp}");
        if let Some(label) = sanitize_note(note) {
            stem.push('_');
            stem.push_str(&label);
        }
        let mut name = format!("{stem}.{BACKUP_EXTENSION}");
        let mut attempt = 1;
        while self.backups_dir.join(&name).exists() {
            attempt += 1;
            name = format!("{stem}-{attempt}.{BACKUP_EXTENSION}");
        }
        write_atomic(
            &self.backups_dir.join(&name),
            &serde_json::to_string_pretty(config)?,
        )?;
        self.prune_backups()?;
        tracing::info!(backup = %name, "configuration backup written");
        Ok(name)
    }

    /// Reads a backup without applying it; callers decide whether to save it.
    pub fn restore(&self, backup_name: &str) -> Result<Config, ConfigError> {
        let path = self.backups_dir.join(backup_name);
        if !path.is_file() {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("configuration backup `{backup_name}` not found"),
            )));
        }
        let config = read_config(&path)?;
        config.validate()?;
        Ok(config)
    }

    /// Newest first.
    pub fn list_backups(&self) -> Result<Vec<String>, ConfigError> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(name.to_string());
            }
        }
        entries.sort_by_key(|name| Reverse(backup_sort_key(name)));
        Ok(entries)
    }

    fn prune_backups(&self) -> Result<(), ConfigError> {
        for name in self.list_backups()?.into_iter().skip(self.retention) {
            let _ = fs::remove_file(self.backups_dir.join(name));
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|err| ConfigError::Serde(format!("{}: {}", path.display(), err)))
}

fn sanitize_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    let mut sanitized = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
        } else if !sanitized.is_empty() && !sanitized.ends_with('-') {
            sanitized.push('-');
        }
    }
    let trimmed = sanitized.trim_matches('-');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Orders `config_<YYYYMMDD>_<HHMMSS>[_note][-N].json` by time, then by the `-N` attempt.
fn backup_sort_key(name: &str) -> (Option<DateTime<Utc>>, u32) {
    let timestamp = name
        .strip_prefix(BACKUP_PREFIX)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.get(..15))
        .and_then(|raw| NaiveDateTime::parse_from_str(raw, "%Y%m%d_%H%M%S").ok())
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc));
    let attempt = name
        .strip_suffix(&format!(".{BACKUP_EXTENSION}"))
        .and_then(|stem| stem.rsplit_once('-'))
        .and_then(|(_, tail)| tail.parse().ok())
        .unwrap_or(1);
    (timestamp, attempt)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
