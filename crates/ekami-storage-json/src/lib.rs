//! File-backed [`RecordStore`]: one pretty-printed JSON array per collection.
//!
//! Writes go to a sibling `.tmp` file that is renamed over the collection file,
//! so a crash never leaves a half-written collection behind. Collections can be
//! snapshotted on demand; old snapshots are pruned beyond the retention count.

use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::RwLock,
};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use ekami_core::{
    store::{record_id, InsertOutcome, Query, Record, RecordStore},
    CoreError,
};

const COLLECTION_EXTENSION: &str = "json";
const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// Directory layout used by [`JsonRecordStore`].
#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub collections_root: PathBuf,
    pub snapshots_root: PathBuf,
}

impl StoragePaths {
    /// `<root>/collections` and `<root>/snapshots`.
    pub fn under(root: &Path) -> Self {
        Self {
            collections_root: root.join("collections"),
            snapshots_root: root.join("snapshots"),
        }
    }
}

/// A saved copy of one collection file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub collection: String,
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub path: PathBuf,
}

pub struct JsonRecordStore {
    paths: StoragePaths,
    retention: usize,
    lock: RwLock<()>,
}

impl JsonRecordStore {
    pub fn new(paths: StoragePaths) -> Result<Self, CoreError> {
        Self::with_retention(paths, DEFAULT_RETENTION)
    }

    pub fn with_retention(paths: StoragePaths, retention: usize) -> Result<Self, CoreError> {
        fs::create_dir_all(&paths.collections_root)?;
        fs::create_dir_all(&paths.snapshots_root)?;
        Ok(Self {
            paths,
            retention: retention.max(1),
            lock: RwLock::new(()),
        })
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.paths
            .collections_root
            .join(format!("{}.{}", canonical_name(collection), COLLECTION_EXTENSION))
    }

    /// Names of the collections that currently have a file on disk.
    pub fn collections(&self) -> Result<Vec<String>, CoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.paths.collections_root)? {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(COLLECTION_EXTENSION)
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Copies the current collection file into the snapshot directory.
    pub fn snapshot(&self, collection: &str) -> Result<SnapshotInfo, CoreError> {
        let _guard = self.lock.read().map_err(|_| poisoned())?;
        let rows = read_collection(&self.collection_path(collection))?;

        let slug = canonical_name(collection);
        let dir = self.snapshot_dir(collection);
        fs::create_dir_all(&dir)?;
        let now = Utc::now();
        let timestamp = now.format(SNAPSHOT_TIMESTAMP_FORMAT).to_string();
        let mut sequence = 0;
        let (file_name, path) = loop {
            let file_name = format!("{slug}_{timestamp}_{sequence:03}.{COLLECTION_EXTENSION}");
            let path = dir.join(&file_name);
            if !path.exists() {
                break (file_name, path);
            }
            sequence += 1;
        };
        write_collection(&path, &rows)?;
        tracing::info!(collection = %slug, snapshot = %file_name, rows = rows.len(), "collection snapshot written");
        self.prune_snapshots(collection)?;
        Ok(SnapshotInfo {
            collection: slug.clone(),
            created_at: parse_snapshot_timestamp(&slug, &file_name).map(|(at, _)| at),
            id: file_name,
            path,
        })
    }

    /// Newest first.
    pub fn list_snapshots(&self, collection: &str) -> Result<Vec<SnapshotInfo>, CoreError> {
        let dir = self.snapshot_dir(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let slug = canonical_name(collection);
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(COLLECTION_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(SnapshotInfo {
                    collection: slug.clone(),
                    id: file_name.to_string(),
                    created_at: parse_snapshot_timestamp(&slug, file_name).map(|(at, _)| at),
                    path: path.clone(),
                });
            }
        }
        entries.sort_by_key(|info| Reverse(parse_snapshot_timestamp(&slug, &info.id)));
        Ok(entries)
    }

    /// Replaces the live collection with the snapshot's rows.
    pub fn restore_snapshot(&self, snapshot: &SnapshotInfo) -> Result<usize, CoreError> {
        if !snapshot.path.exists() {
            return Err(CoreError::Storage(format!(
                "snapshot `{}` not found",
                snapshot.id
            )));
        }
        let _guard = self.lock.write().map_err(|_| poisoned())?;
        let rows = read_collection(&snapshot.path)?;
        save_collection(&self.collection_path(&snapshot.collection), &rows)?;
        tracing::info!(collection = %snapshot.collection, snapshot = %snapshot.id, "collection restored");
        Ok(rows.len())
    }

    fn snapshot_dir(&self, collection: &str) -> PathBuf {
        self.paths.snapshots_root.join(canonical_name(collection))
    }

    fn prune_snapshots(&self, collection: &str) -> Result<(), CoreError> {
        for entry in self.list_snapshots(collection)?.into_iter().skip(self.retention) {
            let _ = fs::remove_file(entry.path);
        }
        Ok(())
    }

    fn modify<T>(
        &self,
        collection: &str,
        change: impl FnOnce(&mut Vec<Record>) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let _guard = self.lock.write().map_err(|_| poisoned())?;
        let path = self.collection_path(collection);
        let mut rows = read_collection(&path)?;
        let result = change(&mut rows)?;
        save_collection(&path, &rows)?;
        Ok(result)
    }
}

impl RecordStore for JsonRecordStore {
    fn select(&self, collection: &str, query: &Query) -> Result<Vec<Record>, CoreError> {
        let _guard = self.lock.read().map_err(|_| poisoned())?;
        let rows = read_collection(&self.collection_path(collection))?;
        Ok(query.apply(rows.iter()))
    }

    fn insert(&self, collection: &str, record: Record) -> Result<Record, CoreError> {
        self.modify(collection, |rows| {
            push_unique(collection, rows, record)
        })
    }

    fn update(&self, collection: &str, id: &str, record: Record) -> Result<Record, CoreError> {
        self.modify(collection, |rows| {
            let slot = rows
                .iter_mut()
                .find(|row| record_id(row) == Some(id))
                .ok_or_else(|| CoreError::not_found(collection, id))?;
            *slot = record.clone();
            Ok(record)
        })
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool, CoreError> {
        self.modify(collection, |rows| {
            let before = rows.len();
            rows.retain(|row| record_id(row) != Some(id));
            Ok(rows.len() != before)
        })
    }

    /// Check and write happen under one lock, so concurrent callers with the
    /// same key cannot both create a row.
    fn insert_once(
        &self,
        collection: &str,
        key_field: &str,
        key: &str,
        record: Record,
    ) -> Result<InsertOutcome, CoreError> {
        let _guard = self.lock.write().map_err(|_| poisoned())?;
        let path = self.collection_path(collection);
        let mut rows = read_collection(&path)?;
        let expected = Value::String(key.to_string());
        if let Some(existing) = rows.iter().find(|row| row.get(key_field) == Some(&expected)) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        let created = push_unique(collection, &mut rows, record)?;
        save_collection(&path, &rows)?;
        Ok(InsertOutcome::Created(created))
    }
}

fn push_unique(collection: &str, rows: &mut Vec<Record>, record: Record) -> Result<Record, CoreError> {
    let id = record_id(&record)
        .ok_or_else(|| CoreError::Storage(format!("{collection} row is missing an id")))?;
    if rows.iter().any(|row| record_id(row) == Some(id)) {
        return Err(CoreError::Storage(format!(
            "{collection} already contains a row with id {id}"
        )));
    }
    rows.push(record.clone());
    Ok(record)
}

fn poisoned() -> CoreError {
    CoreError::Storage("json store lock poisoned".into())
}

fn read_collection(path: &Path) -> Result<Vec<Record>, CoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&data).map_err(|err| {
        CoreError::Serde(format!("{}: {}", path.display(), err))
    })
}

fn save_collection(path: &Path, rows: &[Record]) -> Result<(), CoreError> {
    let tmp = tmp_path(path);
    write_collection(&tmp, rows)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn write_collection(path: &Path, rows: &[Record]) -> Result<(), CoreError> {
    let data = serde_json::to_string_pretty(rows)?;
    write_atomic(path, &data)
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "collection".into()
    } else {
        sanitized
    }
}

/// Reads `<slug>_<YYYYMMDD>_<HHMMSS>_<seq>.json` back into its time and sequence.
fn parse_snapshot_timestamp(slug: &str, file_name: &str) -> Option<(DateTime<Utc>, u32)> {
    let trimmed = file_name
        .strip_suffix(&format!(".{COLLECTION_EXTENSION}"))?
        .strip_prefix(slug)?
        .strip_prefix('_')?;
    let mut segments = trimmed.split('_');
    let date = segments.next()?;
    let time = segments.next()?;
    let sequence = segments.next()?;
    if segments.next().is_some() || !is_digits(date, 8) || !is_digits(time, 6) {
        return None;
    }
    let at = NaiveDateTime::parse_from_str(&format!("{date}{time}"), "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))?;
    Some((at, sequence.parse().ok()?))
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
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

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
