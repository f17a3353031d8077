//! Result cache: memoizes expensive per-project results (static analysis runs,
//! AI reviews) in `{project}/.vibe-auditor-cache/cache.json`.
//!
//! An entry is reused only while it is younger than the TTL and the metadata
//! hash of the supplied file list matches the one recorded at save time.
//! Content bytes are never hashed: a file rewritten within the same mtime tick
//! with an identical size is indistinguishable from an untouched one.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::files::ProjectFileDescriptor;
use crate::json_store;

pub const CACHE_DIR_NAME: &str = ".vibe-auditor-cache";
pub const CACHE_FILE_NAME: &str = "cache.json";
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// One memoized result as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_hash: Option<String>,
    pub result: Value,
}

impl CacheEntry {
    fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timestamp)
    }
}

type EntryMap = BTreeMap<String, CacheEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    Absent,
    Expired,
    FilesChanged,
}

impl std::fmt::Display for MissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MissReason::Absent => "absent",
            MissReason::Expired => "expired",
            MissReason::FilesChanged => "files changed",
        };
        f.write_str(label)
    }
}

/// Outcome of a cache lookup. A miss is an expected result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Value),
    Miss(MissReason),
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn hit(self) -> Option<Value> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Miss(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryStats {
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub age_hours: f64,
    pub is_expired: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    pub cache_file_size: u64,
    pub entries: Vec<CacheEntryStats>,
}

/// Build the conventional key for an operation run in a given mode,
/// e.g. `cache_key("static_analysis", "deployment")`.
pub fn cache_key(operation: &str, mode: &str) -> String {
    format!("{operation}_{mode}")
}

/// Digest of `path:mtime_ns:size` for every file, sorted by path.
pub fn project_hash(files: &[ProjectFileDescriptor]) -> String {
    let mut triples: Vec<(&str, String)> = files
        .iter()
        .map(|f| {
            (
                f.path.as_str(),
                format!("{}:{}:{}", f.path, f.modified_ns(), f.size_bytes),
            )
        })
        .collect();
    triples.sort_by(|a, b| a.0.cmp(b.0));

    let joined = triples
        .into_iter()
        .map(|(_, triple)| triple)
        .collect::<Vec<_>>()
        .join("|");

    format!("{:x}", Sha256::digest(joined.as_bytes()))
}

fn non_empty(files: Option<&[ProjectFileDescriptor]>) -> Option<&[ProjectFileDescriptor]> {
    files.filter(|files| !files.is_empty())
}

pub struct ResultCache {
    cache_file: PathBuf,
    ttl: Duration,
}

impl ResultCache {
    /// Cache persisted in `cache_dir/cache.json`. The directory is created on first write.
    pub fn new(cache_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            cache_file: cache_dir.into().join(CACHE_FILE_NAME),
            ttl,
        }
    }

    /// Cache stored under `{project_root}/.vibe-auditor-cache/`.
    pub fn for_project(project_root: &Path, ttl: Duration) -> Self {
        Self::new(project_root.join(CACHE_DIR_NAME), ttl)
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up `key`. With a non-empty `current_files`, the stored project hash
    /// must match too; an empty list is treated as no list.
    pub fn get(&self, key: &str, current_files: Option<&[ProjectFileDescriptor]>) -> CacheLookup {
        let entries = self.load();
        self.lookup(&entries, key, current_files, Utc::now())
    }

    /// Store `result` under `key`, replacing any previous entry.
    pub fn save<T>(
        &self,
        key: &str,
        result: &T,
        current_files: Option<&[ProjectFileDescriptor]>,
    ) -> StoreResult<()>
    where
        T: Serialize + ?Sized,
    {
        let result =
            serde_json::to_value(result).map_err(|e| StoreError::encode(&self.cache_file, e))?;
        self.save_at(key, result, current_files, Utc::now())
    }

    /// Return the cached value for `key`, or run `compute`, store its output and return it.
    pub fn get_or_compute<F, E>(
        &self,
        key: &str,
        current_files: Option<&[ProjectFileDescriptor]>,
        compute: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Result<Value, E>,
        E: From<StoreError>,
    {
        if let CacheLookup::Hit(value) = self.get(key, current_files) {
            return Ok(value);
        }
        let value = compute()?;
        self.save(key, &value, current_files)?;
        Ok(value)
    }

    /// Drop one entry, or the whole backing file when `key` is `None`.
    pub fn invalidate(&self, key: Option<&str>) -> StoreResult<()> {
        match key {
            None => {
                warn!(path = %self.cache_file.display(), "clearing entire cache");
                if json_store::remove_if_exists(&self.cache_file)? {
                    info!("cache cleared");
                }
            }
            Some(key) => {
                let mut entries = self.load();
                if entries.remove(key).is_some() {
                    json_store::write_atomic(&self.cache_file, &entries)?;
                    info!(key, "cache entry invalidated");
                } else {
                    debug!(key, "invalidate: no such entry");
                }
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.load();
        let now = Utc::now();
        let cache_file_size = std::fs::metadata(&self.cache_file)
            .map(|m| m.len())
            .unwrap_or(0);

        let entries: Vec<CacheEntryStats> = entries
            .iter()
            .map(|(key, entry)| {
                let age = entry.age(now);
                CacheEntryStats {
                    key: key.clone(),
                    timestamp: entry.timestamp,
                    age_hours: age.num_milliseconds() as f64 / 3_600_000.0,
                    is_expired: self.is_expired(age),
                }
            })
            .collect();

        CacheStats {
            total_entries: entries.len(),
            cache_file_size,
            entries,
        }
    }

    /// Physically remove expired entries. Returns how many were dropped.
    pub fn cleanup_expired(&self) -> StoreResult<usize> {
        let mut entries = self.load();
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry.age(now)));
        let removed = before - entries.len();

        if removed > 0 {
            json_store::write_atomic(&self.cache_file, &entries)?;
        }
        info!(removed, "expired cache entries cleaned up");
        Ok(removed)
    }

    pub(crate) fn save_at(
        &self,
        key: &str,
        result: Value,
        current_files: Option<&[ProjectFileDescriptor]>,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut entries = self.load();
        entries.insert(
            key.to_string(),
            CacheEntry {
                timestamp,
                project_hash: non_empty(current_files).map(project_hash),
                result,
            },
        );
        json_store::write_atomic(&self.cache_file, &entries)?;
        info!(key, "result cached");
        Ok(())
    }

    fn lookup(
        &self,
        entries: &EntryMap,
        key: &str,
        current_files: Option<&[ProjectFileDescriptor]>,
        now: DateTime<Utc>,
    ) -> CacheLookup {
        let Some(entry) = entries.get(key) else {
            debug!(key, "cache miss: absent");
            return CacheLookup::Miss(MissReason::Absent);
        };

        if self.is_expired(entry.age(now)) {
            debug!(key, "cache miss: expired");
            return CacheLookup::Miss(MissReason::Expired);
        }

        if let Some(files) = non_empty(current_files) {
            let current = project_hash(files);
            if entry.project_hash.as_deref() != Some(current.as_str()) {
                debug!(key, "cache miss: files changed");
                return CacheLookup::Miss(MissReason::FilesChanged);
            }
        }

        info!(key, "cache hit");
        CacheLookup::Hit(entry.result.clone())
    }

    // Zero or negative remaining life counts as expired.
    fn is_expired(&self, age: Duration) -> bool {
        age >= self.ttl
    }

    fn load(&self) -> EntryMap {
        json_store::load_or_default(&self.cache_file)
    }
}
