//! Content-addressed disk cache for query results.
//!
//! Each entry lives in `<dir>/<key>.json`, where `key` is the blake3 hex
//! digest of the query's canonical (key-sorted) JSON form. The cache is
//! best-effort: read problems are misses and write problems are dropped.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{RebaseError, Result};

/// Directory used by [`crate::RebaseClient::from_env`] when none is configured.
pub const DEFAULT_CACHE_DIR: &str = "./cache";

const ENTRY_EXTENSION: &str = "json";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Outcome of reading one entry.
#[derive(Debug)]
pub(crate) enum CacheRead<T> {
    Hit(T),
    Miss,
    Corrupt(String),
}

/// File-per-key memoization of deserialized results.
#[derive(Clone, Debug)]
pub struct ResultCache {
    dir: PathBuf,
    enabled: bool,
}

impl ResultCache {
    /// Opens a cache rooted at `dir`, creating the directory if needed.
    ///
    /// If the directory cannot be created the failure is logged and the
    /// returned cache is disabled: lookups miss and stores do nothing.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        match fs::create_dir_all(&dir) {
            Ok(()) => Self { dir, enabled: true },
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "could not create cache directory {}: {}; caching disabled",
                    dir.display(),
                    _err
                );
                Self {
                    dir,
                    enabled: false,
                }
            }
        }
    }

    /// Cache root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the directory was available when the cache was opened.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Computes the key of `query`.
    ///
    /// Equivalent mappings produce the same key regardless of field order.
    pub fn key<Q: Serialize + ?Sized>(query: &Q) -> Result<String> {
        let canonical = canonical_json(query)?;
        Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }

    /// Path of the entry file for `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{ENTRY_EXTENSION}"))
    }

    /// Returns the cached value for `query`, or `None` on any kind of miss.
    pub fn lookup<Q, T>(&self, query: &Q) -> Option<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let key = Self::key(query).ok()?;
        match self.read_entry(&key) {
            CacheRead::Hit(value) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("cache hit for {}", key);
                Some(value)
            }
            CacheRead::Miss => {
                #[cfg(feature = "tracing")]
                tracing::debug!("cache miss for {}", key);
                None
            }
            CacheRead::Corrupt(_reason) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("ignoring unreadable cache entry {}: {}", key, _reason);
                None
            }
        }
    }

    /// Stores `value` under the key of `query`. Failures are logged only.
    pub fn store<Q, T>(&self, query: &Q, value: &T)
    where
        Q: Serialize + ?Sized,
        T: Serialize + ?Sized,
    {
        if !self.enabled {
            return;
        }
        let outcome = Self::key(query).and_then(|key| self.write_entry(&key, value));
        if let Err(_err) = outcome {
            #[cfg(feature = "tracing")]
            tracing::warn!("could not write cache entry: {}", _err);
        }
    }

    pub(crate) fn read_entry<T: DeserializeOwned>(&self, key: &str) -> CacheRead<T> {
        if !self.enabled {
            return CacheRead::Miss;
        }
        let bytes = match fs::read(self.entry_path(key)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return CacheRead::Miss,
            Err(err) => return CacheRead::Corrupt(err.to_string()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => CacheRead::Hit(value),
            Err(err) => CacheRead::Corrupt(err.to_string()),
        }
    }

    fn write_entry<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_vec(value)
            .map_err(|err| RebaseError::Decode(format!("could not encode cache entry: {err}")))?;

        // Unique temp name so concurrent writers of one key never share a file.
        let temp_path = self.dir.join(format!(
            "{key}.{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let written = fs::File::create(&temp_path)
            .and_then(|mut file| file.write_all(&json).and_then(|()| file.sync_all()))
            .and_then(|()| fs::rename(&temp_path, self.entry_path(key)));
        if let Err(err) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(RebaseError::Decode(format!(
                "could not write cache entry {key}: {err}"
            )));
        }
        Ok(())
    }
}

/// Serializes `query` to JSON with every object's keys in sorted order.
pub(crate) fn canonical_json<Q: Serialize + ?Sized>(query: &Q) -> Result<String> {
    let value = serde_json::to_value(query)
        .map_err(|err| RebaseError::Decode(format!("could not encode cache query: {err}")))?;
    serde_json::to_string(&sort_keys(value))
        .map_err(|err| RebaseError::Decode(format!("could not encode cache query: {err}")))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (name, inner) in entries {
                sorted.insert(name, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use tempfile::TempDir;

    use super::{canonical_json, CacheRead, ResultCache};
    use crate::WeatherRow;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Reading {
        site: String,
        values: Vec<f64>,
    }

    fn reading() -> Reading {
        Reading {
            site: "A".to_owned(),
            values: vec![1.5, 2.25, -3.0],
        }
    }

    fn create_test_cache() -> (ResultCache, TempDir) {
        let temp_dir = TempDir::new().expect("must create temp dir");
        let cache = ResultCache::open(temp_dir.path().join("cache"));
        (cache, temp_dir)
    }

    #[test]
    fn store_then_lookup_returns_equal_value() {
        let (cache, _temp_dir) = create_test_cache();
        let query = json!({"site": "A", "from": "2024-01-01"});

        cache.store(&query, &reading());

        let cached: Option<Reading> = cache.lookup(&query);
        assert_eq!(cached, Some(reading()));
    }

    #[test]
    fn lookup_misses_for_unknown_query() {
        let (cache, _temp_dir) = create_test_cache();
        let cached: Option<Reading> = cache.lookup(&json!({"site": "B"}));
        assert!(cached.is_none());
    }

    #[test]
    fn key_ignores_field_order() {
        let a = json!({"site": "A", "from": "2024-01-01", "to": "2024-01-02"});
        let b = json!({"to": "2024-01-02", "site": "A", "from": "2024-01-01"});
        assert_eq!(
            ResultCache::key(&a).expect("key"),
            ResultCache::key(&b).expect("key")
        );
    }

    #[test]
    fn key_sorts_nested_objects() {
        let a = json!({"outer": {"b": 1, "a": [ {"y": 1, "x": 2} ]}});
        assert_eq!(
            canonical_json(&a).expect("canonical"),
            r#"{"outer":{"a":[{"x":2,"y":1}],"b":1}}"#
        );
    }

    #[test]
    fn key_differs_for_different_queries() {
        let a = ResultCache::key(&json!({"site": "A"})).expect("key");
        let b = ResultCache::key(&json!({"site": "B"})).expect("key");
        let c = ResultCache::key(&json!({"site": "A", "to": null})).expect("key");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn reordered_query_hits_same_entry() {
        let (cache, _temp_dir) = create_test_cache();
        cache.store(&json!({"site": "A", "from": "x"}), &reading());

        let cached: Option<Reading> = cache.lookup(&json!({"from": "x", "site": "A"}));
        assert_eq!(cached, Some(reading()));
    }

    #[test]
    fn entry_file_is_named_by_key() {
        let (cache, _temp_dir) = create_test_cache();
        let query = json!({"site": "A"});
        cache.store(&query, &reading());

        let key = ResultCache::key(&query).expect("key");
        let path = cache.entry_path(&key);
        assert!(path.exists());
        assert!(path.ends_with(format!("{key}.json")));
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let (cache, _temp_dir) = create_test_cache();
        let query = json!({"site": "A"});
        let key = ResultCache::key(&query).expect("key");
        fs::write(cache.entry_path(&key), b"{ truncated").expect("must write");

        assert!(matches!(
            cache.read_entry::<Reading>(&key),
            CacheRead::Corrupt(_)
        ));
        let cached: Option<Reading> = cache.lookup(&query);
        assert!(cached.is_none());
    }

    #[test]
    fn overwrite_keeps_latest_value() {
        let (cache, _temp_dir) = create_test_cache();
        let query = json!({"site": "A"});
        let newer = Reading {
            site: "A".to_owned(),
            values: vec![9.0],
        };

        cache.store(&query, &reading());
        cache.store(&query, &newer);

        let cached: Option<Reading> = cache.lookup(&query);
        assert_eq!(cached, Some(newer));
    }

    #[test]
    fn open_fails_soft_when_directory_cannot_be_created() {
        let temp_dir = TempDir::new().expect("must create temp dir");
        let blocker = temp_dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").expect("must write");

        let cache = ResultCache::open(blocker.join("cache"));
        assert!(!cache.is_enabled());

        let query = json!({"site": "A"});
        cache.store(&query, &reading());
        let cached: Option<Reading> = cache.lookup(&query);
        assert!(cached.is_none());
    }

    #[test]
    fn store_swallows_write_failures() {
        let (cache, temp_dir) = create_test_cache();
        fs::remove_dir_all(temp_dir.path().join("cache")).expect("must remove");

        let query = json!({"site": "A"});
        cache.store(&query, &reading());

        let cached: Option<Reading> = cache.lookup(&query);
        assert!(cached.is_none());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let (cache, _temp_dir) = create_test_cache();
        cache.store(&json!({"site": "A"}), &reading());

        let leftovers = fs::read_dir(cache.dir())
            .expect("must list")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn parsed_weather_rows_read_back_bit_identical() {
        let (cache, _temp_dir) = create_test_cache();
        let payload = r#"[
            {"ref_datetime": "2024-01-01 00:00", "valid_datetime": "2024-01-01 01:00",
             "precipitation": 4.317509012096599e-8, "temperature": 271.93000000000006},
            {"ref_datetime": "2024-01-01 00:00", "valid_datetime": "2024-01-01 02:00",
             "precipitation": 1.2345678901234567e-300, "temperature": 1.7976931348623157e308}
        ]"#;
        let fresh: Vec<WeatherRow> = serde_json::from_str(payload).expect("must parse");
        let query = json!({"model": "DWD_ICON-EU", "variables": "Precipitation"});

        cache.store(&query, &fresh);

        let cached: Vec<WeatherRow> = cache.lookup(&query).expect("must hit");
        assert_eq!(cached, fresh);
        let bits = |rows: &[WeatherRow]| -> Vec<u64> {
            rows.iter()
                .flat_map(|row| row.values.values())
                .filter_map(|value| value.as_f64())
                .map(f64::to_bits)
                .collect()
        };
        assert_eq!(bits(&cached), bits(&fresh));
    }
}
