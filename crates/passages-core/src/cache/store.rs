use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::models::Record;

use super::{CacheError, FileStorage, Storage, StorageError};

/// Storage key of the dataset entry.
pub const CACHE_KEY: &str = "dechets_passages_cache";

/// Schema tag written into every entry. Bumping it invalidates every
/// previously stored entry.
pub const CACHE_VERSION: &str = "1.0.0";

/// Entries older than this are stale.
pub const CACHE_TTL_HOURS: i64 = 24;

/// Upper bound on how long a deferred write may take before it is abandoned.
const WRITE_DEADLINE: StdDuration = StdDuration::from_secs(2);

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub version: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub data: T,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T) -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.timestamp
    }

    /// Short relative age such as "5m ago", rounded to the nearest hour or
    /// day past the first hour.
    pub fn age_display(&self) -> String {
        let age = self.age();
        // Negative ages come from clock skew
        if age < Duration::minutes(1) {
            return "just now".to_string();
        }
        let (amount, unit) = if age < Duration::hours(1) {
            (age.num_minutes(), 'm')
        } else if age < Duration::days(1) {
            ((age.num_minutes() + 30) / 60, 'h')
        } else {
            ((age.num_hours() + 12) / 24, 'd')
        };
        format!("{}{} ago", amount, unit)
    }

    /// An entry written in the future (clock skew) is not expired.
    pub fn is_expired(&self) -> bool {
        self.age() > Duration::hours(CACHE_TTL_HOURS)
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.version != CACHE_VERSION {
            return Err(CacheError::VersionMismatch {
                found: self.version.clone(),
                expected: CACHE_VERSION,
            });
        }
        if self.is_expired() {
            return Err(CacheError::Expired {
                age_hours: self.age().num_hours(),
            });
        }
        Ok(())
    }
}

/// Just the timestamp, for `age_hours`. Accepts any version or payload.
#[derive(Deserialize)]
struct EntryTimestamp {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
}

/// Versioned, TTL-bound store for the assembled dataset.
///
/// Reads and writes take no lock across calls; concurrent writers race and
/// the last write wins.
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn Storage>,
    key: String,
}

impl CacheStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            key: CACHE_KEY.to_string(),
        }
    }

    /// File-backed store inside `cache_dir`.
    pub fn open(cache_dir: PathBuf) -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(FileStorage::new(cache_dir)?)))
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    fn load(&self) -> Result<Option<CacheEntry<Vec<Record>>>, CacheError> {
        let Some(raw) = self.storage.get_item(&self.key)? else {
            return Ok(None);
        };
        let entry: CacheEntry<Vec<Record>> = serde_json::from_str(&raw)?;
        entry.check()?;
        Ok(Some(entry))
    }

    /// The stored entry if it is present and valid. Anything unreadable,
    /// stale or from another version is removed before returning `None`.
    pub fn entry(&self) -> Option<CacheEntry<Vec<Record>>> {
        match self.load() {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key = %self.key, error = %e, "Purging invalid cache entry");
                self.clear();
                None
            }
        }
    }

    pub fn get(&self) -> Option<Vec<Record>> {
        self.entry().map(|entry| entry.data)
    }

    pub fn is_valid(&self) -> bool {
        self.get().is_some()
    }

    fn serialize(data: &[Record]) -> Result<String, serde_json::Error> {
        serde_json::to_string(&CacheEntry::new(data))
    }

    /// Persist `data` now. Returns false if it could not be stored; that only
    /// means the cache was not updated.
    pub fn set(&self, data: &[Record]) -> bool {
        let written = Self::serialize(data)
            .map_err(StorageError::from)
            .and_then(|json| self.storage.set_item(&self.key, &json));
        match written {
            Ok(()) => {
                debug!(key = %self.key, records = data.len(), "Cache updated");
                true
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to write cache");
                false
            }
        }
    }

    /// Persist `data` on a blocking worker without holding up the caller.
    ///
    /// The entry is serialised (and timestamped) immediately. Must be called
    /// from within a Tokio runtime.
    pub fn set_deferred(&self, data: &[Record]) -> PendingWrite {
        let json = match Self::serialize(data) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to serialize cache entry");
                return PendingWrite::done(false);
            }
        };

        let storage = Arc::clone(&self.storage);
        let key = self.key.clone();
        let records = data.len();
        let handle = tokio::task::spawn_blocking(move || {
            let result = storage.set_item(&key, &json);
            if result.is_ok() {
                debug!(key = %key, records = records, "Cache updated");
            }
            result
        });

        PendingWrite {
            state: WriteState::Running {
                handle,
                deadline: Instant::now() + WRITE_DEADLINE,
            },
        }
    }

    /// Remove the entry. Best-effort.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove_item(&self.key) {
            debug!(key = %self.key, error = %e, "Failed to clear cache");
        }
    }

    /// Age of the stored entry in whole hours, rounded. Diagnostic only: the
    /// entry is not validated.
    pub fn age_hours(&self) -> Option<i64> {
        let raw = self.storage.get_item(&self.key).ok()??;
        let stamp: EntryTimestamp = serde_json::from_str(&raw).ok()?;
        let age_ms = (Utc::now() - stamp.timestamp).num_milliseconds();
        Some((age_ms as f64 / MILLIS_PER_HOUR).round() as i64)
    }
}

enum WriteState {
    Done(bool),
    Running {
        handle: JoinHandle<Result<(), StorageError>>,
        deadline: Instant,
    },
}

/// A cache write running in the background.
///
/// Awaiting [`PendingWrite::wait`] yields whether it was stored in time.
/// Dropping it abandons the wait; the write itself may still complete.
pub struct PendingWrite {
    state: WriteState,
}

impl PendingWrite {
    fn done(ok: bool) -> Self {
        Self {
            state: WriteState::Done(ok),
        }
    }

    /// True once the write has completed or failed; also for writes that
    /// never started.
    pub fn is_finished(&self) -> bool {
        match &self.state {
            WriteState::Done(_) => true,
            WriteState::Running { handle, .. } => handle.is_finished(),
        }
    }

    pub async fn wait(self) -> bool {
        let (handle, deadline) = match self.state {
            WriteState::Done(ok) => return ok,
            WriteState::Running { handle, deadline } => (handle, deadline),
        };

        match tokio::time::timeout_at(deadline, handle).await {
            Ok(Ok(Ok(()))) => true,
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "Failed to write cache");
                false
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Cache write task failed");
                false
            }
            Err(_) => {
                warn!(deadline = ?WRITE_DEADLINE, "Cache write missed its deadline, abandoning");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
