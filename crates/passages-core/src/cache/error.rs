use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Storage quota exceeded: {needed} bytes needed, quota is {quota} bytes")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// Reasons a stored entry is rejected. Handled inside the cache store, which
/// purges the entry and reports a miss.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache entry is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Cache version mismatch: found {found}, expected {expected}")]
    VersionMismatch { found: String, expected: &'static str },

    #[error("Cache entry expired ({age_hours}h old)")]
    Expired { age_hours: i64 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
