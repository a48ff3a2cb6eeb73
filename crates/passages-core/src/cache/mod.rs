//! Local caching module for the assembled dataset.
//!
//! This module provides the `CacheStore`, a versioned, TTL-bound store for a
//! single dataset blob, on top of a pluggable key-value `Storage`:
//!
//! - `FileStorage`: one JSON file per key in the cache directory
//! - `MemoryStorage`: in-process map with an optional byte quota
//!
//! Entries are considered stale after 24 hours, and an entry written under a
//! different `CACHE_VERSION` is never reinterpreted. Invalid entries are
//! purged as soon as they are read.

pub mod error;
pub mod storage;
pub mod store;

pub use error::{CacheError, StorageError};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{CacheEntry, CacheStore, PendingWrite, CACHE_KEY, CACHE_TTL_HOURS, CACHE_VERSION};
