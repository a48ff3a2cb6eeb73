//! Single entry point for obtaining the dataset.
//!
//! `Acquirer` serves a valid cached copy when allowed to, otherwise assembles
//! the dataset from the network (adopting a preloaded first page if one is
//! waiting) and writes the result back to the cache. Fetch failures reach
//! the caller; cache write failures never do.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{FetchError, PageSource};
use crate::cache::{CacheStore, PendingWrite};
use crate::fetch::{ConcurrencyStrategy, Paginator};
use crate::models::{ProgressEvent, ProgressFn, Record};
use crate::preload::PreloadHandle;

pub struct Acquirer<S> {
    paginator: Paginator<S>,
    page_size: usize,
    cache: Option<CacheStore>,
    preload: PreloadHandle,
    defer_writes: bool,
    pending_writes: Mutex<Vec<PendingWrite>>,
}

impl<S: PageSource> Acquirer<S> {
    pub fn new(source: S, page_size: usize) -> Self {
        Self {
            paginator: Paginator::new(source),
            page_size: page_size.max(1),
            cache: None,
            preload: PreloadHandle::none(),
            defer_writes: false,
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_preload(mut self, preload: PreloadHandle) -> Self {
        self.preload = preload;
        self
    }

    pub fn with_concurrency(mut self, strategy: ConcurrencyStrategy) -> Self {
        self.paginator = self.paginator.with_concurrency(strategy);
        self
    }

    /// Write the cache on a background worker instead of inline.
    /// Outstanding writes are joined by [`Acquirer::flush_writes`].
    pub fn with_deferred_writes(mut self, defer: bool) -> Self {
        self.defer_writes = defer;
        self
    }

    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    pub fn source(&self) -> &S {
        self.paginator.source()
    }

    /// Get the full dataset.
    ///
    /// With `use_cache`, a valid non-empty cache entry is returned without
    /// touching the network, and a fresh network result is written back.
    pub async fn acquire(
        &self,
        use_cache: bool,
        on_progress: ProgressFn<'_>,
    ) -> Result<Vec<Record>, FetchError> {
        if use_cache {
            if let Some(records) = self.cached() {
                info!(records = records.len(), "Serving dataset from cache");
                ProgressEvent::cached(records.len() as u64).emit(on_progress);
                return Ok(records);
            }
        }

        let records = self.fetch_all(on_progress).await?;
        if use_cache {
            self.store(&records);
        }
        Ok(records)
    }

    /// [`Acquirer::acquire`] bounded by `deadline`.
    ///
    /// Requests still in flight when the deadline passes are not cancelled
    /// at the transport level.
    pub async fn acquire_with_timeout(
        &self,
        use_cache: bool,
        on_progress: ProgressFn<'_>,
        deadline: Duration,
    ) -> Result<Vec<Record>, FetchError> {
        tokio::time::timeout(deadline, self.acquire(use_cache, on_progress))
            .await
            .map_err(|_| FetchError::Timeout(deadline))?
    }

    /// Fetch from the network regardless of the cache, then update the cache.
    pub async fn refresh(&self, on_progress: ProgressFn<'_>) -> Result<Vec<Record>, FetchError> {
        let records = self.fetch_all(on_progress).await?;
        self.store(&records);
        Ok(records)
    }

    /// Wait for deferred cache writes still being tracked. Returns how many
    /// of them were stored.
    pub async fn flush_writes(&self) -> usize {
        let pending = std::mem::take(&mut *self.writes());
        let mut stored = 0;
        for write in pending {
            if write.wait().await {
                stored += 1;
            }
        }
        stored
    }

    fn cached(&self) -> Option<Vec<Record>> {
        let records = self.cache.as_ref()?.get()?;
        if records.is_empty() {
            return None;
        }
        Some(records)
    }

    async fn fetch_all(&self, on_progress: ProgressFn<'_>) -> Result<Vec<Record>, FetchError> {
        info!(page_size = self.page_size, "Fetching dataset");
        let records = match self.preload.take().await {
            Some(first) => {
                self.paginator
                    .continue_from(first, self.page_size, on_progress)
                    .await?
            }
            None => self.paginator.fetch(self.page_size, on_progress).await?,
        };
        info!(records = records.len(), "Dataset fetched");
        Ok(records)
    }

    fn store(&self, records: &[Record]) {
        let Some(cache) = &self.cache else {
            return;
        };
        if records.is_empty() {
            debug!("Not caching an empty dataset");
            return;
        }
        if self.defer_writes {
            let write = cache.set_deferred(records);
            let mut writes = self.writes();
            writes.retain(|pending| !pending.is_finished());
            writes.push(write);
        } else {
            // A failed write is already logged and only means a colder start
            cache.set(records);
        }
    }

    fn writes(&self) -> MutexGuard<'_, Vec<PendingWrite>> {
        self.pending_writes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<S: PageSource + 'static> Acquirer<S> {
    /// Fire-and-forget [`Acquirer::refresh`]; errors are logged and dropped.
    pub fn spawn_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            match this.refresh(None).await {
                Ok(records) => info!(records = records.len(), "Background refresh complete"),
                Err(e) => warn!(error = %e, "Background refresh failed"),
            }
        })
    }
}
