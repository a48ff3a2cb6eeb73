//! Adoption of a first-page request started before the engine existed.
//!
//! A bootstrap step may fire the page-1 request as early as possible and hand
//! the in-flight request over as a `PreloadHandle`. The first acquisition that
//! needs page 1 takes it; nobody can take it twice.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::api::{FetchError, PageSource};
use crate::models::{PageRequest, PageResponse};

type PendingPage = BoxFuture<'static, Result<PageResponse, FetchError>>;

/// At-most-once handle on an externally started page-1 request.
#[derive(Default)]
pub struct PreloadHandle {
    pending: Mutex<Option<PendingPage>>,
}

impl PreloadHandle {
    /// A handle with nothing preloaded.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_future<F>(request: F) -> Self
    where
        F: Future<Output = Result<PageResponse, FetchError>> + Send + 'static,
    {
        Self {
            pending: Mutex::new(Some(request.boxed())),
        }
    }

    /// Start fetching page 1 from `source` on the runtime right away.
    pub fn spawn<S>(source: S, page_size: usize) -> Self
    where
        S: PageSource + 'static,
    {
        let task = tokio::spawn(async move { source.fetch_page(PageRequest::first(page_size)).await });
        Self::from_future(async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(FetchError::Network(format!("Preload task failed: {}", e))),
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingPage>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Claim the preloaded first page.
    ///
    /// The handle is cleared before the request is awaited, so concurrent
    /// callers cannot both adopt it. A failed preload yields `None`; the
    /// caller then requests page 1 itself.
    pub async fn take(&self) -> Option<PageResponse> {
        let pending = self.lock().take()?;
        match pending.await {
            Ok(page) => {
                debug!(records = page.data.len(), total = page.total, "Adopted preloaded first page");
                Some(page)
            }
            Err(e) => {
                debug!(error = %e, "Preload failed, falling back to a fresh request");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSource;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_take_once() {
        let handle = PreloadHandle::from_future(async {
            Ok::<_, FetchError>(PageResponse {
                data: vec![serde_json::json!({"id": 0})],
                total: 1,
            })
        });
        assert!(handle.is_pending());

        let page = handle.take().await.unwrap();
        assert_eq!(page.total, 1);
        assert!(!handle.is_pending());
        assert!(handle.take().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_preload_is_swallowed_and_cleared() {
        let handle = PreloadHandle::from_future(async {
            Err::<PageResponse, _>(FetchError::Server {
                status: 502,
                body: String::new(),
            })
        });
        assert!(handle.take().await.is_none());
        assert!(!handle.is_pending());
    }

    #[tokio::test]
    async fn test_empty_handle() {
        let handle = PreloadHandle::none();
        assert!(!handle.is_pending());
        assert!(handle.take().await.is_none());
    }

    #[tokio::test]
    async fn test_spawn_starts_immediately() {
        let source = Arc::new(FakeSource::new(42));
        let handle = PreloadHandle::spawn(Arc::clone(&source), 10);

        let page = handle.take().await.unwrap();

        assert_eq!(page.data.len(), 10);
        assert_eq!(page.total, 42);
        assert_eq!(source.skips(), vec![0]);
    }
}
