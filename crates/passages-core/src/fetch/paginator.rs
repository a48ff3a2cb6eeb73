use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::api::{FetchError, PageSource};
use crate::models::{Page, PageRequest, PageResponse, ProgressEvent, ProgressFn, Record};

use super::concurrency::{self, ConcurrencyStrategy};

/// Assembles the full dataset from a paginated `PageSource`.
pub struct Paginator<S> {
    source: S,
    concurrency: ConcurrencyStrategy,
}

impl<S: PageSource> Paginator<S> {
    /// Serial pagination until told otherwise.
    pub fn new(source: S) -> Self {
        Self {
            source,
            concurrency: concurrency::from_network(None),
        }
    }

    pub fn with_concurrency(mut self, strategy: ConcurrencyStrategy) -> Self {
        self.concurrency = strategy;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch every page of `page_size` records.
    ///
    /// Only a failure of the first page is returned as an error. A
    /// `page_size` of 0 is treated as 1.
    pub async fn fetch(
        &self,
        page_size: usize,
        on_progress: ProgressFn<'_>,
    ) -> Result<Vec<Record>, FetchError> {
        let page_size = page_size.max(1);
        let first = self.source.fetch_page(PageRequest::first(page_size)).await?;
        self.continue_from(first, page_size, on_progress).await
    }

    /// Fetch the pages after an already obtained first page.
    ///
    /// Fails with `InvalidResponse` when the announced total needs more pages
    /// than a page index can address.
    pub async fn continue_from(
        &self,
        first: PageResponse,
        page_size: usize,
        on_progress: ProgressFn<'_>,
    ) -> Result<Vec<Record>, FetchError> {
        let page_size = page_size.max(1);
        let PageResponse {
            data: mut records,
            total,
        } = first;

        // Everything fits in the first page, or the server has nothing more
        if records.len() as u64 >= total || records.len() < page_size {
            debug!(records = records.len(), total = total, "Dataset fits in one page");
            ProgressEvent::finished(records.len() as u64, total).emit(on_progress);
            return Ok(records);
        }

        let page_count = total.div_ceil(page_size as u64);
        let Ok(total_pages) = u32::try_from(page_count) else {
            warn!(total = total, pages = page_count, "Announced total is out of range");
            return Err(FetchError::InvalidResponse(format!(
                "total of {} records would need {} pages of {}",
                total, page_count, page_size
            )));
        };
        if total_pages <= 1 {
            return Ok(records);
        }

        let limit = (self.concurrency)().get();
        info!(
            total = total,
            total_pages = total_pages,
            concurrency = limit,
            "Fetching remaining pages"
        );

        let width = u32::try_from(limit).unwrap_or(u32::MAX);
        let mut start: u32 = 2;
        loop {
            let end = start.saturating_add(width - 1).min(total_pages);
            let mut pages = join_all((start..=end).map(|index| self.fetch_or_empty(index, page_size))).await;
            pages.sort_by_key(|page| page.index);

            let mut last_filled = None;
            for page in pages {
                if !page.is_empty() {
                    last_filled = Some(page.index);
                    records.extend(page.records);
                }
            }

            if let Some(index) = last_filled {
                ProgressEvent::page_done(records.len() as u64, total, index).emit(on_progress);
            }

            if end == total_pages {
                break;
            }
            start = end + 1;
        }

        // The declared total is trusted; a mismatch is only reported
        if records.len() as u64 != total {
            warn!(
                records = records.len(),
                total = total,
                "Assembled record count differs from the total announced by the server"
            );
        }

        ProgressEvent::finished(records.len() as u64, total).emit(on_progress);
        Ok(records)
    }

    async fn fetch_or_empty(&self, index: u32, page_size: usize) -> Page {
        match self.source.fetch_page(PageRequest::new(index, page_size)).await {
            Ok(response) => Page::new(index, response.data),
            Err(e) => {
                warn!(page = index, error = %e, "Page request failed, continuing without it");
                Page::empty(index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ConcurrencyLimit;
    use crate::test_support::{ids, FakeSource, ProgressLog};

    fn paginator(source: FakeSource, limit: ConcurrencyLimit) -> Paginator<FakeSource> {
        Paginator::new(source).with_concurrency(concurrency::fixed(limit))
    }

    #[tokio::test]
    async fn test_single_page_dataset() {
        let paginator = paginator(FakeSource::new(3000), ConcurrencyLimit::SERIAL);
        let log = ProgressLog::default();
        let push = |e: &ProgressEvent| log.push(e);

        let records = paginator.fetch(5000, Some(&push)).await.unwrap();

        assert_eq!(records.len(), 3000);
        assert_eq!(paginator.source().skips(), vec![0]);
        assert_eq!(log.events(), vec![ProgressEvent::finished(3000, 3000)]);
    }

    #[tokio::test]
    async fn test_serial_pagination() {
        let paginator = paginator(FakeSource::new(12000), ConcurrencyLimit::SERIAL);
        let log = ProgressLog::default();
        let push = |e: &ProgressEvent| log.push(e);

        let records = paginator.fetch(5000, Some(&push)).await.unwrap();

        assert_eq!(records.len(), 12000);
        assert_eq!(ids(&records), (0..12000).collect::<Vec<_>>());
        assert_eq!(paginator.source().skips(), vec![0, 5000, 10000]);
        assert_eq!(paginator.source().peak_in_flight(), 1);
        assert_eq!(
            log.events(),
            vec![
                ProgressEvent::page_done(10000, 12000, 2),
                ProgressEvent::page_done(12000, 12000, 3),
                ProgressEvent::finished(12000, 12000),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_page_is_skipped() {
        let source = FakeSource::new(12000).failing(
            2,
            FetchError::Server {
                status: 500,
                body: "boom".into(),
            },
        );
        let paginator = paginator(source, ConcurrencyLimit::SERIAL);
        let log = ProgressLog::default();
        let push = |e: &ProgressEvent| log.push(e);

        let records = paginator.fetch(5000, Some(&push)).await.unwrap();

        assert_eq!(records.len(), 7000);
        let ids = ids(&records);
        assert_eq!(ids[4999], 4999);
        assert_eq!(ids[5000], 10000);
        // Page 2 is not retried
        assert_eq!(paginator.source().request_count(), 3);
        assert_eq!(
            log.events(),
            vec![
                ProgressEvent::page_done(7000, 12000, 3),
                ProgressEvent::finished(7000, 12000),
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_batches_preserve_order() {
        // Page 2 finishes last within its batch
        let source = FakeSource::new(550).delayed(2, 40).delayed(4, 20);
        let paginator = paginator(source, ConcurrencyLimit::FAST);

        let records = paginator.fetch(100, None).await.unwrap();

        assert_eq!(ids(&records), (0..550).collect::<Vec<_>>());
        assert_eq!(paginator.source().request_count(), 6);
        assert_eq!(paginator.source().peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_batch_progress_reports_highest_page() {
        let paginator = paginator(FakeSource::new(500), ConcurrencyLimit::FAST);
        let log = ProgressLog::default();
        let push = |e: &ProgressEvent| log.push(e);

        paginator.fetch(100, Some(&push)).await.unwrap();

        assert_eq!(
            log.events(),
            vec![
                ProgressEvent::page_done(300, 500, 3),
                ProgressEvent::page_done(500, 500, 5),
                ProgressEvent::finished(500, 500),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_dataset() {
        let paginator = paginator(FakeSource::new(0), ConcurrencyLimit::FAST);
        let records = paginator.fetch(5000, None).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(paginator.source().request_count(), 1);
    }

    #[tokio::test]
    async fn test_first_page_failure_propagates() {
        let source = FakeSource::new(12000).failing(1, FetchError::Network("connection refused".into()));
        let paginator = paginator(source, ConcurrencyLimit::SERIAL);

        let err = paginator.fetch(5000, None).await.unwrap_err();

        assert_eq!(err, FetchError::Network("connection refused".into()));
        assert_eq!(paginator.source().request_count(), 1);
    }

    #[tokio::test]
    async fn test_short_first_page_stops_pagination() {
        // The server capped the page below what was asked for
        let source = FakeSource::new(12000).short(1, 1000);
        let paginator = paginator(source, ConcurrencyLimit::SERIAL);

        let records = paginator.fetch(5000, None).await.unwrap();

        assert_eq!(records.len(), 1000);
        assert_eq!(paginator.source().request_count(), 1);
    }

    #[tokio::test]
    async fn test_short_middle_page_is_trusted() {
        // The announced total is not cross-checked: a short page is neither
        // re-fetched nor reported as an error
        let source = FakeSource::new(300).short(2, 40);
        let paginator = paginator(source, ConcurrencyLimit::SERIAL);

        let records = paginator.fetch(100, None).await.unwrap();

        assert_eq!(records.len(), 240);
        assert_eq!(paginator.source().skips(), vec![0, 100, 200]);
    }

    #[tokio::test]
    async fn test_continue_from_does_not_refetch_first_page() {
        let source = FakeSource::new(250);
        let first = source.page(PageRequest::first(100));
        let paginator = paginator(source, ConcurrencyLimit::SERIAL);

        let records = paginator.continue_from(first, 100, None).await.unwrap();

        assert_eq!(ids(&records), (0..250).collect::<Vec<_>>());
        assert_eq!(paginator.source().skips(), vec![100, 200]);
    }

    #[tokio::test]
    async fn test_zero_page_size_treated_as_one() {
        let paginator = paginator(FakeSource::new(3), ConcurrencyLimit::SERIAL);

        let records = paginator.fetch(0, None).await.unwrap();

        assert_eq!(ids(&records), vec![0, 1, 2]);
        assert_eq!(paginator.source().skips(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_unaddressable_total_rejected_before_paging() {
        let paginator = paginator(FakeSource::new(u64::MAX), ConcurrencyLimit::FAST);

        let err = paginator.fetch(100, None).await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidResponse(_)));
        assert_eq!(paginator.source().request_count(), 1);
    }

    #[tokio::test]
    async fn test_uneven_last_batch() {
        // Pages 2..=4 with width 2: batches [2, 3] and [4]
        let paginator = paginator(FakeSource::new(320), ConcurrencyLimit::FAST);

        let records = paginator.fetch(100, None).await.unwrap();

        assert_eq!(ids(&records), (0..320).collect::<Vec<_>>());
        assert_eq!(paginator.source().skips(), vec![0, 100, 200, 300]);
    }

    #[tokio::test]
    async fn test_concurrency_strategy_consulted_per_fetch() {
        let paginator = Paginator::new(FakeSource::new(400))
            .with_concurrency(concurrency::from_network(Some(crate::fetch::NetworkClass::FourG)));
        paginator.fetch(100, None).await.unwrap();
        assert_eq!(paginator.source().peak_in_flight(), 2);
    }
}
