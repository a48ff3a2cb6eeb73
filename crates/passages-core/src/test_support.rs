//! In-process fakes shared by unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;

use crate::api::{FetchError, PageSource};
use crate::models::{PageRequest, PageResponse, ProgressEvent, Record};

/// Serves a synthetic dataset of `total` records `{"id": n}`.
#[derive(Default)]
pub struct FakeSource {
    total: u64,
    failures: HashMap<u32, FetchError>,
    delays: HashMap<u32, Duration>,
    short: HashMap<u32, usize>,
    skips: Mutex<Vec<usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeSource {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn failing(mut self, index: u32, error: FetchError) -> Self {
        self.failures.insert(index, error);
        self
    }

    pub fn delayed(mut self, index: u32, millis: u64) -> Self {
        self.delays.insert(index, Duration::from_millis(millis));
        self
    }

    /// Page `index` returns only `len` records.
    pub fn short(mut self, index: u32, len: usize) -> Self {
        self.short.insert(index, len);
        self
    }

    pub fn skips(&self) -> Vec<usize> {
        self.skips.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.skips.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn page(&self, request: PageRequest) -> PageResponse {
        let start = (request.skip as u64).min(self.total);
        let end = (start + request.limit as u64).min(self.total);
        let mut data: Vec<Record> = (start..end).map(|id| json!({ "id": id })).collect();
        if let Some(&len) = self.short.get(&request.index) {
            data.truncate(len);
        }
        PageResponse {
            data,
            total: self.total,
        }
    }
}

impl PageSource for FakeSource {
    fn fetch_page(
        &self,
        request: PageRequest,
    ) -> impl Future<Output = Result<PageResponse, FetchError>> + Send {
        async move {
            self.skips.lock().unwrap().push(request.skip);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if let Some(&delay) = self.delays.get(&request.index) {
                tokio::time::sleep(delay).await;
            } else {
                tokio::task::yield_now().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.failures.get(&request.index) {
                Some(error) => Err(error.clone()),
                None => Ok(self.page(request)),
            }
        }
    }
}

/// Ids of `records`, in order.
pub fn ids(records: &[Record]) -> Vec<u64> {
    records.iter().filter_map(|r| r["id"].as_u64()).collect()
}

/// Collects progress events.
#[derive(Default)]
pub struct ProgressLog(Mutex<Vec<ProgressEvent>>);

impl ProgressLog {
    pub fn push(&self, event: &ProgressEvent) {
        self.0.lock().unwrap().push(event.clone());
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.0.lock().unwrap().clone()
    }
}
