use serde::{Deserialize, Serialize};

/// One passage of a collection vehicle, exactly as the API returned it.
pub type Record = serde_json::Value;

/// Body of `GET /api/v2/{resource}`.
///
/// Missing fields decode as empty/zero rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub data: Vec<Record>,
    #[serde(default)]
    pub total: u64,
}

/// Coordinates of a single page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page index
    pub index: u32,
    pub limit: usize,
    pub skip: usize,
}

impl PageRequest {
    pub fn new(index: u32, limit: usize) -> Self {
        debug_assert!(index >= 1, "page indices are 1-based");
        Self {
            index,
            limit,
            skip: (index.saturating_sub(1) as usize) * limit,
        }
    }

    pub fn first(limit: usize) -> Self {
        Self::new(1, limit)
    }
}

/// A page of records tagged with its position in the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub index: u32,
    pub records: Vec<Record>,
}

impl Page {
    pub fn new(index: u32, records: Vec<Record>) -> Self {
        Self { index, records }
    }

    /// Placeholder for a page whose request failed.
    pub fn empty(index: u32) -> Self {
        Self::new(index, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
