use serde::Serialize;

/// Callback invoked with progress notifications. Purely observational.
pub type ProgressFn<'a> = Option<&'a (dyn Fn(&ProgressEvent) + Send + Sync)>;

/// Snapshot of how far an acquisition has got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub current: u64,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub from_cache: bool,
    pub completed: bool,
}

impl ProgressEvent {
    pub fn cached(count: u64) -> Self {
        Self {
            current: count,
            total: count,
            page: None,
            from_cache: true,
            completed: true,
        }
    }

    pub fn page_done(current: u64, total: u64, page: u32) -> Self {
        Self {
            current,
            total,
            page: Some(page),
            from_cache: false,
            completed: false,
        }
    }

    pub fn finished(current: u64, total: u64) -> Self {
        Self {
            current,
            total,
            page: None,
            from_cache: false,
            completed: true,
        }
    }

    /// Completion percentage, or `None` when the total is unknown.
    pub fn percent(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let pct = (self.current as f64 / self.total as f64 * 100.0).round();
        Some(pct.clamp(0.0, 100.0) as u8)
    }

    pub(crate) fn emit(self, on_progress: ProgressFn<'_>) {
        if let Some(callback) = on_progress {
            callback(&self);
        }
    }
}
