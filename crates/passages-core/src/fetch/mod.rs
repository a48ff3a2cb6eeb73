//! Pagination engine.
//!
//! `Paginator` walks the paginated endpoint page by page, issuing the pages
//! after the first in batches no wider than the current `ConcurrencyLimit`.
//! Pages that fail after the first are replaced by empty pages; the assembled
//! sequence always follows API order.

pub mod concurrency;
pub mod paginator;

pub use concurrency::{ConcurrencyLimit, ConcurrencyStrategy, NetworkClass};
pub use paginator::Paginator;
