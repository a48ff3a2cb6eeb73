//! Data models for the passages dataset.
//!
//! Records are kept opaque: the engine never looks inside a passage, it only
//! counts, orders and persists them.
//!
//! - `Record`, `PageResponse`: the wire shape of one API page
//! - `Page`, `PageRequest`: one slice of the dataset during assembly
//! - `ProgressEvent`: observational progress notifications

pub mod page;
pub mod progress;

pub use page::{Page, PageRequest, PageResponse, Record};
pub use progress::{ProgressEvent, ProgressFn};
