//! Paginated fetch-and-cache engine for the waste-collection passages API.
//!
//! The engine downloads the whole passages dataset from a paginated REST
//! endpoint, keeps a versioned copy on disk for 24 hours, and hands the
//! records to the caller as one ordered collection.
//!
//! - `cache`: versioned, TTL-bound storage for the assembled dataset
//! - `fetch`: bounded-concurrency pagination with ordered assembly
//! - `preload`: adoption of a first-page request started early
//! - `acquire`: the facade composing the three
//! - `api`, `config`, `models`: HTTP client, settings and data shapes

pub mod acquire;
pub mod api;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod models;
pub mod preload;

#[cfg(test)]
mod test_support;

pub use acquire::Acquirer;
pub use api::{ApiClient, FetchError, PageSource};
pub use cache::CacheStore;
pub use config::Config;
pub use models::{ProgressEvent, Record};
pub use preload::PreloadHandle;
