//! REST API client module for the passages service.
//!
//! This module provides the `ApiClient` for fetching pages of waste-collection
//! passages, and the `PageSource` trait the pagination engine is written
//! against.
//!
//! The API is public and unauthenticated; requests carry no credentials.

pub mod client;
pub mod error;
pub mod source;

pub use client::ApiClient;
pub use error::FetchError;
pub use source::PageSource;
