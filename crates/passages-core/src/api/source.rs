use std::future::Future;
use std::sync::Arc;

use crate::models::{PageRequest, PageResponse};

use super::FetchError;

/// Anything that can serve one page of the dataset.
///
/// `ApiClient` is the production implementation; the pagination engine only
/// depends on this trait.
pub trait PageSource: Send + Sync {
    fn fetch_page(
        &self,
        request: PageRequest,
    ) -> impl Future<Output = Result<PageResponse, FetchError>> + Send;
}

impl<S: PageSource> PageSource for Arc<S> {
    fn fetch_page(
        &self,
        request: PageRequest,
    ) -> impl Future<Output = Result<PageResponse, FetchError>> + Send {
        (**self).fetch_page(request)
    }
}
