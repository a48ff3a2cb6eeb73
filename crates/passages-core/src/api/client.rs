//! HTTP client for the passages REST API.

use reqwest::{header, Client};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::models::{PageRequest, PageResponse, Record};

use super::{FetchError, PageSource};

/// User agent sent with every request
const USER_AGENT: &str = concat!("passages/", env!("CARGO_PKG_VERSION"));

/// API client for the passages service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    resource: String,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// No request timeout is set: page downloads can be large and the caller
    /// bounds the whole acquisition instead.
    pub fn new(base_url: &str, resource: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            resource: resource.trim_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(&config.base_url, &config.resource)
    }

    /// URL of the paginated endpoint
    pub fn pages_url(&self) -> String {
        format!("{}/api/v2/{}", self.base_url, self.resource)
    }

    /// URL of the older unpaginated endpoint
    pub fn legacy_url(&self) -> String {
        format!("{}/api/v1/{}", self.base_url, self.resource)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(FetchError::from_status(status, &body))
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, usize)]) -> Result<PageResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("GET {} failed: {}", url, e)))?;

        let response = Self::check_response(response).await?;

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read body from {}: {}", url, e)))?;
        serde_json::from_str(&text)
            .map_err(|e| FetchError::InvalidResponse(format!("Failed to parse page from {}: {}", url, e)))
    }

    /// Fetch one page of passages
    pub async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse, FetchError> {
        let url = self.pages_url();
        debug!(page = request.index, skip = request.skip, limit = request.limit, "Requesting page");

        let page = self
            .get_json(&url, &[("$limit", request.limit), ("$skip", request.skip)])
            .await?;

        debug!(page = request.index, records = page.data.len(), total = page.total, "Page received");
        Ok(page)
    }

    /// Fetch the whole dataset from the unpaginated v1 endpoint in one request
    pub async fn fetch_legacy(&self) -> Result<Vec<Record>, FetchError> {
        let url = self.legacy_url();

        #[derive(Deserialize)]
        struct LegacyResponse {
            #[serde(default)]
            data: Vec<Record>,
        }

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("GET {} failed: {}", url, e)))?;
        let response = Self::check_response(response).await?;

        let parsed: LegacyResponse = response.json().await?;
        debug!(records = parsed.data.len(), "Legacy dataset received");
        Ok(parsed.data)
    }
}

impl PageSource for ApiClient {
    fn fetch_page(
        &self,
        request: PageRequest,
    ) -> impl std::future::Future<Output = Result<PageResponse, FetchError>> + Send {
        ApiClient::fetch_page(self, request)
    }
}
