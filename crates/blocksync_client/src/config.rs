//! Configuration for the remote client.

use std::time::Duration;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";

/// Default `Notion-Version` header value.
pub const DEFAULT_API_VERSION: &str = "2022-06-28";

/// Configuration for remote API access.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Integration token sent as a bearer token.
    pub api_key: String,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Value of the `Notion-Version` header.
    pub api_version: String,
    /// Page size requested from paginated endpoints.
    pub page_size: usize,
    /// Maximum blocks per create or append request.
    pub max_batch_size: usize,
    /// Default depth for recursive child fetches.
    pub max_depth: usize,
    /// Minimum time between two outbound requests.
    pub min_request_interval: Duration,
    /// Upper bound on a server-requested retry delay.
    pub max_retry_delay: Duration,
    /// Request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates a configuration with default limits.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            page_size: 100,
            max_batch_size: 100,
            max_depth: 3,
            min_request_interval: Duration::from_millis(350),
            max_retry_delay: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the API version header.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the page size, clamped to 1..=100.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.clamp(1, 100);
        self
    }

    /// Sets the write batch size, clamped to 1..=100.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.clamp(1, 100);
        self
    }

    /// Sets the default recursion depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the minimum interval between requests.
    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    /// Sets the cap on server-requested retry delays.
    pub fn with_max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay = delay;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("")
    }
}
