//! HTTP transport abstraction.
//!
//! The client speaks to the remote API through the [`HttpClient`] trait so
//! tests can substitute an in-memory server. [`ReqwestClient`] is the
//! blocking network implementation.

use crate::error::{ClientError, ClientResult};
use std::sync::Arc;
use std::time::Duration;

/// HTTP methods used by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Returns true for methods that change remote state.
    pub fn is_write(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

/// An outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL, including the query string.
    pub url: String,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<String>,
}

impl HttpRequest {
    /// Returns the path and query relative to `base_url`.
    pub fn path<'a>(&'a self, base_url: &str) -> &'a str {
        self.url
            .strip_prefix(base_url)
            .unwrap_or(&self.url)
            .trim_start_matches('/')
    }
}

/// A response as seen by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lower-cased.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with a JSON body and no headers.
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// Returns a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parses the `Retry-After` header as whole or fractional seconds.
    pub fn retry_after(&self) -> Option<Duration> {
        let secs: f64 = self.header("retry-after")?.trim().parse().ok()?;
        (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. An `Err`
/// means the request never produced a response (connection failure,
/// timeout); every HTTP status, including errors, is an `Ok`.
pub trait HttpClient: Send + Sync {
    /// Executes one request.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}

impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        (**self).execute(request)
    }
}

/// Blocking network client backed by `reqwest`.
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: Duration) -> ClientResult<Self> {
        let inner = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::transport_fatal(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.inner.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().map_err(|e| e.to_string())?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_parsing() {
        let response = HttpResponse::json(429, "{}").with_header("Retry-After", "2");
        assert_eq!(response.retry_after(), Some(Duration::from_secs(2)));

        let response = HttpResponse::json(429, "{}").with_header("retry-after", "0.5");
        assert_eq!(response.retry_after(), Some(Duration::from_millis(500)));

        let response = HttpResponse::json(429, "{}").with_header("retry-after", "soon");
        assert_eq!(response.retry_after(), None);
        assert!(!response.is_success());
    }

    #[test]
    fn request_path() {
        let request = HttpRequest {
            method: Method::Get,
            url: "https://api.notion.com/v1/blocks/abc/children?page_size=100".into(),
            headers: Vec::new(),
            body: None,
        };
        assert_eq!(
            request.path("https://api.notion.com/v1"),
            "blocks/abc/children?page_size=100"
        );
        assert!(!request.method.is_write());
        assert!(Method::Delete.is_write());
    }
}
