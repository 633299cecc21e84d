//! # Blocksync Client
//!
//! Blocking client for the Notion block API.
//!
//! This crate provides:
//! - [`RemoteClient`]: paginated reads, batched writes and title lookup
//! - [`HttpClient`]: the transport seam, with [`ReqwestClient`] for the
//!   network and [`FakeNotion`] for tests
//! - [`RateLimiter`]: a minimum interval between consecutive requests
//! - [`ClientConfig`]: endpoint, credentials and limits
//!
//! ## Failure model
//!
//! Every listing is followed to the last page before a result is
//! returned, so callers never see a truncated tree. A 429 is retried once
//! after the server's `Retry-After` delay. Batched appends report which
//! batch failed and how many blocks were already written.
//!
//! ## Example
//!
//! ```
//! use blocksync_client::{ClientConfig, FakeNotion, RemoteClient};
//! use blocksync_model::ParentRef;
//!
//! let fake = FakeNotion::new();
//! let page = fake.add_page(&ParentRef::Workspace, "Notes");
//! let client = RemoteClient::new(ClientConfig::new("secret"), fake);
//! let tree = client.fetch_document(&page).unwrap();
//! assert_eq!(tree.document.title, "Notes");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod fake;
mod http;
mod limiter;

pub use client::{RemoteClient, TitleScope};
pub use config::{ClientConfig, DEFAULT_API_VERSION, DEFAULT_BASE_URL};
pub use error::{ClientError, ClientResult};
pub use fake::{FakeNotion, LoggedRequest};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, ReqwestClient};
pub use limiter::RateLimiter;
