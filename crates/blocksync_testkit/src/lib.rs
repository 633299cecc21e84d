//! # Blocksync Testkit
//!
//! Test utilities for blocksync.
//!
//! This crate provides:
//! - Markdown fixtures covering every block type
//! - Temporary document workspaces
//! - Wire-format block builders for fake servers
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blocksync_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_workspace() {
//!     let ws = TempWorkspace::new();
//!     let path = ws.write("doc.md", &document("Title", "spec", "Body"));
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod payloads;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::payloads::*;
}

pub use fixtures::*;
pub use generators::*;
pub use payloads::*;
