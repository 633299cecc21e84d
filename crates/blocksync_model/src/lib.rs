//! # Blocksync Model
//!
//! Pure data types shared by every blocksync crate.
//!
//! This crate provides:
//! - [`Block`] and [`BlockKind`], the tagged block tree of a remote document
//! - [`RichTextRun`] spans with their [`Annotations`]
//! - [`TableBlock`] with its fixed-width [`TableRow`]s
//! - [`RemoteDocument`] metadata and the [`DocumentTree`] it heads
//! - [`FrontMatter`], the ordered key-value header of a local markdown file
//! - The JSON wire mapping for the remote block API ([`wire`])
//!
//! ## Design Principles
//!
//! - **No I/O**: this crate only builds and decodes values
//! - **Owned trees**: blocks are assembled bottom-up and never shared
//!   between documents
//! - **Lossless where possible**: unknown block types survive as
//!   [`BlockKind::Unsupported`] instead of being dropped

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod block;
mod document;
mod error;
mod front_matter;
mod id;
mod rich_text;
mod table;
pub mod wire;

pub use block::{Block, BlockKind};
pub use document::{DocumentTree, ObjectType, ParentRef, PropertyMap, RemoteDocument};
pub use error::{ModelError, ModelResult};
pub use front_matter::{split_front_matter, FrontMatter};
pub use id::{compact_id, normalize_id};
pub use rich_text::{plain_text, Annotations, RichTextRun};
pub use table::{TableBlock, TableRow};
