//! # Blocksync Convert
//!
//! Stateless conversion between markdown text and block trees.
//!
//! This crate provides:
//! - [`blocks_to_markdown`]: renders a block tree with semantic spacing
//! - [`markdown_to_blocks`]: a line scanner producing a block tree
//! - [`clean_markdown`]: the normalization pre-pass run before scanning
//! - [`parse_inline`] / [`render_inline`]: the rich text tokenizer and
//!   renderer
//! - [`normalize_language`]: code language alias resolution
//!
//! ## Round trips
//!
//! Rendering a parsed document is not byte-identical to the input, but it
//! is a fixed point: parsing and rendering the output again yields the
//! same text, and no text content is lost along the way.
//!
//! ## Example
//!
//! ```
//! use blocksync_convert::{blocks_to_markdown, markdown_to_blocks};
//!
//! let blocks = markdown_to_blocks("# Title\n\nSome **bold** text.\n");
//! assert_eq!(blocks.len(), 2);
//! let markdown = blocks_to_markdown(&blocks);
//! assert_eq!(markdown, "# Title\n\nSome **bold** text.\n");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clean;
mod inline;
mod language;
mod parse;
mod render;

pub use clean::clean_markdown;
pub use inline::{parse_inline, render_inline};
pub use language::{normalize_language, PLAIN_TEXT};
pub use parse::{markdown_file_to_blocks, markdown_to_blocks, split_code, MAX_CODE_CHARS};
pub use render::blocks_to_markdown;
