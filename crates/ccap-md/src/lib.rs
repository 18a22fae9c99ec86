//! Markdown parser for CarrierCapture documentation pages.
//!
//! Extracts optional YAML frontmatter, headings for the table of contents and
//! fenced blocks, including the `@docs`/`@meta`/`@contents`/`@index` at-blocks.

pub mod codeblock;
pub mod frontmatter;
pub mod parser;

pub use codeblock::{BlockKind, CodeBlock, ContentsSpec};
pub use frontmatter::Frontmatter;
pub use parser::{markdown_options, parse_markdown, slugify, ParseError, ParsedDoc, TocEntry};
