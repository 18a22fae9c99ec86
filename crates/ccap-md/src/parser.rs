//! Markdown document parser.

use std::collections::HashMap;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::codeblock::CodeBlock;
use crate::frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError};

/// A parsed Markdown page.
#[derive(Debug, Clone)]
pub struct ParsedDoc {
    /// Parsed frontmatter (if present)
    pub frontmatter: Option<Frontmatter>,

    /// Markdown content (without frontmatter)
    pub content: String,

    /// Extracted fenced code blocks, in document order
    pub code_blocks: Vec<CodeBlock>,

    /// Table of contents entries
    pub toc: Vec<TocEntry>,
}

impl ParsedDoc {
    /// Frontmatter title, falling back to the first level-1 heading.
    pub fn title(&self) -> Option<String> {
        self.frontmatter
            .as_ref()
            .and_then(|f| f.title.clone())
            .or_else(|| {
                self.toc
                    .iter()
                    .find(|e| e.level == 1)
                    .map(|e| e.title.clone())
            })
    }

    /// Whether the page wants a navigation entry.
    pub fn in_nav(&self) -> bool {
        self.frontmatter.as_ref().map(|f| f.nav).unwrap_or(true)
    }
}

/// A table of contents entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    /// Heading text
    pub title: String,
    /// Anchor ID
    pub id: String,
    /// Heading level (1-6)
    pub level: u8,
}

/// Errors that can occur when parsing a page.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

/// Markdown extensions enabled for every page.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Parse a Markdown page.
///
/// Extracts frontmatter, fenced code blocks and the table of contents.
pub fn parse_markdown(source: &str) -> Result<ParsedDoc, ParseError> {
    let (frontmatter, content) = extract_frontmatter(source)?;

    let mut code_blocks = Vec::new();
    let mut toc = Vec::new();

    let prefix_len = source.len() - content.len();
    let line_offset = source[..prefix_len].matches('\n').count();

    let mut current_block: Option<(String, String, usize)> = None; // (info, text, line)
    let mut current_heading: Option<(u8, String)> = None;
    let mut seen_ids: HashMap<String, usize> = HashMap::new();

    for (event, range) in Parser::new_ext(content, markdown_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) => info.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                let line = content[..range.start].matches('\n').count() + line_offset + 1;
                current_block = Some((info, String::new(), line));
            }

            Event::End(TagEnd::CodeBlock) => {
                if let Some((info, text, line)) = current_block.take() {
                    let index = code_blocks.len();
                    code_blocks.push(CodeBlock::new(index, &info, text, line));
                }
            }

            Event::Start(Tag::Heading { level, .. }) => {
                current_heading = Some((level as u8, String::new()));
            }

            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, title)) = current_heading.take() {
                    let title = title.trim().to_string();
                    let slug = slugify(&title);
                    let count = seen_ids.entry(slug.clone()).or_insert(0);
                    let id = if *count == 0 {
                        slug
                    } else {
                        format!("{}-{}", slug, count)
                    };
                    *count += 1;
                    toc.push(TocEntry { title, id, level });
                }
            }

            Event::Text(text) | Event::Code(text) => {
                if let Some((_, ref mut buf, _)) = current_block {
                    buf.push_str(&text);
                } else if let Some((_, ref mut heading_text)) = current_heading {
                    heading_text.push_str(&text);
                }
            }

            _ => {}
        }
    }

    Ok(ParsedDoc {
        frontmatter,
        content: content.to_string(),
        code_blocks,
        toc,
    })
}

/// Convert a heading to a URL-safe slug.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codeblock::BlockKind;

    #[test]
    fn parses_complete_page() {
        let source = r#"---
description: Exported API
---

# Public

```@meta
CurrentModule = CarrierCapture
```

## Potentials

```@docs
Potential
fit_pot!
```

## Usage

```julia
pot = Potential()
```
"#;

        let doc = parse_markdown(source).unwrap();

        assert_eq!(
            doc.frontmatter.as_ref().unwrap().description.as_deref(),
            Some("Exported API")
        );
        assert_eq!(doc.title().as_deref(), Some("Public"));

        assert_eq!(doc.code_blocks.len(), 3);
        assert_eq!(doc.code_blocks[0].kind, BlockKind::Meta);
        assert_eq!(doc.code_blocks[1].kind, BlockKind::Docs);
        assert_eq!(doc.code_blocks[1].symbols(), vec!["Potential", "fit_pot!"]);
        assert_eq!(doc.code_blocks[2].kind, BlockKind::Code);
        assert_eq!(doc.code_blocks[2].language.as_deref(), Some("julia"));
        assert_eq!(doc.code_blocks[2].id, "block-2");

        assert_eq!(doc.toc.len(), 3);
        assert_eq!(doc.toc[1].title, "Potentials");
        assert_eq!(doc.toc[1].level, 2);
        assert_eq!(doc.toc[1].id, "potentials");
    }

    #[test]
    fn tracks_block_lines() {
        let source = "---\ntitle: T\n---\n# A\n\n```@docs\nf\n```\n";

        let doc = parse_markdown(source).unwrap();

        assert_eq!(doc.code_blocks[0].line_number, 6);
    }

    #[test]
    fn parses_without_frontmatter() {
        let doc = parse_markdown("# Just Markdown\n\nNo frontmatter.").unwrap();

        assert!(doc.frontmatter.is_none());
        assert!(doc.in_nav());
        assert_eq!(doc.title().as_deref(), Some("Just Markdown"));
    }

    #[test]
    fn heading_keeps_inline_code() {
        let doc = parse_markdown("## The `fit_pot!` function").unwrap();

        assert_eq!(doc.toc[0].title, "The fit_pot! function");
        assert_eq!(doc.toc[0].id, "the-fit-pot-function");
    }

    #[test]
    fn deduplicates_heading_ids() {
        let doc = parse_markdown("## Usage\n\n## Usage\n\n## Usage").unwrap();

        let ids: Vec<_> = doc.toc.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["usage", "usage-1", "usage-2"]);
    }

    #[test]
    fn slugify_works() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Library Reference"), "library-reference");
        assert_eq!(slugify("Capture (rate)"), "capture-rate");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
    }
}
