//! Fenced code block extraction, including Documenter-style at-blocks.

/// What a fenced block is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockKind {
    /// ```@docs - list of symbols whose docstrings are spliced in
    Docs,
    /// ```@meta - page-level settings, not rendered
    Meta,
    /// ```@contents - list of pages and their headings
    Contents,
    /// ```@index - list of docstrings shown on pages
    Index,
    /// ```@example - example code, shown verbatim
    Example,
    /// ```@repl - REPL session, shown verbatim
    Repl,
    /// Ordinary code (default)
    #[default]
    Code,
}

impl BlockKind {
    /// Parse kind from a code fence info string.
    pub fn from_info(info: &str) -> Self {
        let word = info.split_whitespace().next().unwrap_or("");
        match word {
            "@docs" => Self::Docs,
            "@meta" => Self::Meta,
            "@contents" => Self::Contents,
            "@index" => Self::Index,
            "@example" => Self::Example,
            "@repl" => Self::Repl,
            _ => Self::Code,
        }
    }

    /// Whether the block is replaced by generated HTML instead of shown as code.
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Docs | Self::Meta | Self::Contents | Self::Index)
    }
}

/// A parsed fenced code block.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    /// Unique identifier for this block (format: block-{index})
    pub id: String,

    /// Block kind
    pub kind: BlockKind,

    /// Language for highlighting; at-blocks that show code are Julia
    pub language: Option<String>,

    /// Raw block content
    pub source: String,

    /// Line number where the block starts (1-indexed)
    pub line_number: usize,
}

impl CodeBlock {
    /// Create a new code block from its fence info string.
    pub fn new(index: usize, info: &str, source: String, line_number: usize) -> Self {
        let kind = BlockKind::from_info(info);
        let language = match kind {
            BlockKind::Example | BlockKind::Repl => Some("julia".to_string()),
            BlockKind::Code => info
                .split_whitespace()
                .next()
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            _ => None,
        };

        Self {
            id: format!("block-{}", index),
            kind,
            language,
            source,
            line_number,
        }
    }

    /// Symbols listed in a `@docs` block, one per line.
    pub fn symbols(&self) -> Vec<String> {
        self.source
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    /// `Key = value` pairs of a `@meta`, `@contents` or `@index` block.
    pub fn settings(&self) -> Vec<(String, String)> {
        parse_settings(&self.source)
    }
}

/// Parse `Key = value` lines, skipping blanks and comments.
pub fn parse_settings(source: &str) -> Vec<(String, String)> {
    source
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let (key, value) = l.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Parse a literal list such as `["a.md", "b.md"]` into its string items.
pub fn parse_string_list(value: &str) -> Vec<String> {
    value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Options of a `@contents` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentsSpec {
    /// Restrict to these pages (relative source paths); empty means all
    pub pages: Vec<String>,
    /// Deepest heading level listed
    pub depth: u8,
}

impl Default for ContentsSpec {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            depth: 2,
        }
    }
}

impl ContentsSpec {
    /// Read the options from a block's settings.
    pub fn from_block(block: &CodeBlock) -> Self {
        let mut spec = Self::default();
        for (key, value) in block.settings() {
            match key.as_str() {
                "Pages" => spec.pages = parse_string_list(&value),
                "Depth" => {
                    if let Ok(depth) = value.parse::<u8>() {
                        spec.depth = depth.clamp(1, 6);
                    }
                }
                _ => {}
            }
        }
        spec
    }
}
