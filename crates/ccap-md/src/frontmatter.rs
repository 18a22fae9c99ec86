//! Frontmatter extraction and parsing.

use serde::Deserialize;

/// Optional YAML frontmatter of a Markdown page.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Frontmatter {
    /// Title override (otherwise the page tree title or first heading)
    #[serde(default)]
    pub title: Option<String>,

    /// Page description for SEO and the search index
    #[serde(default)]
    pub description: Option<String>,

    /// Whether to show in navigation
    #[serde(default = "default_true")]
    pub nav: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Frontmatter {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            nav: true,
        }
    }
}

/// Extract frontmatter from Markdown content.
///
/// Returns the parsed frontmatter and the remaining content after the frontmatter block.
pub fn extract_frontmatter(source: &str) -> Result<(Option<Frontmatter>, &str), FrontmatterError> {
    let trimmed = source.trim_start();

    if !trimmed.starts_with("---") {
        return Ok((None, source));
    }

    let after_open = &trimmed[3..];
    let Some(close_pos) = after_open.find("\n---") else {
        return Err(FrontmatterError::Unclosed);
    };

    let yaml_content = after_open[..close_pos].trim();
    let remaining = &after_open[close_pos + 4..];

    let frontmatter: Frontmatter = if yaml_content.is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(yaml_content)
            .map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?
    };

    Ok((Some(frontmatter), remaining.trim_start()))
}

/// Errors that can occur when parsing frontmatter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed frontmatter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in frontmatter: {0}")]
    InvalidYaml(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_valid_frontmatter() {
        let source = r#"---
title: Public API
description: Exported types and functions
---

# Public
"#;

        let (fm, content) = extract_frontmatter(source).unwrap();
        let fm = fm.unwrap();

        assert_eq!(fm.title.as_deref(), Some("Public API"));
        assert_eq!(
            fm.description.as_deref(),
            Some("Exported types and functions")
        );
        assert!(fm.nav);
        assert!(content.starts_with("# Public"));
    }

    #[test]
    fn handles_no_frontmatter() {
        let source = "# Just Markdown\n\nNo frontmatter here.";

        let (fm, content) = extract_frontmatter(source).unwrap();

        assert!(fm.is_none());
        assert_eq!(content, source);
    }

    #[test]
    fn accepts_empty_block() {
        let (fm, content) = extract_frontmatter("---\n---\n# Body").unwrap();

        assert_eq!(fm, Some(Frontmatter::default()));
        assert_eq!(content, "# Body");
    }

    #[test]
    fn errors_on_unclosed_frontmatter() {
        let result = extract_frontmatter("---\ntitle: Test\n# No closing");

        assert!(matches!(result, Err(FrontmatterError::Unclosed)));
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let result = extract_frontmatter("---\ntitle: [invalid yaml\n---\n");

        assert!(matches!(result, Err(FrontmatterError::InvalidYaml(_))));
    }
}
