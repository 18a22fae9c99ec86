//! Docstring index built from module sources.
//!
//! Scans `.jl` files for triple-quoted docstrings that directly precede a
//! definition and indexes them by the defined symbol.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::config::ModuleSource;

/// One docstring attached to a definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Docstring {
    /// Defined symbol, without module prefix
    pub symbol: String,
    /// Module the source belongs to
    pub module: String,
    /// Kind of definition (function, struct, ...)
    pub category: Category,
    /// Markdown body, dedented
    pub text: String,
    /// Source file
    pub path: PathBuf,
    /// Line of the definition (1-indexed)
    pub line: usize,
}

/// Kind of documented definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Function,
    Macro,
    Type,
    Constant,
    Module,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Function => "Function",
            Self::Macro => "Macro",
            Self::Type => "Type",
            Self::Constant => "Constant",
            Self::Module => "Module",
        }
    }
}

/// Errors raised while scanning module sources.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("Module source not found: {0}")]
    MissingSource(String),

    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },
}

/// Docstrings of all configured modules, keyed by symbol.
#[derive(Debug, Default)]
pub struct DocIndex {
    entries: BTreeMap<String, Vec<Docstring>>,
}

impl DocIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a module's source directory (or single file) and add its docstrings.
    ///
    /// Returns the number of docstrings added.
    pub fn scan(&mut self, module: &ModuleSource, dir: &Path) -> Result<usize, DocError> {
        if !dir.exists() {
            return Err(DocError::MissingSource(dir.display().to_string()));
        }

        let mut count = 0;
        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("jl") {
                continue;
            }

            let source = fs::read_to_string(path).map_err(|e| DocError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

            for doc in extract_docstrings(&source, &module.name, path) {
                self.entries.entry(doc.symbol.clone()).or_default().push(doc);
                count += 1;
            }
        }

        tracing::debug!("Indexed {} docstrings from module {}", count, module.name);
        Ok(count)
    }

    /// Insert a docstring directly.
    pub fn insert(&mut self, doc: Docstring) {
        self.entries.entry(doc.symbol.clone()).or_default().push(doc);
    }

    /// Look up a symbol as written in a `@docs` block.
    ///
    /// `Module.name` only matches docstrings of that module; a bare name prefers
    /// `current_module` and falls back to any module. Docstrings are indexed under
    /// their top-level module, so `Module.Sub.name` matches on `Module`.
    pub fn lookup(&self, symbol: &str, current_module: Option<&str>) -> Option<Vec<&Docstring>> {
        let symbol = strip_signature(symbol);
        let (module, name) = match symbol.rsplit_once('.') {
            Some((module, name)) if !name.is_empty() => (Some(top_level(module)), name),
            _ => (None, symbol),
        };

        let docs = self.entries.get(name)?;
        let wanted = module.or(current_module.map(top_level));
        let matching: Vec<&Docstring> = match wanted {
            Some(m) => docs.iter().filter(|d| d.module == m).collect(),
            None => docs.iter().collect(),
        };

        if !matching.is_empty() {
            Some(matching)
        } else if module.is_none() {
            Some(docs.iter().collect())
        } else {
            None
        }
    }

    /// Symbols with a docstring that no page included.
    pub fn unused(&self, used: &BTreeSet<String>) -> Vec<String> {
        self.entries
            .keys()
            .filter(|symbol| !used.contains(*symbol))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn top_level(module: &str) -> &str {
    module.split('.').next().unwrap_or(module)
}

/// `fit_pot!(pot::Potential)` → `fit_pot!`
fn strip_signature(symbol: &str) -> &str {
    let symbol = symbol.trim();
    match symbol.find('(') {
        Some(pos) => symbol[..pos].trim_end(),
        None => symbol,
    }
}

static KEYWORD_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:@\w+\s+)*(function|macro|mutable\s+struct|struct|abstract\s+type|primitive\s+type|const|module|baremodule)\s+(?:[A-Za-z_]\w*\.)*([A-Za-z_][\w!]*)",
    )
    .expect("Invalid definition regex")
});

static SHORT_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z_]\w*\.)*([A-Za-z_][\w!]*)\s*(?:\{[^}]*\})?\(.*\)\s*(?:where\b.*)?=[^=]")
        .expect("Invalid short definition regex")
});

static BARE_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][\w!]*)\s*$").expect("Invalid symbol regex"));

/// Identify what a definition line defines.
fn parse_definition(line: &str) -> Option<(String, Category)> {
    let line = line.trim();

    if let Some(caps) = KEYWORD_DEF.captures(line) {
        let keyword = caps.get(1)?.as_str();
        let name = caps.get(2)?.as_str().to_string();
        let category = if keyword == "function" {
            Category::Function
        } else if keyword == "macro" {
            Category::Macro
        } else if keyword == "const" {
            Category::Constant
        } else if keyword.ends_with("module") {
            Category::Module
        } else {
            Category::Type
        };
        return Some((name, category));
    }

    if let Some(caps) = SHORT_DEF.captures(line) {
        return Some((caps.get(1)?.as_str().to_string(), Category::Function));
    }

    BARE_SYMBOL
        .captures(line)
        .and_then(|caps| caps.get(1))
        .filter(|m| m.as_str() != "end")
        .map(|m| (m.as_str().to_string(), Category::Function))
}

/// Extract all docstrings of one source file.
pub fn extract_docstrings(source: &str, module: &str, path: &Path) -> Vec<Docstring> {
    let lines: Vec<&str> = source.lines().collect();
    let mut docs = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let trimmed = lines[i].trim_start();
        let opener = trimmed
            .strip_prefix("@doc raw")
            .or_else(|| trimmed.strip_prefix("@doc"))
            .map(str::trim_start)
            .unwrap_or(trimmed);

        let mut body: Vec<&str> = Vec::new();
        let end_line;

        if !opener.starts_with("\"\"\"") {
            match single_line_string(opener) {
                Some(text) => {
                    body.push(text);
                    end_line = i;
                }
                None => {
                    i += 1;
                    continue;
                }
            }
        } else if let Some(pos) = opener[3..].find("\"\"\"") {
            let after_open = &opener[3..];
            body.push(&after_open[..pos]);
            end_line = i;
        } else {
            let after_open = &opener[3..];
            if !after_open.trim().is_empty() {
                body.push(after_open);
            }
            let mut j = i + 1;
            loop {
                if j >= lines.len() {
                    return docs;
                }
                if let Some(pos) = lines[j].find("\"\"\"") {
                    body.push(&lines[j][..pos]);
                    break;
                }
                body.push(lines[j]);
                j += 1;
            }
            end_line = j;
        }

        let mut k = end_line + 1;
        while k < lines.len() && lines[k].trim().is_empty() {
            k += 1;
        }

        if let Some((symbol, category)) = lines.get(k).and_then(|l| parse_definition(l)) {
            docs.push(Docstring {
                symbol,
                module: module.to_string(),
                category,
                text: dedent(&body),
                path: path.to_path_buf(),
                line: k + 1,
            });
            i = k + 1;
        } else {
            i = end_line + 1;
        }
    }

    docs
}

/// `"text"` on a line of its own, without escapes.
fn single_line_string(line: &str) -> Option<&str> {
    let inner = line.trim_end().strip_prefix('"')?.strip_suffix('"')?;
    if inner.is_empty() || inner.contains('"') {
        return None;
    }
    Some(inner)
}

/// Remove the common leading indentation, as Julia does for triple-quoted strings.
fn dedent(lines: &[&str]) -> String {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .skip_while(|l| l.trim().is_empty())
        .map(|l| if l.len() >= indent { &l[indent..] } else { l.trim_start() })
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}
