//! Static site builder.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use ccap_md::{parse_markdown, BlockKind, CodeBlock, ContentsSpec, ParsedDoc};

use crate::assets::AssetPipeline;
use crate::config::{to_slash, ConfigError, DocsConfig, PageEntry, PageTarget};
use crate::docstrings::{DocError, DocIndex};
use crate::render::{escape_html, render_doc, render_markdown, RenderOptions};
use crate::templates::{Context, NavItem, PageLink, TemplateEngine, TocEntry};

/// Generates a documentation site from a configuration.
pub trait SiteGenerator {
    fn generate(&self, config: &DocsConfig) -> Result<BuildResult, BuildError>;
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages generated
    pub pages: usize,

    /// Number of docstrings spliced into pages
    pub docstrings: usize,

    /// Number of warnings emitted
    pub warnings: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Page listed in the page tree does not exist: {0}")]
    MissingPage(String),

    #[error("Failed to read: {0}")]
    ReadError(String),

    #[error("Failed to parse Markdown: {path}: {message}")]
    ParseError { path: String, message: String },

    #[error(transparent)]
    Docs(#[from] DocError),

    #[error("No docstring found for '{symbol}' (in {page})")]
    MissingDocstring { page: String, symbol: String },

    #[error("Pages {first} and {second} would both be written to {output}")]
    OutputCollision {
        output: String,
        first: String,
        second: String,
    },

    #[error("Refusing to clean output directory {0}: it contains the docs sources")]
    UnsafeOutput(String),

    #[error("Failed to render template: {0}")]
    TemplateError(String),

    #[error("Failed to write output: {0}")]
    WriteError(String),
}

/// A page to be built.
#[derive(Debug)]
struct PageInfo {
    /// Source path relative to the source directory, with forward slashes
    relative: String,

    /// Output file relative to the build directory
    output: String,

    /// Site-relative URL
    url: String,

    /// Title used in navigation
    nav_title: String,

    /// Title of the page itself
    title: String,

    /// Parsed document
    doc: ParsedDoc,
}

/// A docstring placed on a page, for `@index` blocks.
#[derive(Debug, Clone)]
struct PlacedDoc {
    label: String,
    anchor: String,
    page: usize,
}

/// Static site builder.
pub struct StaticBuilder {
    templates: TemplateEngine,
    live_reload: Option<String>,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new() -> Self {
        Self {
            templates: TemplateEngine::new(),
            live_reload: None,
        }
    }

    /// Add a live reload script to every page (dev server).
    pub fn with_live_reload(mut self, script_url: &str) -> Self {
        self.live_reload = Some(script_url.to_string());
        self
    }

    /// Build the static site.
    pub fn build(&self, config: &DocsConfig) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        config.pages.validate()?;

        let output_dir = config.build_dir();
        prepare_output(&output_dir, config)?;

        let pages = self.load_pages(config)?;

        let mut warnings = 0;
        let index = self.index_modules(config, &mut warnings)?;
        let (mut blocks, placed, used) = self.expand_docs(config, &pages, &index, &mut warnings)?;
        expand_listings(&pages, &placed, &mut blocks);

        for symbol in index.unused(&used) {
            tracing::warn!("Docstring for '{}' is not included in any page", symbol);
            warnings += 1;
        }

        let nav = build_navigation(&config.pages.0, &pages, &mut 0);

        pages
            .par_iter()
            .enumerate()
            .map(|(i, page)| self.build_page(config, &pages, i, page, &nav, &blocks[i]))
            .collect::<Result<Vec<()>, BuildError>>()?;

        self.generate_assets(config)?;
        self.generate_search_index(config, &pages)?;
        self.generate_sitemap(config, &pages)?;

        let duration = start.elapsed();

        Ok(BuildResult {
            pages: pages.len(),
            docstrings: placed.len(),
            warnings,
            duration_ms: duration.as_millis() as u64,
            output_dir,
        })
    }

    /// Read and parse every page of the tree, in reading order.
    fn load_pages(&self, config: &DocsConfig) -> Result<Vec<PageInfo>, BuildError> {
        let source_dir = config.source_dir();
        let mut pages = Vec::new();
        let mut outputs: HashMap<String, String> = HashMap::new();

        for flat in config.pages.flatten() {
            let path = source_dir.join(&flat.path);
            if !path.is_file() {
                return Err(BuildError::MissingPage(path.display().to_string()));
            }

            let content = fs::read_to_string(&path)
                .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

            let doc = parse_markdown(&content).map_err(|e| BuildError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

            let relative = to_slash(&flat.path);
            let (output, url) = page_location(&relative, config.format.pretty_urls);
            if let Some(first) = outputs.insert(output.clone(), relative.clone()) {
                return Err(BuildError::OutputCollision {
                    output,
                    first,
                    second: relative,
                });
            }

            let stem = flat
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(capitalize)
                .unwrap_or_else(|| "Untitled".to_string());
            let nav_title = flat.title.clone().or_else(|| doc.title()).unwrap_or(stem);
            let title = doc.title().unwrap_or_else(|| nav_title.clone());

            pages.push(PageInfo {
                relative,
                output,
                url,
                nav_title,
                title,
                doc,
            });
        }

        Ok(pages)
    }

    /// Scan configured modules for docstrings.
    fn index_modules(&self, config: &DocsConfig, warnings: &mut usize) -> Result<DocIndex, BuildError> {
        let mut index = DocIndex::new();

        for module in &config.modules {
            let dir = config.module_dir(module);
            match index.scan(module, &dir) {
                Ok(count) => {
                    tracing::info!("Loaded {} docstrings from {}", count, module.name);
                }
                Err(e) if !config.strict => {
                    tracing::warn!("Skipping module {}: {}", module.name, e);
                    *warnings += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(index)
    }

    /// Generate HTML for `@docs` blocks, honouring `@meta` CurrentModule.
    #[allow(clippy::type_complexity)]
    fn expand_docs(
        &self,
        config: &DocsConfig,
        pages: &[PageInfo],
        index: &DocIndex,
        warnings: &mut usize,
    ) -> Result<(Vec<HashMap<usize, String>>, Vec<PlacedDoc>, BTreeSet<String>), BuildError> {
        let mut blocks = Vec::with_capacity(pages.len());
        let mut placed = Vec::new();
        let mut used = BTreeSet::new();
        let mut anchors = HashSet::new();

        for (page_index, page) in pages.iter().enumerate() {
            let mut page_blocks = HashMap::new();
            let mut current_module: Option<String> = None;

            for (block_index, block) in page.doc.code_blocks.iter().enumerate() {
                match block.kind {
                    BlockKind::Meta => {
                        for (key, value) in block.settings() {
                            if key == "CurrentModule" {
                                current_module = Some(value);
                            }
                        }
                    }
                    BlockKind::Docs => {
                        let mut html = String::new();
                        for symbol in block.symbols() {
                            let Some(docs) = index.lookup(&symbol, current_module.as_deref()) else {
                                if config.strict {
                                    return Err(BuildError::MissingDocstring {
                                        page: page.relative.clone(),
                                        symbol,
                                    });
                                }
                                tracing::warn!(
                                    "No docstring found for '{}' (line {} of {})",
                                    symbol,
                                    block.line_number,
                                    page.relative
                                );
                                *warnings += 1;
                                html.push_str(&format!(
                                    "<div class=\"admonition warning\">Missing docstring for <code>{}</code>.</div>\n",
                                    escape_html(&symbol)
                                ));
                                continue;
                            };

                            let first = docs[0];
                            let label = format!("{}.{}", first.module, first.symbol);
                            let anchor = label.clone();
                            if !anchors.insert(anchor.clone()) {
                                tracing::warn!(
                                    "Docstring for '{}' included more than once ({})",
                                    label,
                                    page.relative
                                );
                                *warnings += 1;
                                continue;
                            }
                            used.insert(first.symbol.clone());

                            html.push_str(&format!(
                                "<section class=\"docstring\" id=\"{anchor}\">\n<header><a class=\"docstring-binding\" href=\"#{anchor}\"><code>{label}</code></a> <span class=\"docstring-category\">{category}</span></header>\n",
                                anchor = escape_html(&anchor),
                                label = escape_html(&label),
                                category = first.category.label(),
                            ));
                            for (i, doc) in docs.iter().enumerate() {
                                if i > 0 {
                                    html.push_str("<hr>\n");
                                }
                                html.push_str(&render_markdown(&doc.text));
                            }
                            html.push_str("</section>\n");

                            placed.push(PlacedDoc {
                                label,
                                anchor,
                                page: page_index,
                            });
                        }
                        page_blocks.insert(block_index, html);
                    }
                    _ => {}
                }
            }

            blocks.push(page_blocks);
        }

        Ok((blocks, placed, used))
    }

    /// Build a single page.
    fn build_page(
        &self,
        config: &DocsConfig,
        pages: &[PageInfo],
        index: usize,
        page: &PageInfo,
        nav: &[NavItem],
        blocks: &HashMap<usize, String>,
    ) -> Result<(), BuildError> {
        let by_source: HashMap<&str, &PageInfo> =
            pages.iter().map(|p| (p.relative.as_str(), p)).collect();

        let resolve = |dest: &str| resolve_page_link(dest, page, &by_source);
        let content = render_doc(
            &page.doc,
            &RenderOptions {
                blocks,
                resolve_link: &resolve,
            },
        );

        let toc: Vec<TocEntry> = page
            .doc
            .toc
            .iter()
            .filter(|e| e.level == 2 || e.level == 3)
            .map(|e| TocEntry {
                title: e.title.clone(),
                id: e.id.clone(),
                level: e.level,
            })
            .collect();

        let link_to = |other: &PageInfo| PageLink {
            title: other.nav_title.clone(),
            path: relative_url(&page.output, &other.url),
        };

        let context = Context {
            title: page.title.clone(),
            site_title: config.sitename.clone(),
            description: page
                .doc
                .frontmatter
                .as_ref()
                .and_then(|f| f.description.clone()),
            content,
            nav: localize_nav(nav, page),
            toc,
            root: relative_url(&page.output, ""),
            prev: index.checked_sub(1).and_then(|i| pages.get(i)).map(link_to),
            next: pages.get(index + 1).map(link_to),
            styles: config
                .styles
                .iter()
                .map(|s| {
                    let filename = Path::new(s)
                        .file_name()
                        .and_then(|f| f.to_str())
                        .unwrap_or("style.css");
                    relative_url(&page.output, &format!("assets/{}", filename))
                })
                .collect(),
            live_reload: self.live_reload.clone(),
        };

        let html = self
            .templates
            .render_page("doc.html", &context)
            .map_err(|e: minijinja::Error| BuildError::TemplateError(e.to_string()))?;

        let output_path = config.build_dir().join(&page.output);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
        }

        fs::write(&output_path, html).map_err(|e| BuildError::WriteError(e.to_string()))?;
        tracing::debug!("Wrote {}", output_path.display());

        Ok(())
    }

    /// Generate static assets.
    fn generate_assets(&self, config: &DocsConfig) -> Result<(), BuildError> {
        let assets_dir = config.build_dir().join("assets");
        fs::create_dir_all(&assets_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;

        let css = AssetPipeline::generate_css();
        let css = if config.minify {
            AssetPipeline::minify_css(&css).unwrap_or(css)
        } else {
            css
        };
        fs::write(assets_dir.join("main.css"), css)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        let js = AssetPipeline::generate_js();
        fs::write(assets_dir.join("main.js"), js)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        for style_path in &config.styles {
            let source_path = config.root.join(style_path);
            if source_path.exists() {
                let filename = source_path
                    .file_name()
                    .and_then(|f| f.to_str())
                    .unwrap_or("style.css");
                let content = fs::read_to_string(&source_path).map_err(|e| {
                    BuildError::ReadError(format!("Failed to read stylesheet: {}", e))
                })?;
                fs::write(assets_dir.join(filename), content)
                    .map_err(|e| BuildError::WriteError(e.to_string()))?;
                tracing::info!("Copied stylesheet from {}", style_path);
            } else {
                tracing::warn!("Stylesheet not found: {}", style_path);
            }
        }

        Ok(())
    }

    /// Generate search index.
    fn generate_search_index(&self, config: &DocsConfig, pages: &[PageInfo]) -> Result<(), BuildError> {
        let index: Vec<serde_json::Value> = pages
            .iter()
            .map(|page| {
                let description = page
                    .doc
                    .frontmatter
                    .as_ref()
                    .and_then(|f| f.description.clone())
                    .unwrap_or_default();

                let content = page
                    .doc
                    .content
                    .lines()
                    .filter(|l| !l.starts_with('#') && !l.starts_with("```"))
                    .filter(|l| !l.trim().is_empty())
                    .take(10)
                    .collect::<Vec<_>>()
                    .join(" ");

                serde_json::json!({
                    "title": page.title,
                    "description": description,
                    "url": page.url,
                    "content": content,
                })
            })
            .collect();

        let json = serde_json::to_string_pretty(&index)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        fs::write(config.build_dir().join("search-index.json"), json)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Generate sitemap and robots.txt when the site has a canonical URL.
    fn generate_sitemap(&self, config: &DocsConfig, pages: &[PageInfo]) -> Result<(), BuildError> {
        let Some(canonical) = &config.canonical else {
            tracing::debug!("No canonical URL configured, skipping sitemap");
            return Ok(());
        };
        let base = format!("{}/", canonical.trim_end_matches('/'));

        let urls: Vec<String> = pages
            .iter()
            .map(|page| format!("  <url>\n    <loc>{}{}</loc>\n  </url>", base, page.url))
            .collect();

        let sitemap = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
{}
</urlset>"#,
            urls.join("\n")
        );

        fs::write(config.build_dir().join("sitemap.xml"), sitemap)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        let robots = format!("User-agent: *\nAllow: /\nSitemap: {}sitemap.xml", base);
        fs::write(config.build_dir().join("robots.txt"), robots)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        Ok(())
    }
}

impl Default for StaticBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteGenerator for StaticBuilder {
    fn generate(&self, config: &DocsConfig) -> Result<BuildResult, BuildError> {
        self.build(config)
    }
}

/// Remove a previous build, refusing directories that hold the sources.
fn prepare_output(output_dir: &Path, config: &DocsConfig) -> Result<(), BuildError> {
    let output = normalize(output_dir);
    let source = normalize(&config.source_dir());
    let root = normalize(&config.root);
    if source.starts_with(&output) || root.starts_with(&output) {
        return Err(BuildError::UnsafeOutput(output_dir.display().to_string()));
    }

    if output_dir.exists() {
        fs::remove_dir_all(output_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;
    }
    fs::create_dir_all(output_dir).map_err(|e| BuildError::WriteError(e.to_string()))
}

/// Lexically normalize a path (no filesystem access).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Output file and site URL for a page source path (forward slashes).
///
/// `lib/public.md` → `lib/public/index.html` + `lib/public/` with pretty URLs,
/// `lib/public.html` for both otherwise. `index.md` files map to their directory.
pub fn page_location(relative: &str, pretty_urls: bool) -> (String, String) {
    let stem = relative.strip_suffix(".md").unwrap_or(relative);
    let (dir, name) = match stem.rsplit_once('/') {
        Some((dir, name)) => (format!("{}/", dir), name),
        None => (String::new(), stem),
    };

    if name == "index" {
        let output = format!("{}index.html", dir);
        let url = if pretty_urls { dir } else { output.clone() };
        (output, url)
    } else if pretty_urls {
        (format!("{}{}/index.html", dir, name), format!("{}{}/", dir, name))
    } else {
        let output = format!("{}{}.html", dir, name);
        (output.clone(), output)
    }
}

/// Link from the page written at `from_output` to the site-relative `target`.
pub fn relative_url(from_output: &str, target: &str) -> String {
    let from_dirs: Vec<&str> = match from_output.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let target_parts: Vec<&str> = target.split('/').collect();
    let (target_dirs, target_file) = target_parts.split_at(target_parts.len() - 1);

    let common = from_dirs
        .iter()
        .zip(target_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut url = "../".repeat(from_dirs.len() - common);
    for dir in &target_dirs[common..] {
        url.push_str(dir);
        url.push('/');
    }
    url.push_str(target_file[0]);

    if url.is_empty() {
        "./".to_string()
    } else {
        url
    }
}

/// Rewrite a Markdown link to another page of the tree, keeping any fragment.
fn resolve_page_link(dest: &str, page: &PageInfo, by_source: &HashMap<&str, &PageInfo>) -> Option<String> {
    if dest.starts_with('#') || dest.starts_with('/') || dest.contains("://") || dest.starts_with("mailto:") {
        return None;
    }

    let (path, fragment) = match dest.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (dest, None),
    };
    if !path.ends_with(".md") {
        return None;
    }

    let base = match page.relative.rsplit_once('/') {
        Some((dir, _)) => Path::new(dir).join(path),
        None => PathBuf::from(path),
    };
    let target = to_slash(&normalize(&base));
    let Some(other) = by_source.get(target.as_str()) else {
        tracing::warn!("Link to unknown page '{}' in {}", dest, page.relative);
        return None;
    };

    let mut url = relative_url(&page.output, &other.url);
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    Some(url)
}

/// Site-level navigation mirroring the page tree, with site-relative URLs.
///
/// `next` walks the flattened page list alongside the tree.
fn build_navigation(entries: &[PageEntry], pages: &[PageInfo], next: &mut usize) -> Vec<NavItem> {
    let mut nav = Vec::new();

    for entry in entries {
        match &entry.target {
            PageTarget::File(_) => {
                let Some(page) = pages.get(*next) else {
                    continue;
                };
                *next += 1;
                if !page.doc.in_nav() {
                    continue;
                }
                nav.push(NavItem {
                    title: page.nav_title.clone(),
                    path: page.url.clone(),
                    children: Vec::new(),
                    active: false,
                });
            }
            PageTarget::Section(children) => {
                let children = build_navigation(children, pages, next);
                if children.is_empty() {
                    continue;
                }
                nav.push(NavItem {
                    title: entry.title.clone().unwrap_or_default(),
                    path: String::new(),
                    children,
                    active: false,
                });
            }
        }
    }

    nav
}

/// Make navigation links relative to `page` and mark the active entries.
fn localize_nav(nav: &[NavItem], page: &PageInfo) -> Vec<NavItem> {
    nav.iter()
        .map(|item| {
            let children = localize_nav(&item.children, page);
            let is_section = item.path.is_empty() && !item.children.is_empty();
            let active = if is_section {
                children.iter().any(|c| c.active)
            } else {
                item.path == page.url
            };
            NavItem {
                title: item.title.clone(),
                path: if is_section {
                    String::new()
                } else {
                    relative_url(&page.output, &item.path)
                },
                children,
                active,
            }
        })
        .collect()
}

/// Generate HTML for `@contents` and `@index` blocks.
fn expand_listings(pages: &[PageInfo], placed: &[PlacedDoc], blocks: &mut [HashMap<usize, String>]) {
    for (page_index, page) in pages.iter().enumerate() {
        for (block_index, block) in page.doc.code_blocks.iter().enumerate() {
            let html = match block.kind {
                BlockKind::Contents => contents_html(block, page, pages),
                BlockKind::Index => index_html(block, page, pages, placed),
                _ => continue,
            };
            blocks[page_index].insert(block_index, html);
        }
    }
}

/// HTML for a `@contents` block.
fn contents_html(block: &CodeBlock, page: &PageInfo, pages: &[PageInfo]) -> String {
    let spec = ContentsSpec::from_block(block);
    let mut html = String::from("<ul class=\"contents\">\n");

    for other in pages {
        if !spec.pages.is_empty() && !spec.pages.iter().any(|p| p == &other.relative) {
            continue;
        }
        let href = relative_url(&page.output, &other.url);
        for entry in other.doc.toc.iter().filter(|e| e.level <= spec.depth) {
            let link = if entry.level == 1 {
                href.clone()
            } else {
                format!("{}#{}", href, entry.id)
            };
            html.push_str(&format!(
                "<li class=\"level-{}\"><a href=\"{}\">{}</a></li>\n",
                entry.level,
                escape_html(&link),
                escape_html(&entry.title)
            ));
        }
    }

    html.push_str("</ul>\n");
    html
}

/// HTML for an `@index` block.
fn index_html(block: &CodeBlock, page: &PageInfo, pages: &[PageInfo], placed: &[PlacedDoc]) -> String {
    let spec = ContentsSpec::from_block(block);
    let mut entries: Vec<&PlacedDoc> = placed
        .iter()
        .filter(|d| spec.pages.is_empty() || spec.pages.iter().any(|p| p == &pages[d.page].relative))
        .collect();
    entries.sort_by(|a, b| a.label.to_lowercase().cmp(&b.label.to_lowercase()));

    let mut html = String::from("<ul class=\"index\">\n");
    for doc in entries {
        let href = format!(
            "{}#{}",
            relative_url(&page.output, &pages[doc.page].url),
            doc.anchor
        );
        html.push_str(&format!(
            "<li><a href=\"{}\"><code>{}</code></a></li>\n",
            escape_html(&href),
            escape_html(&doc.label)
        ));
    }
    html.push_str("</ul>\n");
    html
}

/// Capitalize first letter of a string.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
