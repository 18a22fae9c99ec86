//! Documentation site configuration: title, format, modules and the page tree.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Site title of the CarrierCapture documentation.
pub const SITENAME: &str = "CarrierCapture.jl";

/// Remote repository the documentation is deployed to.
pub const DEPLOY_REPO: &str = "github.com/WMD-group/CarrierCapture.jl.git";

/// Build output directory, relative to the docs root.
pub const BUILD_DIR: &str = "build";

/// Read a variable from the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Format {
    /// Write `page/index.html` and link to `page/` instead of `page.html`
    #[serde(default)]
    pub pretty_urls: bool,
}

impl Format {
    /// Pretty URLs are only generated on CI, where the site is served over HTTP.
    pub fn from_env(get_env: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            pretty_urls: get_env("CI").as_deref() == Some("true"),
        }
    }
}

/// A module whose docstrings can be spliced into pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSource {
    /// Module name, e.g. `CarrierCapture`
    pub name: String,
    /// Source directory, relative to the docs root
    pub path: PathBuf,
}

/// Where a page tree entry points.
#[derive(Debug, Clone, PartialEq)]
pub enum PageTarget {
    /// A Markdown file relative to the source directory
    File(PathBuf),
    /// A titled group of entries
    Section(Vec<PageEntry>),
}

/// One entry of the page tree.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry {
    /// Display title; untitled pages use their first heading
    pub title: Option<String>,
    pub target: PageTarget,
}

impl PageEntry {
    pub fn page(title: &str, path: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            target: PageTarget::File(PathBuf::from(path)),
        }
    }

    pub fn section(title: &str, children: Vec<PageEntry>) -> Self {
        Self {
            title: Some(title.to_string()),
            target: PageTarget::Section(children),
        }
    }

    pub fn untitled(path: &str) -> Self {
        Self {
            title: None,
            target: PageTarget::File(PathBuf::from(path)),
        }
    }
}

impl Serialize for PageTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageTarget::File(path) => serializer.serialize_str(&to_slash(path)),
            PageTarget::Section(children) => children.serialize(serializer),
        }
    }
}

impl Serialize for PageEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.title {
            None => self.target.serialize(serializer),
            Some(title) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(title, &self.target)?;
                map.end()
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTarget {
    File(String),
    Section(Vec<PageEntry>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Untitled(String),
    Titled(BTreeMap<String, RawTarget>),
}

impl<'de> Deserialize<'de> for PageEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawEntry::deserialize(deserializer)? {
            RawEntry::Untitled(path) => Ok(PageEntry::untitled(&path)),
            RawEntry::Titled(map) => {
                if map.len() != 1 {
                    return Err(de::Error::custom(format!(
                        "page entry must have exactly one title, found {}",
                        map.len()
                    )));
                }
                let Some((title, target)) = map.into_iter().next() else {
                    return Err(de::Error::custom("empty page entry"));
                };
                let target = match target {
                    RawTarget::File(path) => PageTarget::File(PathBuf::from(path)),
                    RawTarget::Section(children) => PageTarget::Section(children),
                };
                Ok(PageEntry {
                    title: Some(title),
                    target,
                })
            }
        }
    }
}

/// A page of the tree in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatPage {
    /// Title from the tree, if any
    pub title: Option<String>,
    /// Markdown path relative to the source directory
    pub path: PathBuf,
    /// Titles of the enclosing sections, outermost first
    pub sections: Vec<String>,
}

/// Ordered navigation structure of the site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageTree(pub Vec<PageEntry>);

impl PageTree {
    /// Check the tree is usable: non-empty, relative unique `.md` paths, titled sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.0.is_empty() {
            return Err(ConfigError::Invalid("page tree is empty".to_string()));
        }
        let mut seen = HashSet::new();
        validate_entries(&self.0, &mut seen)
    }

    /// Pages in reading order.
    pub fn flatten(&self) -> Vec<FlatPage> {
        let mut pages = Vec::new();
        flatten_into(&self.0, &mut Vec::new(), &mut pages);
        pages
    }
}

fn validate_entries(entries: &[PageEntry], seen: &mut HashSet<PathBuf>) -> Result<(), ConfigError> {
    for entry in entries {
        match &entry.target {
            PageTarget::File(path) => {
                if !path.components().all(|c| matches!(c, Component::Normal(_))) {
                    return Err(ConfigError::Invalid(format!(
                        "page path must be relative and stay inside the source directory: {}",
                        path.display()
                    )));
                }
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    return Err(ConfigError::Invalid(format!(
                        "page must be a .md file: {}",
                        path.display()
                    )));
                }
                if !seen.insert(path.clone()) {
                    return Err(ConfigError::Invalid(format!(
                        "page listed twice: {}",
                        path.display()
                    )));
                }
            }
            PageTarget::Section(children) => {
                match &entry.title {
                    Some(title) if !title.trim().is_empty() => {}
                    _ => {
                        return Err(ConfigError::Invalid(
                            "section without a title".to_string(),
                        ))
                    }
                }
                if children.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "section '{}' has no pages",
                        entry.title.as_deref().unwrap_or_default()
                    )));
                }
                validate_entries(children, seen)?;
            }
        }
    }
    Ok(())
}

fn flatten_into(entries: &[PageEntry], sections: &mut Vec<String>, out: &mut Vec<FlatPage>) {
    for entry in entries {
        match &entry.target {
            PageTarget::File(path) => out.push(FlatPage {
                title: entry.title.clone(),
                path: path.clone(),
                sections: sections.clone(),
            }),
            PageTarget::Section(children) => {
                sections.push(entry.title.clone().unwrap_or_default());
                flatten_into(children, sections, out);
                sections.pop();
            }
        }
    }
}

/// Deployment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Directory to publish, relative to the docs root
    pub target: PathBuf,
    /// Remote repository, without scheme
    pub repo: String,
    /// Branch the site is pushed to
    pub branch: String,
    /// Development branch whose pushes update the `devurl` folder
    pub devbranch: String,
    /// Folder for development builds
    pub devurl: String,
    /// Deploy pull request previews
    pub push_preview: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            target: PathBuf::from(BUILD_DIR),
            repo: DEPLOY_REPO.to_string(),
            branch: "gh-pages".to_string(),
            devbranch: "master".to_string(),
            devurl: "dev".to_string(),
            push_preview: false,
        }
    }
}

/// Full documentation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DocsConfig {
    /// Site title
    pub sitename: String,
    /// Output format
    pub format: Format,
    /// Modules to introspect for docstrings
    pub modules: Vec<ModuleSource>,
    /// Navigation structure
    pub pages: PageTree,
    /// Docs root; other paths are relative to it
    pub root: PathBuf,
    /// Markdown sources, relative to the root
    pub source: PathBuf,
    /// Build output, relative to the root
    pub build: PathBuf,
    /// Absolute site URL used for sitemap.xml and robots.txt
    pub canonical: Option<String>,
    /// Missing docstrings fail the build instead of warning
    pub strict: bool,
    /// Minify CSS output
    pub minify: bool,
    /// Extra stylesheets to copy and link
    pub styles: Vec<String>,
    pub deploy: DeployConfig,
}

impl DocsConfig {
    /// The CarrierCapture documentation as declared by the project.
    pub fn carrier_capture(get_env: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            sitename: SITENAME.to_string(),
            format: Format::from_env(get_env),
            modules: vec![ModuleSource {
                name: "CarrierCapture".to_string(),
                path: PathBuf::from("../src"),
            }],
            pages: PageTree(vec![
                PageEntry::page("Home", "index.md"),
                PageEntry::section(
                    "Library",
                    vec![
                        PageEntry::page("Public", "lib/public.md"),
                        PageEntry::page("Brooglie", "lib/brooglie.md"),
                    ],
                ),
            ]),
            root: PathBuf::from("."),
            source: PathBuf::from("src"),
            build: PathBuf::from(BUILD_DIR),
            canonical: None,
            strict: false,
            minify: true,
            styles: Vec::new(),
            deploy: DeployConfig::default(),
        }
    }

    /// Load configuration from `path` if it exists, on top of the project defaults.
    ///
    /// Returns an error if the config file exists but is malformed.
    pub fn load(path: &Path, get_env: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::carrier_capture(get_env);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.root = parent.to_path_buf();
        }

        if !path.exists() {
            tracing::debug!("{} not found, using built-in configuration", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let file: ConfigFile = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.merge(file);
        config.pages.validate()?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn merge(&mut self, file: ConfigFile) {
        if let Some(sitename) = file.sitename {
            self.sitename = sitename;
        }
        if let Some(format) = file.format {
            if let Some(pretty_urls) = format.pretty_urls {
                self.format.pretty_urls = pretty_urls;
            }
        }
        if let Some(modules) = file.modules {
            self.modules = modules;
        }
        if let Some(pages) = file.pages {
            self.pages = pages;
        }
        if let Some(source) = file.source {
            self.source = source;
        }
        if let Some(build) = file.build {
            self.deploy.target = build.clone();
            self.build = build;
        }
        if file.canonical.is_some() {
            self.canonical = file.canonical;
        }
        if let Some(strict) = file.strict {
            self.strict = strict;
        }
        if let Some(minify) = file.minify {
            self.minify = minify;
        }
        if let Some(styles) = file.styles {
            self.styles = styles;
        }
        if let Some(deploy) = file.deploy {
            let d = &mut self.deploy;
            if let Some(target) = deploy.target {
                d.target = target;
            }
            if let Some(repo) = deploy.repo {
                d.repo = repo;
            }
            if let Some(branch) = deploy.branch {
                d.branch = branch;
            }
            if let Some(devbranch) = deploy.devbranch {
                d.devbranch = devbranch;
            }
            if let Some(devurl) = deploy.devurl {
                d.devurl = devurl;
            }
            if let Some(push_preview) = deploy.push_preview {
                d.push_preview = push_preview;
            }
        }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(&self.source)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(&self.build)
    }

    pub fn module_dir(&self, module: &ModuleSource) -> PathBuf {
        self.root.join(&module.path)
    }
}

/// Configuration file structure (docs.toml). Every key is optional.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    sitename: Option<String>,
    modules: Option<Vec<ModuleSource>>,
    pages: Option<PageTree>,
    source: Option<PathBuf>,
    build: Option<PathBuf>,
    canonical: Option<String>,
    strict: Option<bool>,
    minify: Option<bool>,
    styles: Option<Vec<String>>,
    format: Option<FormatFile>,
    deploy: Option<DeployFile>,
}

#[derive(Debug, Deserialize, Default)]
struct FormatFile {
    pretty_urls: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct DeployFile {
    target: Option<PathBuf>,
    repo: Option<String>,
    branch: Option<String>,
    devbranch: Option<String>,
    devurl: Option<String>,
    push_preview: Option<bool>,
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid page tree: {0}")]
    Invalid(String),
}

/// Render a relative path with forward slashes.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl fmt::Display for PageTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_entries(
            f: &mut fmt::Formatter<'_>,
            entries: &[PageEntry],
            depth: usize,
        ) -> fmt::Result {
            for entry in entries {
                let indent = "  ".repeat(depth);
                let title = entry.title.as_deref().unwrap_or("(untitled)");
                match &entry.target {
                    PageTarget::File(path) => {
                        writeln!(f, "{}{} => {}", indent, title, to_slash(path))?
                    }
                    PageTarget::Section(children) => {
                        writeln!(f, "{}{}", indent, title)?;
                        write_entries(f, children, depth + 1)?;
                    }
                }
            }
            Ok(())
        }
        write_entries(f, &self.0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn pretty_urls_only_when_ci_is_true() {
        assert!(!Format::from_env(&env(&[])).pretty_urls);
        assert!(!Format::from_env(&env(&[("CI", "")])).pretty_urls);
        assert!(!Format::from_env(&env(&[("CI", "1")])).pretty_urls);
        assert!(!Format::from_env(&env(&[("CI", "TRUE")])).pretty_urls);
        assert!(!Format::from_env(&env(&[("CI", "true ")])).pretty_urls);
        assert!(Format::from_env(&env(&[("CI", "true")])).pretty_urls);
    }

    #[test]
    fn default_page_tree_shape() {
        let config = DocsConfig::carrier_capture(&env(&[]));
        let json = serde_json::to_value(&config.pages).unwrap();

        assert_eq!(
            json,
            serde_json::json!([
                { "Home": "index.md" },
                { "Library": [
                    { "Public": "lib/public.md" },
                    { "Brooglie": "lib/brooglie.md" }
                ]}
            ])
        );

        let top = json.as_array().unwrap();
        assert_eq!(top.len(), 2);
        let library = top[1]["Library"].as_array().unwrap();
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn default_literals() {
        let config = DocsConfig::carrier_capture(&env(&[("CI", "true")]));

        assert_eq!(config.sitename, "CarrierCapture.jl");
        assert!(config.format.pretty_urls);
        assert_eq!(config.modules[0].name, "CarrierCapture");
        assert_eq!(config.deploy.target, PathBuf::from("build"));
        assert_eq!(
            config.deploy.repo,
            "github.com/WMD-group/CarrierCapture.jl.git"
        );
        config.pages.validate().unwrap();
    }

    #[test]
    fn page_tree_roundtrips_through_toml() {
        let source = r#"
pages = [
  { Home = "index.md" },
  "about.md",
  { Library = [ { Public = "lib/public.md" } ] },
]
"#;
        let file: ConfigFile = toml::from_str(source).unwrap();
        let pages = file.pages.unwrap();

        assert_eq!(
            pages,
            PageTree(vec![
                PageEntry::page("Home", "index.md"),
                PageEntry::untitled("about.md"),
                PageEntry::section("Library", vec![PageEntry::page("Public", "lib/public.md")]),
            ])
        );
    }

    #[test]
    fn rejects_entry_with_two_titles() {
        let result: Result<ConfigFile, _> =
            toml::from_str(r#"pages = [ { A = "a.md", B = "b.md" } ]"#);
        assert!(result.is_err());
    }

    #[test]
    fn flattens_in_reading_order() {
        let config = DocsConfig::carrier_capture(&env(&[]));
        let flat = config.pages.flatten();

        let paths: Vec<_> = flat.iter().map(|p| to_slash(&p.path)).collect();
        assert_eq!(paths, vec!["index.md", "lib/public.md", "lib/brooglie.md"]);
        assert_eq!(flat[1].sections, vec!["Library".to_string()]);
        assert!(flat[0].sections.is_empty());
    }

    #[test]
    fn validation_errors() {
        let empty = PageTree(vec![]);
        assert!(matches!(empty.validate(), Err(ConfigError::Invalid(_))));

        let dup = PageTree(vec![
            PageEntry::page("A", "a.md"),
            PageEntry::section("S", vec![PageEntry::page("B", "a.md")]),
        ]);
        assert!(dup.validate().is_err());

        let not_md = PageTree(vec![PageEntry::page("A", "a.html")]);
        assert!(not_md.validate().is_err());

        let empty_section = PageTree(vec![PageEntry::section("S", vec![])]);
        assert!(empty_section.validate().is_err());

        let untitled_section = PageTree(vec![PageEntry {
            title: None,
            target: PageTarget::Section(vec![PageEntry::page("A", "a.md")]),
        }]);
        assert!(untitled_section.validate().is_err());

        for escaping in ["../a.md", "lib/../../a.md", "/abs/a.md", "./a.md"] {
            let tree = PageTree(vec![PageEntry::page("A", escaping)]);
            assert!(
                matches!(tree.validate(), Err(ConfigError::Invalid(ref m)) if m.contains(escaping)),
                "{} should be rejected",
                escaping
            );
        }
    }

    #[test]
    fn deploy_target_follows_build_unless_set() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("docs.toml");

        fs::write(&path, "build = \"site\"\n").unwrap();
        let config = DocsConfig::load(&path, &|_: &str| None).unwrap();
        assert_eq!(config.deploy.target, PathBuf::from("site"));

        fs::write(&path, "build = \"site\"\n\n[deploy]\ntarget = \"public\"\n").unwrap();
        let config = DocsConfig::load(&path, &|_: &str| None).unwrap();
        assert_eq!(config.build, PathBuf::from("site"));
        assert_eq!(config.deploy.target, PathBuf::from("public"));
    }

    #[test]
    fn loads_overrides_from_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("docs.toml");
        fs::write(
            &path,
            r#"
sitename = "Capture Docs"
pages = [ { Home = "index.md" } ]

[format]
pretty_urls = true

[deploy]
branch = "pages"
"#,
        )
        .unwrap();

        let config = DocsConfig::load(&path, &env(&[])).unwrap();

        assert_eq!(config.sitename, "Capture Docs");
        assert!(config.format.pretty_urls);
        assert_eq!(config.pages.flatten().len(), 1);
        assert_eq!(config.deploy.branch, "pages");
        assert_eq!(config.deploy.repo, DEPLOY_REPO);
        assert_eq!(config.root, temp.path());
        assert_eq!(config.build_dir(), temp.path().join("build"));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let config = DocsConfig::load(&temp.path().join("docs.toml"), &env(&[])).unwrap();

        assert_eq!(config.sitename, SITENAME);
        assert_eq!(config.root, temp.path());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("docs.toml");
        fs::write(&path, "sitename = [").unwrap();

        let result = DocsConfig::load(&path, &env(&[]));

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn displays_tree() {
        let config = DocsConfig::carrier_capture(&env(&[]));
        let text = config.pages.to_string();

        assert_eq!(
            text,
            "Home => index.md\nLibrary\n  Public => lib/public.md\n  Brooglie => lib/brooglie.md\n"
        );
    }
}
