//! Static documentation site generator for CarrierCapture.jl.
//!
//! Reads the page tree from [`DocsConfig`], splices module docstrings into
//! `@docs` blocks and writes a self-contained HTML site.

pub mod assets;
pub mod builder;
pub mod config;
pub mod docstrings;
pub mod render;
pub mod templates;

pub use builder::{page_location, relative_url, BuildError, BuildResult, SiteGenerator, StaticBuilder};
pub use config::{
    process_env, ConfigError, DeployConfig, DocsConfig, Format, ModuleSource, PageEntry, PageTarget,
    PageTree, BUILD_DIR, DEPLOY_REPO, SITENAME,
};
pub use docstrings::{DocError, DocIndex, Docstring};
