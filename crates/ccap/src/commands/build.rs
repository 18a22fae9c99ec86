//! Static site build command.

use std::path::PathBuf;

use anyhow::Result;
use ccap_site::{BuildResult, DocsConfig, StaticBuilder};

/// Command-line overrides for the loaded configuration.
#[derive(Debug, Default)]
pub struct BuildOptions {
    pub output: Option<PathBuf>,
    pub pretty_urls: Option<bool>,
    pub strict: bool,
    pub minify: Option<bool>,
}

/// Apply command-line overrides on top of docs.toml.
fn apply(mut config: DocsConfig, options: BuildOptions) -> DocsConfig {
    if let Some(output) = options.output {
        config.build = output;
    }
    if let Some(pretty_urls) = options.pretty_urls {
        config.format.pretty_urls = pretty_urls;
    }
    if options.strict {
        config.strict = true;
    }
    if let Some(minify) = options.minify {
        config.minify = minify;
    }
    config
}

/// Run the build command.
pub fn run(config: DocsConfig, options: BuildOptions) -> Result<BuildResult> {
    tracing::info!("Building {}...", config.sitename);

    let config = apply(config, options);
    let result = StaticBuilder::new().build(&config)?;

    tracing::info!(
        "Built {} pages with {} docstrings in {}ms",
        result.pages,
        result.docstrings,
        result.duration_ms
    );
    if result.warnings > 0 {
        tracing::warn!("{} warnings", result.warnings);
    }
    tracing::info!("Output: {}", result.output_dir.display());

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn options_override_config() {
        let config = DocsConfig::carrier_capture(&|_: &str| None);
        let options = BuildOptions {
            output: Some(PathBuf::from("site")),
            pretty_urls: Some(true),
            strict: true,
            minify: Some(false),
        };

        let config = apply(config, options);

        assert_eq!(config.build, PathBuf::from("site"));
        assert!(config.format.pretty_urls);
        assert!(config.strict);
        assert!(!config.minify);
    }

    #[test]
    fn no_options_keep_config() {
        let config = DocsConfig::carrier_capture(&|_: &str| None);

        let applied = apply(config.clone(), BuildOptions::default());

        assert_eq!(applied, config);
    }
}
