//! Build-then-deploy pipeline.

use anyhow::{Context, Result};
use ccap_deploy::{DeployOutcome, SiteDeployer};
use ccap_site::{BuildResult, DocsConfig, SiteGenerator, StaticBuilder};

use super::deploy::{git_deployer, report, site_dir};

/// Generate the site, then hand the directory it was written to and the repository to the deployer.
///
/// Deployment only runs after a successful build.
pub fn make<G: SiteGenerator, D: SiteDeployer>(
    config: &DocsConfig,
    generator: &G,
    deployer: &D,
) -> Result<(BuildResult, DeployOutcome)> {
    let result = generator
        .generate(config)
        .context("Failed to generate documentation")?;
    tracing::info!(
        "Built {} pages with {} docstrings in {}ms",
        result.pages,
        result.docstrings,
        result.duration_ms
    );

    let target = site_dir(config);
    let outcome = deployer
        .deploy(&target, &config.deploy.repo)
        .with_context(|| format!("Failed to deploy {}", target.display()))?;

    Ok((result, outcome))
}

/// Run the make command.
pub fn run(config: &DocsConfig, force: bool, dry_run: bool) -> Result<()> {
    let deployer = git_deployer(config, force, dry_run);
    let (_, outcome) = make(config, &StaticBuilder::new(), &deployer)?;
    report(&outcome);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccap_deploy::DeployError;
    use ccap_site::BuildError;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    struct FakeGenerator {
        fail: bool,
    }

    impl SiteGenerator for FakeGenerator {
        fn generate(&self, config: &DocsConfig) -> Result<BuildResult, BuildError> {
            if self.fail {
                return Err(BuildError::MissingPage("index.md".to_string()));
            }
            Ok(BuildResult {
                pages: 3,
                docstrings: 12,
                warnings: 0,
                duration_ms: 1,
                output_dir: config.build_dir(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingDeployer {
        calls: RefCell<Vec<(PathBuf, String)>>,
    }

    impl SiteDeployer for RecordingDeployer {
        fn deploy(&self, target: &Path, repo: &str) -> Result<DeployOutcome, DeployError> {
            self.calls
                .borrow_mut()
                .push((target.to_path_buf(), repo.to_string()));
            Ok(DeployOutcome::Deployed {
                subfolders: vec!["dev".to_string()],
            })
        }
    }

    #[test]
    fn deploys_build_directory_to_project_repository() {
        let config = DocsConfig::carrier_capture(&|_: &str| None);
        let deployer = RecordingDeployer::default();

        let (result, outcome) = make(&config, &FakeGenerator { fail: false }, &deployer).unwrap();

        assert_eq!(result.pages, 3);
        assert!(matches!(outcome, DeployOutcome::Deployed { .. }));
        assert_eq!(
            deployer.calls.into_inner(),
            vec![(
                PathBuf::from("build"),
                "github.com/WMD-group/CarrierCapture.jl.git".to_string()
            )]
        );
    }

    #[test]
    fn deploys_the_directory_that_was_built() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("docs.toml");
        std::fs::write(&config_path, "build = \"site\"\n").unwrap();
        let config = DocsConfig::load(&config_path, &|_: &str| None).unwrap();
        let deployer = RecordingDeployer::default();

        let (result, _) = make(&config, &FakeGenerator { fail: false }, &deployer).unwrap();

        let calls = deployer.calls.into_inner();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, temp.path().join("site"));
        assert_eq!(calls[0].0, result.output_dir);
    }

    #[test]
    fn failed_build_is_not_deployed() {
        let config = DocsConfig::carrier_capture(&|_: &str| None);
        let deployer = RecordingDeployer::default();

        let result = make(&config, &FakeGenerator { fail: true }, &deployer);

        assert!(result.is_err());
        assert!(deployer.calls.borrow().is_empty());
    }
}
