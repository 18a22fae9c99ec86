//! Deploy command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ccap_deploy::{DeployOutcome, GitDeployer, SiteDeployer, SystemGit};
use ccap_site::{process_env, DocsConfig};

/// Directory to publish: the configured target, resolved against the docs root.
pub fn deploy_target(config: &DocsConfig) -> PathBuf {
    resolve(config, &config.deploy.target)
}

/// Directory the generator writes to, resolved against the docs root.
pub fn site_dir(config: &DocsConfig) -> PathBuf {
    resolve(config, &config.build)
}

fn resolve(config: &DocsConfig, path: &Path) -> PathBuf {
    if config.root == Path::new(".") || path.is_absolute() {
        path.to_path_buf()
    } else {
        config.root.join(path)
    }
}

/// Deployer for the current CI environment.
pub fn git_deployer(config: &DocsConfig, force: bool, dry_run: bool) -> GitDeployer<SystemGit> {
    GitDeployer::from_env(SystemGit, config.deploy.clone(), &process_env, force).dry_run(dry_run)
}

/// Log what a deployment did.
pub fn report(outcome: &DeployOutcome) {
    match outcome {
        DeployOutcome::Skipped { reason } => tracing::info!("Not deployed: {}", reason),
        DeployOutcome::Unchanged { subfolders } => {
            tracing::info!("{} already up to date", subfolders.join(", "))
        }
        DeployOutcome::Deployed { subfolders } => {
            tracing::info!("Deployed {}", subfolders.join(", "))
        }
        DeployOutcome::DryRun { subfolders } => {
            tracing::info!("Dry run: would deploy {}", subfolders.join(", "))
        }
    }
}

/// Run the deploy command.
pub fn run(
    config: &DocsConfig,
    dir: Option<PathBuf>,
    repo: Option<String>,
    force: bool,
    dry_run: bool,
) -> Result<DeployOutcome> {
    let target = dir.unwrap_or_else(|| deploy_target(config));
    let repo = repo.unwrap_or_else(|| config.deploy.repo.clone());

    let outcome = git_deployer(config, force, dry_run)
        .deploy(&target, &repo)
        .with_context(|| format!("Failed to deploy {}", target.display()))?;

    report(&outcome);
    Ok(outcome)
}
