//! Deployment of the generated documentation site.
//!
//! [`DeployDecision`] reads the CI environment to decide whether and where to
//! publish; [`GitDeployer`] pushes the site to the pages branch of the remote.

pub mod decision;
pub mod git;

use std::path::Path;

pub use decision::DeployDecision;
pub use git::{remote_url, GitDeployer, GitRunner, SystemGit};

/// Publishes a built site.
pub trait SiteDeployer {
    fn deploy(&self, target: &Path, repo: &str) -> Result<DeployOutcome, DeployError>;
}

/// What a deployment did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Nothing was pushed
    Skipped { reason: String },
    /// The site matched what is already published
    Unchanged { subfolders: Vec<String> },
    /// A commit was pushed
    Deployed { subfolders: Vec<String> },
    /// Commands were logged but not run
    DryRun { subfolders: Vec<String> },
}

/// Errors that can occur while deploying.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Build output not found: {0}")]
    MissingTarget(String),

    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    #[error("IO error: {0}")]
    Io(String),
}
