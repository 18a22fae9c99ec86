//! Publishing the site to a branch of a git remote.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use ccap_site::DeployConfig;

use crate::decision::DeployDecision;
use crate::{DeployError, DeployOutcome, SiteDeployer};

static CREDENTIALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://[^@/\s]+@").expect("Invalid credentials regex"));

static VERSION_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?(\d+)\.(\d+)\.(\d+)(-[0-9A-Za-z.-]+)?$").expect("Invalid version folder regex")
});

const AUTHOR_NAME: &str = "ccap-deploy";
const AUTHOR_EMAIL: &str = "ccap-deploy@users.noreply.github.com";

/// Runs `git` commands in a working directory.
pub trait GitRunner {
    /// Run `git <args>` in `dir` and return its standard output.
    fn run(&self, dir: &Path, args: &[String]) -> Result<String, DeployError>;
}

/// Runs the `git` executable found on `PATH`.
pub struct SystemGit;

impl GitRunner for SystemGit {
    fn run(&self, dir: &Path, args: &[String]) -> Result<String, DeployError> {
        tracing::debug!("git {}", redact(&args.join(" ")));

        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| DeployError::Git {
                command: command_name(args),
                message: format!("Failed to spawn git: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeployError::Git {
                command: command_name(args),
                message: redact(stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Remote URL to push to: token over HTTPS when available, SSH otherwise.
///
/// `repo` has no scheme, e.g. `github.com/WMD-group/CarrierCapture.jl.git`.
pub fn remote_url(repo: &str, token: Option<&str>) -> String {
    match token {
        Some(token) if !token.is_empty() => format!("https://{}@{}", token, repo),
        _ => match repo.split_once('/') {
            Some((host, path)) => format!("git@{}:{}", host, path),
            None => repo.to_string(),
        },
    }
}

/// Hide credentials embedded in remote URLs.
fn redact(text: &str) -> String {
    CREDENTIALS.replace_all(text, "https://***@").into_owned()
}

fn command_name(args: &[String]) -> String {
    args.first().cloned().unwrap_or_default()
}

/// Deploys by committing the site into the pages branch of the remote.
pub struct GitDeployer<R: GitRunner> {
    runner: R,
    config: DeployConfig,
    decision: DeployDecision,
    token: Option<String>,
    commit: Option<String>,
    dry_run: bool,
}

impl<R: GitRunner> GitDeployer<R> {
    pub fn new(runner: R, config: DeployConfig, decision: DeployDecision) -> Self {
        Self {
            runner,
            config,
            decision,
            token: None,
            commit: None,
            dry_run: false,
        }
    }

    /// Read the decision, token and commit hash from the CI environment.
    pub fn from_env(
        runner: R,
        config: DeployConfig,
        get_env: &impl Fn(&str) -> Option<String>,
        force: bool,
    ) -> Self {
        let decision = DeployDecision::from_env(get_env, &config, force);
        let mut deployer = Self::new(runner, config, decision);
        deployer.token = get_env("GITHUB_TOKEN").filter(|t| !t.is_empty());
        deployer.commit = get_env("GITHUB_SHA").filter(|s| !s.is_empty());
        deployer
    }

    /// Log git commands instead of running them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn decision(&self) -> &DeployDecision {
        &self.decision
    }

    fn git(&self, dir: &Path, args: &[&str]) -> Result<String, DeployError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        if self.dry_run {
            tracing::info!("[dry-run] git {}", redact(&args.join(" ")));
            return Ok(String::new());
        }
        self.runner.run(dir, &args)
    }

    /// Check out the pages branch into `work`, creating an orphan branch if the remote has none.
    fn checkout(&self, parent: &Path, work: &Path, remote: &str) -> Result<(), DeployError> {
        let branch = self.config.branch.as_str();
        let heads = self.git(parent, &["ls-remote", "--heads", remote, branch])?;

        if heads.trim().is_empty() {
            tracing::info!("Branch {} does not exist yet, creating it", branch);
            fs::create_dir_all(work).map_err(|e| DeployError::Io(e.to_string()))?;
            self.git(work, &["init", "-q"])?;
            self.git(work, &["checkout", "-q", "--orphan", branch])?;
            self.git(work, &["remote", "add", "origin", remote])?;
        } else {
            let dest = work.to_string_lossy().into_owned();
            self.git(
                parent,
                &[
                    "clone",
                    "-q",
                    "--depth",
                    "1",
                    "--branch",
                    branch,
                    "--single-branch",
                    remote,
                    dest.as_str(),
                ],
            )?;
            fs::create_dir_all(work).map_err(|e| DeployError::Io(e.to_string()))?;
        }

        self.git(work, &["config", "user.name", AUTHOR_NAME])?;
        self.git(work, &["config", "user.email", AUTHOR_EMAIL])?;
        Ok(())
    }
}

impl<R: GitRunner> SiteDeployer for GitDeployer<R> {
    fn deploy(&self, target: &Path, repo: &str) -> Result<DeployOutcome, DeployError> {
        let subfolders = match &self.decision {
            DeployDecision::Skip { reason } => {
                tracing::info!("Skipping deployment: {}", reason);
                return Ok(DeployOutcome::Skipped {
                    reason: reason.clone(),
                });
            }
            DeployDecision::Deploy { subfolders, reason } => {
                tracing::info!("Deploying to {} ({})", subfolders.join(", "), reason);
                subfolders.clone()
            }
        };

        if !target.is_dir() {
            return Err(DeployError::MissingTarget(target.display().to_string()));
        }

        let remote = remote_url(repo, self.token.as_deref());
        let temp = tempfile::tempdir().map_err(|e| DeployError::Io(e.to_string()))?;
        let work = temp.path().join("site");

        self.checkout(temp.path(), &work, &remote)?;

        for subfolder in &subfolders {
            let dest = work.join(subfolder);
            if dest.exists() {
                fs::remove_dir_all(&dest).map_err(|e| DeployError::Io(e.to_string()))?;
            }
            copy_dir(target, &dest)?;
            tracing::debug!("Copied {} to {}", target.display(), subfolder);
        }

        write_index_files(&work, &self.config.devurl)?;

        self.git(&work, &["add", "-A", "."])?;

        if self.dry_run {
            return Ok(DeployOutcome::DryRun { subfolders });
        }

        let status = self.git(&work, &["status", "--porcelain"])?;
        if status.trim().is_empty() {
            tracing::info!("No changes to deploy");
            return Ok(DeployOutcome::Unchanged { subfolders });
        }

        let message = match &self.commit {
            Some(sha) => format!("build based on {}", sha),
            None => "build based on local changes".to_string(),
        };
        self.git(&work, &["commit", "-q", "-m", message.as_str()])?;

        let refspec = format!("HEAD:{}", self.config.branch);
        self.git(&work, &["push", "-q", "origin", refspec.as_str()])?;

        tracing::info!("Pushed to {} on {}", self.config.branch, redact(&remote));
        Ok(DeployOutcome::Deployed { subfolders })
    }
}

/// Copy a directory tree.
fn copy_dir(from: &Path, to: &Path) -> Result<(), DeployError> {
    for entry in WalkDir::new(from).into_iter() {
        let entry = entry.map_err(|e| DeployError::Io(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| DeployError::Io(e.to_string()))?;
        let dest = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| DeployError::Io(e.to_string()))?;
        } else {
            fs::copy(entry.path(), &dest).map_err(|e| DeployError::Io(e.to_string()))?;
        }
    }
    Ok(())
}

/// Write `versions.js`, the root redirect and `.nojekyll`.
fn write_index_files(work: &Path, devurl: &str) -> Result<(), DeployError> {
    let versions = collect_versions(work, devurl)?;
    let list = versions
        .iter()
        .map(|v| format!("  \"{}\",", v))
        .collect::<Vec<_>>()
        .join("\n");
    let versions_js = format!("var DOC_VERSIONS = [\n{}\n];\n", list);
    write(&work.join("versions.js"), &versions_js)?;

    let default = if work.join("stable").is_dir() {
        "stable"
    } else {
        devurl
    };
    let redirect = format!(
        "<!DOCTYPE html>\n<meta http-equiv=\"refresh\" content=\"0; url=./{0}/\">\n<link rel=\"canonical\" href=\"./{0}/\">\n",
        default
    );
    write(&work.join("index.html"), &redirect)?;

    write(&work.join(".nojekyll"), "")
}

fn write(path: &Path, content: &str) -> Result<(), DeployError> {
    fs::write(path, content).map_err(|e| DeployError::Io(format!("{}: {}", path.display(), e)))
}

/// Published folders, `stable` first, then releases newest first, then `devurl`.
fn collect_versions(work: &Path, devurl: &str) -> Result<Vec<String>, DeployError> {
    let mut releases = Vec::new();
    let mut has_stable = false;
    let mut has_dev = false;

    for entry in fs::read_dir(work).map_err(|e| DeployError::Io(e.to_string()))? {
        let entry = entry.map_err(|e| DeployError::Io(e.to_string()))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == "stable" {
            has_stable = true;
        } else if name == devurl {
            has_dev = true;
        } else if let Some(caps) = VERSION_DIR.captures(&name) {
            let key: Vec<u64> = (1..=3)
                .filter_map(|i| caps.get(i).and_then(|m| m.as_str().parse().ok()))
                .collect();
            releases.push((key, caps.get(4).is_none(), name));
        }
    }

    releases.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

    let mut versions = Vec::new();
    if has_stable {
        versions.push("stable".to_string());
    }
    versions.extend(releases.into_iter().map(|(_, _, name)| name));
    if has_dev {
        versions.push(devurl.to_string());
    }
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::tempdir;

    /// Records commands and the files present when `add` runs.
    #[derive(Default)]
    struct RecordingGit {
        responses: HashMap<String, String>,
        calls: RefCell<Vec<Vec<String>>>,
        staged: RefCell<Vec<String>>,
    }

    impl RecordingGit {
        fn with(mut self, command: &str, output: &str) -> Self {
            self.responses.insert(command.to_string(), output.to_string());
            self
        }

        fn commands(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|c| c[0].clone()).collect()
        }
    }

    impl GitRunner for &RecordingGit {
        fn run(&self, dir: &Path, args: &[String]) -> Result<String, DeployError> {
            self.calls.borrow_mut().push(args.to_vec());
            if args[0] == "add" {
                let mut files: Vec<String> = WalkDir::new(dir)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .filter_map(|e| {
                        e.path()
                            .strip_prefix(dir)
                            .ok()
                            .map(|p| p.to_string_lossy().replace('\\', "/"))
                    })
                    .collect();
                files.sort();
                *self.staged.borrow_mut() = files;
            }
            Ok(self.responses.get(&args[0]).cloned().unwrap_or_default())
        }
    }

    fn site() -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("lib")).unwrap();
        fs::write(temp.path().join("index.html"), "<h1>Home</h1>").unwrap();
        fs::write(temp.path().join("lib/public.html"), "<h1>Public</h1>").unwrap();
        temp
    }

    fn deploy_to(subfolders: &[&str]) -> DeployDecision {
        DeployDecision::Deploy {
            subfolders: subfolders.iter().map(|s| s.to_string()).collect(),
            reason: "test".to_string(),
        }
    }

    #[test]
    fn remote_urls() {
        let repo = "github.com/WMD-group/CarrierCapture.jl.git";

        assert_eq!(
            remote_url(repo, Some("s3cret")),
            "https://s3cret@github.com/WMD-group/CarrierCapture.jl.git"
        );
        assert_eq!(
            remote_url(repo, None),
            "git@github.com:WMD-group/CarrierCapture.jl.git"
        );
        assert_eq!(remote_url(repo, Some("")), remote_url(repo, None));
    }

    #[test]
    fn redacts_tokens() {
        assert_eq!(
            redact("clone https://s3cret@github.com/a/b.git site"),
            "clone https://***@github.com/a/b.git site"
        );
    }

    #[test]
    fn pushes_into_existing_branch() {
        let site = site();
        let git = RecordingGit::default()
            .with("ls-remote", "abc123\trefs/heads/gh-pages\n")
            .with("status", "A  dev/index.html\n");
        let mut deployer = GitDeployer::new(&git, DeployConfig::default(), deploy_to(&["dev"]));
        deployer.commit = Some("0123abc".to_string());

        let outcome = deployer
            .deploy(site.path(), "github.com/WMD-group/CarrierCapture.jl.git")
            .unwrap();

        assert_eq!(
            outcome,
            DeployOutcome::Deployed {
                subfolders: vec!["dev".to_string()]
            }
        );
        assert_eq!(
            git.commands(),
            vec!["ls-remote", "clone", "config", "config", "add", "status", "commit", "push"]
        );

        let calls = git.calls.borrow();
        assert!(calls[1].contains(&"git@github.com:WMD-group/CarrierCapture.jl.git".to_string()));
        assert!(calls[1].contains(&"gh-pages".to_string()));
        assert_eq!(calls[6].last().unwrap(), "build based on 0123abc");
        assert_eq!(calls[7], vec!["push", "-q", "origin", "HEAD:gh-pages"]);

        assert_eq!(
            *git.staged.borrow(),
            vec![
                ".nojekyll",
                "dev/index.html",
                "dev/lib/public.html",
                "index.html",
                "versions.js"
            ]
        );
    }

    #[test]
    fn creates_orphan_branch_when_missing() {
        let site = site();
        let git = RecordingGit::default().with("status", "A  stable/index.html\n");
        let deployer = GitDeployer::new(
            &git,
            DeployConfig::default(),
            deploy_to(&["v0.1.0", "stable"]),
        );

        deployer.deploy(site.path(), "github.com/WMD-group/CarrierCapture.jl.git").unwrap();

        assert_eq!(
            git.commands(),
            vec!["ls-remote", "init", "checkout", "remote", "config", "config", "add", "status", "commit", "push"]
        );
        assert_eq!(git.calls.borrow()[2], vec!["checkout", "-q", "--orphan", "gh-pages"]);
        assert!(git.staged.borrow().contains(&"v0.1.0/lib/public.html".to_string()));
        assert!(git.staged.borrow().contains(&"stable/index.html".to_string()));
    }

    #[test]
    fn uses_token_when_available() {
        let site = site();
        let git = RecordingGit::default();
        let env = |key: &str| match key {
            "GITHUB_TOKEN" => Some("s3cret".to_string()),
            _ => None,
        };
        let deployer = GitDeployer::from_env(&git, DeployConfig::default(), &env, true);

        deployer.deploy(site.path(), "github.com/WMD-group/CarrierCapture.jl.git").unwrap();

        assert_eq!(
            git.calls.borrow()[0],
            vec![
                "ls-remote",
                "--heads",
                "https://s3cret@github.com/WMD-group/CarrierCapture.jl.git",
                "gh-pages"
            ]
        );
    }

    #[test]
    fn nothing_to_commit() {
        let site = site();
        let git = RecordingGit::default();
        let deployer = GitDeployer::new(&git, DeployConfig::default(), deploy_to(&["dev"]));

        let outcome = deployer.deploy(site.path(), "github.com/a/b.git").unwrap();

        assert!(matches!(outcome, DeployOutcome::Unchanged { .. }));
        assert!(!git.commands().contains(&"push".to_string()));
    }

    #[test]
    fn skip_runs_no_commands() {
        let site = site();
        let git = RecordingGit::default();
        let deployer = GitDeployer::from_env(&git, DeployConfig::default(), &|_: &str| None, false);

        let outcome = deployer.deploy(site.path(), "github.com/a/b.git").unwrap();

        assert!(matches!(outcome, DeployOutcome::Skipped { .. }));
        assert!(git.calls.borrow().is_empty());
    }

    #[test]
    fn dry_run_logs_instead_of_running() {
        let site = site();
        let git = RecordingGit::default();
        let deployer =
            GitDeployer::new(&git, DeployConfig::default(), deploy_to(&["dev"])).dry_run(true);

        let outcome = deployer.deploy(site.path(), "github.com/a/b.git").unwrap();

        assert_eq!(
            outcome,
            DeployOutcome::DryRun {
                subfolders: vec!["dev".to_string()]
            }
        );
        assert!(git.calls.borrow().is_empty());
    }

    #[test]
    fn missing_target_is_an_error() {
        let git = RecordingGit::default();
        let deployer = GitDeployer::new(&git, DeployConfig::default(), deploy_to(&["dev"]));

        let result = deployer.deploy(Path::new("/definitely/not/built"), "github.com/a/b.git");

        assert!(matches!(result, Err(DeployError::MissingTarget(_))));
    }

    #[test]
    fn versions_are_ordered() {
        let temp = tempdir().unwrap();
        for dir in ["dev", "stable", "v0.1.0", "v0.10.0", "v0.2.0", "v0.2.0-rc1", "previews"] {
            fs::create_dir_all(temp.path().join(dir)).unwrap();
        }

        let versions = collect_versions(temp.path(), "dev").unwrap();

        assert_eq!(
            versions,
            vec!["stable", "v0.10.0", "v0.2.0", "v0.2.0-rc1", "v0.1.0", "dev"]
        );
    }

    #[test]
    fn redirect_prefers_stable() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("dev")).unwrap();
        write_index_files(temp.path(), "dev").unwrap();
        let index = fs::read_to_string(temp.path().join("index.html")).unwrap();
        assert!(index.contains("url=./dev/"));

        fs::create_dir_all(temp.path().join("stable")).unwrap();
        write_index_files(temp.path(), "dev").unwrap();
        let index = fs::read_to_string(temp.path().join("index.html")).unwrap();
        assert!(index.contains("url=./stable/"));

        let versions = fs::read_to_string(temp.path().join("versions.js")).unwrap();
        assert_eq!(versions, "var DOC_VERSIONS = [\n  \"stable\",\n  \"dev\",\n];\n");
    }
}
