//! Where a CI run should deploy to.

use std::sync::LazyLock;

use regex::Regex;

use ccap_site::DeployConfig;

static RELEASE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?(\d+)\.(\d+)\.(\d+)(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$")
        .expect("Invalid release tag regex")
});

static PULL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^refs/pull/(\d+)/merge$").expect("Invalid pull request ref regex"));

/// Whether to deploy, and into which subfolders of the pages branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployDecision {
    Deploy { subfolders: Vec<String>, reason: String },
    Skip { reason: String },
}

impl DeployDecision {
    /// Decide from GitHub Actions variables.
    ///
    /// A push to `devbranch` deploys to `devurl`, a release tag to the tag
    /// folder and `stable` (prereleases only to their own folder), a pull
    /// request to `previews/PR<n>` when previews are enabled. `force` deploys
    /// to `devurl` whenever the run would otherwise be skipped.
    pub fn from_env(
        get_env: &impl Fn(&str) -> Option<String>,
        config: &DeployConfig,
        force: bool,
    ) -> Self {
        let decision = Self::from_github_actions(get_env, config);
        match decision {
            Self::Skip { reason } if force => Self::Deploy {
                subfolders: vec![config.devurl.clone()],
                reason: format!("forced ({})", reason),
            },
            other => other,
        }
    }

    fn from_github_actions(get_env: &impl Fn(&str) -> Option<String>, config: &DeployConfig) -> Self {
        if get_env("GITHUB_ACTIONS").as_deref() != Some("true") {
            return Self::Skip {
                reason: "not running on GitHub Actions".to_string(),
            };
        }

        let event = get_env("GITHUB_EVENT_NAME").unwrap_or_default();
        let git_ref = get_env("GITHUB_REF").unwrap_or_default();

        match event.as_str() {
            "push" | "workflow_dispatch" | "schedule" => {
                if let Some(tag) = git_ref.strip_prefix("refs/tags/") {
                    return match RELEASE_TAG.captures(tag) {
                        Some(caps) if caps.get(4).is_none() => Self::Deploy {
                            subfolders: vec![tag.to_string(), "stable".to_string()],
                            reason: format!("release tag {}", tag),
                        },
                        Some(_) => Self::Deploy {
                            subfolders: vec![tag.to_string()],
                            reason: format!("prerelease tag {}", tag),
                        },
                        None => Self::Skip {
                            reason: format!("tag {} is not a version number", tag),
                        },
                    };
                }

                let branch = git_ref.strip_prefix("refs/heads/").unwrap_or(&git_ref);
                if branch == config.devbranch {
                    Self::Deploy {
                        subfolders: vec![config.devurl.clone()],
                        reason: format!("push to {}", branch),
                    }
                } else {
                    Self::Skip {
                        reason: format!(
                            "branch {} is not the development branch {}",
                            branch, config.devbranch
                        ),
                    }
                }
            }
            "pull_request" => {
                let Some(number) = PULL_REF.captures(&git_ref).and_then(|c| c.get(1)) else {
                    return Self::Skip {
                        reason: format!("unrecognised pull request ref {}", git_ref),
                    };
                };
                if config.push_preview {
                    Self::Deploy {
                        subfolders: vec![format!("previews/PR{}", number.as_str())],
                        reason: format!("preview of pull request #{}", number.as_str()),
                    }
                } else {
                    Self::Skip {
                        reason: "pull request previews are disabled".to_string(),
                    }
                }
            }
            other => Self::Skip {
                reason: format!("event '{}' does not deploy", other),
            },
        }
    }

    pub fn should_deploy(&self) -> bool {
        matches!(self, Self::Deploy { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn actions(event: &str, git_ref: &str) -> impl Fn(&str) -> Option<String> {
        env(&[
            ("GITHUB_ACTIONS", "true"),
            ("GITHUB_EVENT_NAME", event),
            ("GITHUB_REF", git_ref),
        ])
    }

    fn subfolders(decision: DeployDecision) -> Vec<String> {
        match decision {
            DeployDecision::Deploy { subfolders, .. } => subfolders,
            DeployDecision::Skip { reason } => panic!("skipped: {}", reason),
        }
    }

    #[test]
    fn push_to_devbranch_deploys_dev() {
        let config = DeployConfig::default();
        let decision = DeployDecision::from_env(&actions("push", "refs/heads/master"), &config, false);

        assert_eq!(subfolders(decision), vec!["dev"]);
    }

    #[test]
    fn push_to_other_branch_is_skipped() {
        let config = DeployConfig::default();
        let decision = DeployDecision::from_env(&actions("push", "refs/heads/feature"), &config, false);

        assert!(!decision.should_deploy());
    }

    #[test]
    fn release_tags_deploy_stable() {
        let config = DeployConfig::default();

        let decision = DeployDecision::from_env(&actions("push", "refs/tags/v0.4.1"), &config, false);
        assert_eq!(subfolders(decision), vec!["v0.4.1", "stable"]);

        let decision = DeployDecision::from_env(&actions("push", "refs/tags/v1.0.0-rc1"), &config, false);
        assert_eq!(subfolders(decision), vec!["v1.0.0-rc1"]);

        let decision = DeployDecision::from_env(&actions("push", "refs/tags/nightly"), &config, false);
        assert!(!decision.should_deploy());
    }

    #[test]
    fn pull_requests_need_previews_enabled() {
        let mut config = DeployConfig::default();
        let pr = actions("pull_request", "refs/pull/42/merge");

        assert!(!DeployDecision::from_env(&pr, &config, false).should_deploy());

        config.push_preview = true;
        assert_eq!(
            subfolders(DeployDecision::from_env(&pr, &config, false)),
            vec!["previews/PR42"]
        );
    }

    #[test]
    fn local_runs_need_force() {
        let config = DeployConfig::default();

        let decision = DeployDecision::from_env(&env(&[]), &config, false);
        assert!(matches!(decision, DeployDecision::Skip { reason } if reason.contains("GitHub Actions")));

        let decision = DeployDecision::from_env(&env(&[("CI", "true")]), &config, true);
        assert_eq!(subfolders(decision), vec!["dev"]);
    }

    #[test]
    fn custom_devbranch_and_devurl() {
        let config = DeployConfig {
            devbranch: "main".to_string(),
            devurl: "latest".to_string(),
            ..DeployConfig::default()
        };

        let decision = DeployDecision::from_env(&actions("push", "refs/heads/main"), &config, false);
        assert_eq!(subfolders(decision), vec!["latest"]);

        let decision = DeployDecision::from_env(&actions("push", "refs/heads/master"), &config, false);
        assert!(!decision.should_deploy());
    }

    #[test]
    fn other_events_are_skipped() {
        let config = DeployConfig::default();
        let decision = DeployDecision::from_env(&actions("release", "refs/tags/v1.0.0"), &config, false);

        assert!(!decision.should_deploy());
    }
}
