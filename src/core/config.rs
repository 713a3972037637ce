//! Configuration management with layered hierarchy
//!
//! Sources merge in priority order: built-in defaults, then the global user
//! config, then the local `glsync.yaml` (or an explicit `--config` path),
//! then environment variables. The resulting `Config` is immutable and is
//! passed by reference into every component that needs it.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::gitlab::MilestoneScope;

/// Default GitLab REST v4 endpoint
pub const DEFAULT_API_URL: &str = "https://gitlab.com/api/v4";

/// Local config file looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "glsync.yaml";

/// Default marker for the repeated "related identities" CSV columns
const DEFAULT_RELATED_COLUMN: &str = "Related Teams";

/// Errors that can occur while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not readable: {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file invalid: {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    #[error("No GitLab token configured (set GITLAB_TOKEN or `token:` in glsync.yaml)")]
    MissingToken,

    #[error("No master project configured (set `master-project:` in glsync.yaml)")]
    MissingMasterProject,
}

/// Policy for the remaining-estimate field on migrated issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemainingEstimatePolicy {
    /// Only carry over a remaining estimate the export provides
    TrustSource,
    /// Fall back to `max(original - spent, 0)` when the export omits it
    #[default]
    Derive,
}

/// Policy for decorating child issue titles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChildTitlePolicy {
    /// Append the target project's display name, fetched from the API
    #[default]
    ProjectName,
    /// Append the identity key the child was routed by
    Identity,
}

/// glsync configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// GitLab API base URL (default: gitlab.com REST v4)
    pub api_url: Option<String>,

    /// Private token; usually supplied via GITLAB_TOKEN instead
    pub token: Option<String>,

    /// Project that receives one master issue per source record
    pub master_project: Option<u64>,

    /// Optional group scope for milestones, shared across all projects
    pub group: Option<u64>,

    /// Identity → child project id
    pub teams: BTreeMap<String, u64>,

    /// Identity → GitLab assignee user id
    pub assignees: BTreeMap<String, u64>,

    /// Substring marking the repeated "related identities" CSV columns
    pub related_column: Option<String>,

    /// How to fill the remaining-estimate field
    pub remaining_estimate: Option<RemainingEstimatePolicy>,

    /// How to decorate child issue titles
    pub child_title: Option<ChildTitlePolicy>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order.
    ///
    /// An explicit path that is missing or malformed is an error; discovered
    /// global config is skipped silently, a malformed local `glsync.yaml` is
    /// surfaced so a token typo does not masquerade as "missing token".
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/glsync/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                if let Ok(contents) = std::fs::read_to_string(&global_path) {
                    if let Ok(global) = serde_yml::from_str::<Config>(&contents) {
                        config.merge(global);
                    }
                }
            }
        }

        // 3. Local config (explicit --config path, or ./glsync.yaml)
        match explicit {
            Some(path) => {
                config.merge(Self::read_file(path)?);
            }
            None => {
                let local = PathBuf::from(LOCAL_CONFIG_FILE);
                if local.exists() {
                    config.merge(Self::read_file(&local)?);
                }
            }
        }

        // 4. Environment variables
        if let Ok(token) = std::env::var("GITLAB_TOKEN") {
            if !token.is_empty() {
                config.token = Some(token);
            }
        }
        if let Ok(url) = std::env::var("GITLAB_API_URL") {
            if !url.is_empty() {
                config.api_url = Some(url);
            }
        }

        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yml::from_str(&contents).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "glsync")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.api_url.is_some() {
            self.api_url = other.api_url;
        }
        if other.token.is_some() {
            self.token = other.token;
        }
        if other.master_project.is_some() {
            self.master_project = other.master_project;
        }
        if other.group.is_some() {
            self.group = other.group;
        }
        self.teams.extend(other.teams);
        self.assignees.extend(other.assignees);
        if other.related_column.is_some() {
            self.related_column = other.related_column;
        }
        if other.remaining_estimate.is_some() {
            self.remaining_estimate = other.remaining_estimate;
        }
        if other.child_title.is_some() {
            self.child_title = other.child_title;
        }
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// Token is required for any command that talks to the API
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)
    }

    pub fn require_master_project(&self) -> Result<u64, ConfigError> {
        self.master_project.ok_or(ConfigError::MissingMasterProject)
    }

    pub fn related_column(&self) -> &str {
        self.related_column
            .as_deref()
            .unwrap_or(DEFAULT_RELATED_COLUMN)
    }

    pub fn remaining_estimate_policy(&self) -> RemainingEstimatePolicy {
        self.remaining_estimate.unwrap_or_default()
    }

    pub fn child_title_policy(&self) -> ChildTitlePolicy {
        self.child_title.unwrap_or_default()
    }

    /// Milestone scope: a configured group wins, else the master project
    pub fn milestone_scope(&self) -> Result<MilestoneScope, ConfigError> {
        match self.group {
            Some(group) => Ok(MilestoneScope::Group(group)),
            None => Ok(MilestoneScope::Project(self.require_master_project()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert_eq!(config.related_column(), "Related Teams");
        assert_eq!(
            config.remaining_estimate_policy(),
            RemainingEstimatePolicy::Derive
        );
        assert_eq!(config.child_title_policy(), ChildTitlePolicy::ProjectName);
        assert!(config.require_token().is_err());
        assert!(config.require_master_project().is_err());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
master-project: 101
group: 55
teams:
  test-automation: 201
  simulation: 202
assignees:
  test-automation: 31073378
related-column: "Related Teams"
remaining-estimate: trust-source
child-title: identity
"#;
        let config: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.master_project, Some(101));
        assert_eq!(config.teams.get("simulation"), Some(&202));
        assert_eq!(config.assignees.get("test-automation"), Some(&31073378));
        assert_eq!(
            config.remaining_estimate_policy(),
            RemainingEstimatePolicy::TrustSource
        );
        assert_eq!(config.child_title_policy(), ChildTitlePolicy::Identity);
        assert!(matches!(
            config.milestone_scope().unwrap(),
            MilestoneScope::Group(55)
        ));
    }

    #[test]
    fn test_merge_prefers_other_and_extends_maps() {
        let mut base: Config = serde_yml::from_str(
            "master-project: 1\nteams:\n  a: 10\nassignees:\n  a: 100\n",
        )
        .unwrap();
        let overlay: Config =
            serde_yml::from_str("master-project: 2\nteams:\n  b: 20\n").unwrap();
        base.merge(overlay);
        assert_eq!(base.master_project, Some(2));
        assert_eq!(base.teams.get("a"), Some(&10));
        assert_eq!(base.teams.get("b"), Some(&20));
        assert_eq!(base.assignees.get("a"), Some(&100));
    }

    #[test]
    fn test_project_scope_when_no_group() {
        let config: Config = serde_yml::from_str("master-project: 7\n").unwrap();
        assert!(matches!(
            config.milestone_scope().unwrap(),
            MilestoneScope::Project(7)
        ));
    }
}
