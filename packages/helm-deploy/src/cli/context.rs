//! Trigger context
//!
//! Metadata about the workflow run that triggered us: which repository,
//! which commit or branch, and which run to link status updates to.

use crate::error::ConfigError;
use crate::remote::adapter::Repository;

const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Workflow run metadata, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerContext {
    pub repository: Repository,
    pub sha: Option<String>,
    pub event_name: Option<String>,
    pub head_ref: Option<String>,
    pub run_id: Option<String>,
    pub server_url: String,
}

impl TriggerContext {
    /// Read the context from the runner's `GITHUB_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the context through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let full_name = get("GITHUB_REPOSITORY").ok_or(ConfigError::Missing("GITHUB_REPOSITORY"))?;
        let repository = Repository::parse(&full_name)
            .ok_or_else(|| ConfigError::InvalidRepository(full_name.clone()))?;

        Ok(Self {
            repository,
            sha: get("GITHUB_SHA"),
            event_name: get("GITHUB_EVENT_NAME"),
            head_ref: get("GITHUB_HEAD_REF"),
            run_id: get("GITHUB_RUN_ID"),
            server_url: get("GITHUB_SERVER_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
        })
    }

    /// Whether the run was triggered by a pull request
    pub fn is_pull_request(&self) -> bool {
        self.event_name.as_deref() == Some("pull_request")
    }

    /// The ref to deploy: the head branch for pull requests, else the commit
    pub fn deploy_ref(&self) -> Result<String, ConfigError> {
        if self.is_pull_request() {
            if let Some(head_ref) = &self.head_ref {
                return Ok(head_ref.clone());
            }
        }
        self.sha.clone().ok_or(ConfigError::Missing("GITHUB_SHA"))
    }

    /// Link to this workflow run, when the run id is known
    pub fn log_url(&self) -> Option<String> {
        self.run_id.as_ref().map(|run_id| {
            format!(
                "{}/{}/{}/actions/runs/{}",
                self.server_url, self.repository.owner, self.repository.name, run_id
            )
        })
    }
}
