//! Deployment API Trait
//!
//! Defines the operations the orchestrators need from a deployment-tracking
//! service, and the records exchanged with it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Repository that owns the deployments (`owner/name`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse the `owner/name` form used by `GITHUB_REPOSITORY`
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, name) = full_name.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Deployment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    InProgress,
    Success,
    Failure,
    /// Applied to existing deployments before they are deleted
    Inactive,
}

impl std::fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentState::InProgress => write!(f, "in_progress"),
            DeploymentState::Success => write!(f, "success"),
            DeploymentState::Failure => write!(f, "failure"),
            DeploymentState::Inactive => write!(f, "inactive"),
        }
    }
}

/// Deployment record as stored by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: u64,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub environment: String,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Request body for creating a deployment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDeployment {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub environment: String,
    pub required_contexts: Vec<String>,
    pub auto_merge: bool,
}

impl NewDeployment {
    /// A deployment of `git_ref` that skips status checks and never auto-merges
    pub fn new(git_ref: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            git_ref: git_ref.into(),
            environment: environment.into(),
            required_contexts: Vec::new(),
            auto_merge: false,
        }
    }
}

/// Request body for a deployment status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub state: DeploymentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_url: Option<String>,
}

impl StatusUpdate {
    pub fn new(state: DeploymentState) -> Self {
        Self {
            state,
            log_url: None,
            environment_url: None,
        }
    }

    pub fn with_log_url(mut self, url: Option<String>) -> Self {
        self.log_url = url;
        self
    }

    pub fn with_environment_url(mut self, url: Option<String>) -> Self {
        self.environment_url = url;
        self
    }
}

/// Status confirmation returned after a status update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentStatusRecord {
    pub id: u64,
    pub state: DeploymentState,
    #[serde(default)]
    pub log_url: Option<String>,
    #[serde(default)]
    pub environment_url: Option<String>,
}

/// Deployment API trait - the remote operations the orchestrators drive
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Create a deployment record
    async fn create_deployment(
        &self,
        repo: &Repository,
        deployment: &NewDeployment,
    ) -> Result<DeploymentRecord, ApiError>;

    /// List every deployment tagged with `environment`
    async fn list_deployments(
        &self,
        repo: &Repository,
        environment: &str,
    ) -> Result<Vec<DeploymentRecord>, ApiError>;

    /// Create a status for a deployment
    async fn set_deployment_status(
        &self,
        repo: &Repository,
        deployment_id: u64,
        status: &StatusUpdate,
    ) -> Result<DeploymentStatusRecord, ApiError>;

    /// Delete a deployment
    async fn delete_deployment(&self, repo: &Repository, deployment_id: u64)
        -> Result<(), ApiError>;
}
