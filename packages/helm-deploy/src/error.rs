//! Error types
//!
//! One enum per failure domain: the GitHub API, the helm subprocess,
//! configuration, and the orchestration stages that wrap them.

use std::path::PathBuf;

use thiserror::Error;

use crate::remote::adapter::DeploymentState;

/// Result type alias using [`DeployError`].
pub type DeployResult<T> = Result<T, DeployError>;

/// Failure talking to the deployments API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with an unexpected status code.
    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Failure running the helm executable.
#[derive(Debug, Error)]
pub enum HelmError {
    #[error("failed to start `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("helm exited with {}: {output}", exit_code_label(.code))]
    Exited { code: Option<i32>, output: String },

    #[error("helm did not finish within {secs}s")]
    TimedOut { secs: u64 },

    #[error("I/O error while running helm: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Invalid or missing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid repository `{0}`, expected `owner/name`")]
    InvalidRepository(String),

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown log format `{0}` (expected pretty, compact or json)")]
    InvalidLogFormat(String),
}

/// A failed orchestration stage, wrapping the underlying cause.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create deployment: {0}")]
    DeploymentCreate(#[source] ApiError),

    #[error("failed to set deployment {deployment_id} state to '{state}': {source}")]
    StatusUpdate {
        deployment_id: u64,
        state: DeploymentState,
        #[source]
        source: ApiError,
    },

    #[error("failed to list deployments for environment {environment}: {source}")]
    DeploymentList {
        environment: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to delete deployment {deployment_id}: {source}")]
    DeploymentDelete {
        deployment_id: u64,
        #[source]
        source: ApiError,
    },

    #[error("helm install of release {release} failed: {source}")]
    Install {
        release: String,
        #[source]
        source: HelmError,
    },

    #[error("helm uninstall of release {release} failed: {source}")]
    Uninstall {
        release: String,
        #[source]
        source: HelmError,
    },
}
