//! Configuration module
//!
//! Settings come from command-line flags, falling back to the environment
//! variables a workflow step exports, optionally layered over a TOML file.
//! Empty values count as unset since unset action inputs arrive as "".

use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::dispatch::Action;
use crate::error::ConfigError;
use crate::remote::github::client::DEFAULT_API_URL;

/// Main configuration structure
#[derive(Clone, Default, Serialize, Deserialize, Args)]
#[serde(default)]
pub struct Config {
    /// Action to run (`undeploy` removes the release, anything else deploys)
    #[arg(long, env = "INPUT_ACTION")]
    pub action: Option<String>,

    /// Deployment environment label
    #[arg(long, env = "DEPLOY_ENV")]
    pub deploy_env: Option<String>,

    /// Kubernetes namespace of the release
    #[arg(long, env = "DEPLOY_NAMESPACE")]
    pub deploy_namespace: Option<String>,

    /// Helm release name
    #[arg(long, env = "RELEASE_NAME")]
    pub release_name: Option<String>,

    /// Chart reference
    #[arg(long, env = "INPUT_CHARTNAME")]
    pub chart_name: Option<String>,

    /// Chart version
    #[arg(long, env = "INPUT_CHARTVERSION")]
    pub chart_version: Option<String>,

    /// Values file passed to helm with -f
    #[arg(long, env = "CHART_VALUES_FILE")]
    pub chart_values_file: Option<String>,

    /// Value for the `ingressroute.rule` chart override
    #[arg(long, env = "INGRESS_RULE")]
    pub ingress_rule: Option<String>,

    /// Value for the `image.tag` chart override
    #[arg(long, env = "IMAGE_TAG")]
    pub image_tag: Option<String>,

    /// Environment URL attached to deployment statuses
    #[arg(long, env = "DEPLOY_URL")]
    pub deploy_url: Option<String>,

    /// GitHub token
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    /// Helm executable
    #[arg(long, env = "HELM_BIN")]
    pub helm_bin: Option<String>,

    /// Kill helm after this many seconds (no limit when unset)
    #[arg(long, env = "HELM_TIMEOUT_SECS")]
    pub helm_timeout_secs: Option<u64>,

    #[command(flatten)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Args)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "LOG_LEVEL")]
    pub level: Option<String>,

    /// Log format (pretty, compact, json)
    #[arg(long = "log-format", env = "LOG_FORMAT")]
    pub format: Option<String>,
}

/// Settings needed by the deploy flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    pub environment: String,
    pub namespace: String,
    pub release_name: String,
    pub chart_name: String,
    pub chart_version: String,
    pub values_file: String,
    pub ingress_rule: Option<String>,
    pub image_tag: Option<String>,
    pub environment_url: Option<String>,
}

/// Settings needed by the undeploy flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndeploySettings {
    pub environment: String,
    pub namespace: String,
    pub release_name: String,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    present(value).ok_or(ConfigError::Missing(name))
}

fn layer(top: Option<String>, base: Option<String>) -> Option<String> {
    present(&top).or_else(|| present(&base))
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fill every unset value in `self` from `base`
    pub fn layered_over(self, base: Config) -> Config {
        Config {
            action: layer(self.action, base.action),
            deploy_env: layer(self.deploy_env, base.deploy_env),
            deploy_namespace: layer(self.deploy_namespace, base.deploy_namespace),
            release_name: layer(self.release_name, base.release_name),
            chart_name: layer(self.chart_name, base.chart_name),
            chart_version: layer(self.chart_version, base.chart_version),
            chart_values_file: layer(self.chart_values_file, base.chart_values_file),
            ingress_rule: layer(self.ingress_rule, base.ingress_rule),
            image_tag: layer(self.image_tag, base.image_tag),
            deploy_url: layer(self.deploy_url, base.deploy_url),
            token: layer(self.token, base.token),
            api_url: layer(self.api_url, base.api_url),
            helm_bin: layer(self.helm_bin, base.helm_bin),
            helm_timeout_secs: self.helm_timeout_secs.or(base.helm_timeout_secs),
            logging: LoggingConfig {
                level: layer(self.logging.level, base.logging.level),
                format: layer(self.logging.format, base.logging.format),
            },
        }
    }

    /// The flow selected by `action`
    pub fn action(&self) -> Action {
        Action::parse(self.action.as_deref())
    }

    /// GitHub token
    pub fn token(&self) -> Result<String, ConfigError> {
        required(&self.token, "token")
    }

    /// GitHub API base URL
    pub fn api_url(&self) -> String {
        present(&self.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Helm executable
    pub fn helm_bin(&self) -> String {
        present(&self.helm_bin).unwrap_or_else(|| "helm".to_string())
    }

    /// Optional limit on a single helm invocation
    pub fn helm_timeout(&self) -> Option<Duration> {
        self.helm_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Validate and extract the deploy flow settings
    pub fn deploy_settings(&self) -> Result<DeploySettings, ConfigError> {
        Ok(DeploySettings {
            environment: required(&self.deploy_env, "deploy_env")?,
            namespace: required(&self.deploy_namespace, "deploy_namespace")?,
            release_name: required(&self.release_name, "release_name")?,
            chart_name: required(&self.chart_name, "chart_name")?,
            chart_version: required(&self.chart_version, "chart_version")?,
            values_file: required(&self.chart_values_file, "chart_values_file")?,
            ingress_rule: present(&self.ingress_rule),
            image_tag: present(&self.image_tag),
            environment_url: present(&self.deploy_url),
        })
    }

    /// Validate and extract the undeploy flow settings
    pub fn undeploy_settings(&self) -> Result<UndeploySettings, ConfigError> {
        Ok(UndeploySettings {
            environment: required(&self.deploy_env, "deploy_env")?,
            namespace: required(&self.deploy_namespace, "deploy_namespace")?,
            release_name: required(&self.release_name, "release_name")?,
        })
    }
}
