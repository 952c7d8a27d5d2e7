//! Release Manager Trait
//!
//! Describes a Helm release and the install/uninstall operations run
//! against it. Argument lists are built here, independent of how the
//! package manager is executed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HelmError;

/// A single `--set key=value` chart override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueOverride {
    pub key: String,
    pub value: String,
}

impl ValueOverride {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for ValueOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Everything needed to install or upgrade one release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSpec {
    pub release_name: String,
    pub chart: String,
    pub chart_version: String,
    pub namespace: String,
    pub values_file: String,
    /// Applied in order, later entries win inside helm
    pub overrides: Vec<ValueOverride>,
}

impl ReleaseSpec {
    /// `upgrade --install --atomic` arguments for this release
    pub fn upgrade_args(&self) -> Vec<String> {
        let mut args = vec![
            "upgrade".to_string(),
            self.release_name.clone(),
            self.chart.clone(),
            "--install".to_string(),
            "--atomic".to_string(),
            "--namespace".to_string(),
            self.namespace.clone(),
            "--version".to_string(),
            self.chart_version.clone(),
            "-f".to_string(),
            self.values_file.clone(),
        ];

        for value in &self.overrides {
            args.push("--set".to_string());
            args.push(value.to_string());
        }

        args
    }
}

/// `uninstall` arguments for a release
pub fn uninstall_args(release_name: &str, namespace: &str) -> Vec<String> {
    vec![
        "uninstall".to_string(),
        release_name.to_string(),
        "--namespace".to_string(),
        namespace.to_string(),
    ]
}

/// Release manager trait - installs and removes releases
#[async_trait]
pub trait ReleaseManager: Send + Sync {
    /// Install or upgrade a release, rolling back on failure
    async fn install(&self, spec: &ReleaseSpec) -> Result<(), HelmError>;

    /// Remove a release
    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<(), HelmError>;
}
