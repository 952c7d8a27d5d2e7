//! Helm Deploy Library
//!
//! Installs, upgrades and removes Helm releases from a CI job while
//! mirroring each run into GitHub deployments: a deployment record is
//! created and moved through its states as helm runs, and retired when
//! the release is removed.

pub mod cli;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod release;
pub mod remote;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use cli::config::{Config, DeploySettings, LoggingConfig, UndeploySettings};
pub use cli::context::TriggerContext;
pub use dispatch::{Action, Outcome};
pub use error::{ApiError, ConfigError, DeployError, DeployResult, HelmError};
pub use orchestrator::deploy::{DeployOrchestrator, DeployReport};
pub use orchestrator::undeploy::{CleanupReport, UndeployOrchestrator};
pub use release::adapter::{ReleaseManager, ReleaseSpec, ValueOverride};
pub use release::helm::cli::HelmCli;
pub use remote::adapter::{DeploymentApi, DeploymentRecord, DeploymentState, Repository};
pub use remote::github::client::GitHubClient;
