//! Entry dispatch
//!
//! Picks the flow from the configured action and runs it once.

use std::sync::Arc;

use crate::cli::config::Config;
use crate::cli::context::TriggerContext;
use crate::error::DeployResult;
use crate::orchestrator::deploy::{DeployOrchestrator, DeployReport};
use crate::orchestrator::undeploy::{CleanupReport, UndeployOrchestrator};
use crate::release::adapter::ReleaseManager;
use crate::remote::adapter::DeploymentApi;

/// The flow to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Deploy,
    Undeploy,
}

impl Action {
    /// `undeploy` selects removal; anything else, including nothing, deploys
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("undeploy") => Action::Undeploy,
            _ => Action::Deploy,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Deploy => write!(f, "deploy"),
            Action::Undeploy => write!(f, "undeploy"),
        }
    }
}

/// Result of a completed flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Deployed(DeployReport),
    Undeployed(CleanupReport),
}

/// Validate the settings for the selected flow and run it
pub async fn run<A, R>(
    config: &Config,
    context: TriggerContext,
    api: Arc<A>,
    releases: Arc<R>,
) -> DeployResult<Outcome>
where
    A: DeploymentApi,
    R: ReleaseManager,
{
    match config.action() {
        Action::Undeploy => {
            let settings = config.undeploy_settings()?;
            UndeployOrchestrator::new(api, releases, context, settings)
                .run()
                .await
                .map(Outcome::Undeployed)
        }
        Action::Deploy => {
            let settings = config.deploy_settings()?;
            DeployOrchestrator::new(api, releases, context, settings)
                .run()
                .await
                .map(Outcome::Deployed)
        }
    }
}
