//! Undeploy Orchestrator
//!
//! Uninstalls the release, then retires every deployment recorded for the
//! environment: all of them are marked inactive, then all are deleted.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cli::config::UndeploySettings;
use crate::cli::context::TriggerContext;
use crate::error::{DeployError, DeployResult};
use crate::orchestrator::batch::BatchResult;
use crate::release::adapter::ReleaseManager;
use crate::remote::adapter::{DeploymentApi, DeploymentState, StatusUpdate};
use crate::workflow;

/// What the cleanup stage did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Deployments found for the environment
    pub discovered: Vec<u64>,
    /// Deployments marked inactive
    pub deactivated: Vec<u64>,
    /// Deployments deleted
    pub deleted: Vec<u64>,
}

/// Drives one undeploy run
pub struct UndeployOrchestrator<A: DeploymentApi, R: ReleaseManager> {
    api: Arc<A>,
    releases: Arc<R>,
    context: TriggerContext,
    settings: UndeploySettings,
}

impl<A: DeploymentApi, R: ReleaseManager> UndeployOrchestrator<A, R> {
    pub fn new(
        api: Arc<A>,
        releases: Arc<R>,
        context: TriggerContext,
        settings: UndeploySettings,
    ) -> Self {
        Self {
            api,
            releases,
            context,
            settings,
        }
    }

    /// Run both stages; an uninstall failure wins over a cleanup failure
    pub async fn run(&self) -> DeployResult<CleanupReport> {
        info!(
            environment = %self.settings.environment,
            release = %self.settings.release_name,
            namespace = %self.settings.namespace,
            "Starting undeploy"
        );

        let uninstalled = self.uninstall().await;
        if let Err(e) = &uninstalled {
            error!(error = %e, "Helm uninstall failed, cleaning up deployments anyway");
        }

        let cleaned = self.cleanup().await;

        match (uninstalled, cleaned) {
            (Err(primary), Err(secondary)) => {
                error!(error = %secondary, "Deployment cleanup also failed");
                Err(primary)
            }
            (Err(primary), Ok(_)) => Err(primary),
            (Ok(()), Err(e)) => {
                error!(error = %e, "Deployment cleanup failed");
                Err(e)
            }
            (Ok(()), Ok(report)) => {
                info!(
                    environment = %self.settings.environment,
                    deleted = report.deleted.len(),
                    "Undeploy finished"
                );
                Ok(report)
            }
        }
    }

    async fn uninstall(&self) -> DeployResult<()> {
        let settings = &self.settings;
        self.releases
            .uninstall(&settings.release_name, &settings.namespace)
            .await
            .map_err(|source| DeployError::Uninstall {
                release: settings.release_name.clone(),
                source,
            })
    }

    /// Mark every deployment of the environment inactive, then delete them
    pub async fn cleanup(&self) -> DeployResult<CleanupReport> {
        let repo = &self.context.repository;
        let environment = &self.settings.environment;
        info!(environment = %environment, "Deleting deployments for environment");

        let records = self
            .api
            .list_deployments(repo, environment)
            .await
            .map_err(|source| DeployError::DeploymentList {
                environment: environment.clone(),
                source,
            })?;
        let ids: Vec<u64> = records.iter().map(|record| record.id).collect();

        if ids.is_empty() {
            info!(environment = %environment, "No deployments to clean up");
            return Ok(CleanupReport::default());
        }
        info!(environment = %environment, count = ids.len(), "Found deployments");

        let inactive = StatusUpdate::new(DeploymentState::Inactive);
        let deactivated = BatchResult::run(&ids, |deployment_id| {
            let inactive = &inactive;
            async move {
                self.api
                    .set_deployment_status(repo, deployment_id, inactive)
                    .await
                    .map_err(|source| DeployError::StatusUpdate {
                        deployment_id,
                        state: DeploymentState::Inactive,
                        source,
                    })
            }
        })
        .await;
        for (deployment_id, e) in deactivated.failures() {
            warn!(deployment_id, error = %e, "Failed to mark deployment inactive");
            workflow::warning(&e.to_string());
        }

        let deleted = BatchResult::run(&ids, |deployment_id| async move {
            self.api
                .delete_deployment(repo, deployment_id)
                .await
                .map_err(|source| DeployError::DeploymentDelete {
                    deployment_id,
                    source,
                })
        })
        .await;
        for (deployment_id, e) in deleted.failures() {
            error!(deployment_id, error = %e, "Failed to delete deployment");
        }

        let report = CleanupReport {
            discovered: ids,
            deactivated: deactivated.succeeded(),
            deleted: deleted.succeeded(),
        };

        match deleted.into_first_error() {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}
