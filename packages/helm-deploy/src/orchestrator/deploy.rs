//! Deploy Orchestrator
//!
//! Records a deployment, installs the release with helm and reports the
//! outcome back onto the deployment record.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cli::config::DeploySettings;
use crate::cli::context::TriggerContext;
use crate::error::{DeployError, DeployResult};
use crate::orchestrator::phase::{DeployPhase, PhaseTracker};
use crate::release::adapter::{ReleaseManager, ReleaseSpec, ValueOverride};
use crate::remote::adapter::{DeploymentApi, DeploymentState, NewDeployment, StatusUpdate};
use crate::workflow;

/// A chart override taken from an optional setting
struct OverrideRule {
    key: &'static str,
    value: fn(&DeploySettings) -> Option<&str>,
}

fn ingress_rule(settings: &DeploySettings) -> Option<&str> {
    settings.ingress_rule.as_deref()
}

fn image_tag(settings: &DeploySettings) -> Option<&str> {
    settings.image_tag.as_deref()
}

/// Evaluated top to bottom; the resulting `--set` pairs keep this order
const OVERRIDE_RULES: &[OverrideRule] = &[
    OverrideRule {
        key: "ingressroute.rule",
        value: ingress_rule,
    },
    OverrideRule {
        key: "image.tag",
        value: image_tag,
    },
];

/// Build the release to install from the deploy settings
pub fn release_spec(settings: &DeploySettings) -> ReleaseSpec {
    let overrides = OVERRIDE_RULES
        .iter()
        .filter_map(|rule| {
            (rule.value)(settings)
                .filter(|value| !value.is_empty())
                .map(|value| ValueOverride::new(rule.key, value))
        })
        .collect();

    ReleaseSpec {
        release_name: settings.release_name.clone(),
        chart: settings.chart_name.clone(),
        chart_version: settings.chart_version.clone(),
        namespace: settings.namespace.clone(),
        values_file: settings.values_file.clone(),
        overrides,
    }
}

/// Summary of a successful deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub deployment_id: u64,
    pub git_ref: String,
    pub environment: String,
    /// Wall time from start to the success status
    pub elapsed_ms: i64,
}

/// Drives one deploy run
pub struct DeployOrchestrator<A: DeploymentApi, R: ReleaseManager> {
    api: Arc<A>,
    releases: Arc<R>,
    context: TriggerContext,
    settings: DeploySettings,
    phases: Mutex<PhaseTracker>,
}

impl<A: DeploymentApi, R: ReleaseManager> DeployOrchestrator<A, R> {
    pub fn new(
        api: Arc<A>,
        releases: Arc<R>,
        context: TriggerContext,
        settings: DeploySettings,
    ) -> Self {
        Self {
            api,
            releases,
            context,
            settings,
            phases: Mutex::new(PhaseTracker::new()),
        }
    }

    fn advance(&self, next: DeployPhase) {
        self.phases.lock().transition_to(next);
    }

    /// Fail the run with `err`
    fn fail(&self, err: DeployError) -> DeployError {
        let mut phases = self.phases.lock();
        phases.transition_to(DeployPhase::Failed);
        debug!(
            path = ?phases.path(),
            elapsed_ms = phases.elapsed().num_milliseconds(),
            "Deploy run stopped"
        );
        err
    }

    /// Run the deploy flow to a terminal phase
    pub async fn run(&self) -> DeployResult<DeployReport> {
        let settings = &self.settings;
        info!(
            environment = %settings.environment,
            release = %settings.release_name,
            namespace = %settings.namespace,
            "Starting deploy"
        );

        let git_ref = self
            .context
            .deploy_ref()
            .map_err(|e| self.fail(e.into()))?;

        // Step 1: record the deployment
        let request = NewDeployment::new(git_ref.clone(), settings.environment.clone());
        info!(
            repository = %self.context.repository,
            git_ref = %git_ref,
            environment = %settings.environment,
            "Creating deployment"
        );
        let record = match self
            .api
            .create_deployment(&self.context.repository, &request)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                let err = DeployError::DeploymentCreate(e);
                error!(error = %err, "Failed to create deployment");
                return Err(self.fail(err));
            }
        };
        let deployment_id = record.id;
        self.advance(DeployPhase::Recorded);

        // Step 2: mark it in progress
        if let Err(err) = self.set_status(deployment_id, DeploymentState::InProgress).await {
            error!(deployment_id, error = %err, "Failed to mark deployment in progress");
            return Err(self.fail(err));
        }
        self.advance(DeployPhase::InProgress);

        // Step 3: install
        let spec = release_spec(settings);
        if let Err(source) = self.releases.install(&spec).await {
            let err = DeployError::Install {
                release: spec.release_name.clone(),
                source,
            };
            error!(deployment_id, error = %err, "Helm install failed");
            self.advance(DeployPhase::InstallFailed);
            self.mark_failed(deployment_id).await;
            return Err(self.fail(err));
        }
        self.advance(DeployPhase::Installed);

        // Step 4: report success
        if let Err(err) = self.set_status(deployment_id, DeploymentState::Success).await {
            error!(deployment_id, error = %err, "Failed to mark deployment successful");
            self.mark_failed(deployment_id).await;
            return Err(self.fail(err));
        }
        self.advance(DeployPhase::Succeeded);
        let elapsed_ms = self.phases.lock().elapsed().num_milliseconds();

        info!(
            deployment_id,
            environment = %settings.environment,
            elapsed_ms,
            "Deploy finished"
        );

        Ok(DeployReport {
            deployment_id,
            git_ref,
            environment: settings.environment.clone(),
            elapsed_ms,
        })
    }

    async fn set_status(&self, deployment_id: u64, state: DeploymentState) -> DeployResult<()> {
        let update = StatusUpdate::new(state)
            .with_log_url(self.context.log_url())
            .with_environment_url(self.settings.environment_url.clone());

        info!(deployment_id, state = %state, "Setting deployment state");

        self.api
            .set_deployment_status(&self.context.repository, deployment_id, &update)
            .await
            .map(|_| ())
            .map_err(|source| DeployError::StatusUpdate {
                deployment_id,
                state,
                source,
            })
    }

    /// Best effort: a failure here only warns, the caller reports its own error
    async fn mark_failed(&self, deployment_id: u64) {
        if let Err(e) = self.set_status(deployment_id, DeploymentState::Failure).await {
            warn!(
                deployment_id,
                error = %e,
                "Failed to set deployment state to failure"
            );
            workflow::warning(&format!("Failed to set deployment state to failure: {}", e));
        }
    }
}
