//! Recording test doubles for the deployment API and the release manager.
//!
//! Both share one CallLog so tests can assert on the relative order of
//! remote calls and helm invocations.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::cli::config::{DeploySettings, UndeploySettings};
use crate::cli::context::TriggerContext;
use crate::error::{ApiError, HelmError};
use crate::release::adapter::{uninstall_args, ReleaseManager, ReleaseSpec};
use crate::remote::adapter::{
    DeploymentApi, DeploymentRecord, DeploymentState, DeploymentStatusRecord, NewDeployment,
    Repository, StatusUpdate,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateDeployment {
        git_ref: String,
        environment: String,
    },
    ListDeployments {
        environment: String,
    },
    SetStatus {
        deployment_id: u64,
        state: DeploymentState,
        log_url: Option<String>,
        environment_url: Option<String>,
    },
    DeleteDeployment {
        deployment_id: u64,
    },
    Helm {
        args: Vec<String>,
    },
}

impl Call {
    pub fn is_remote(&self) -> bool {
        !matches!(self, Call::Helm { .. })
    }
}

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn record(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn remote_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_remote).collect()
    }

    pub fn helm_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Helm { args } => Some(args),
                _ => None,
            })
            .collect()
    }

    /// States set, in call order
    pub fn states(&self) -> Vec<(u64, DeploymentState)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetStatus {
                    deployment_id,
                    state,
                    ..
                } => Some((deployment_id, state)),
                _ => None,
            })
            .collect()
    }
}

fn server_error() -> ApiError {
    ApiError::Status {
        status: 500,
        message: "Server Error".to_string(),
    }
}

pub struct MockApi {
    log: CallLog,
    next_id: u64,
    existing: Vec<u64>,
    fail_create: bool,
    fail_list: bool,
    failing_states: Vec<DeploymentState>,
    failing_status_ids: Vec<u64>,
    failing_delete_ids: Vec<u64>,
}

impl MockApi {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            next_id: 42,
            existing: Vec::new(),
            fail_create: false,
            fail_list: false,
            failing_states: Vec::new(),
            failing_status_ids: Vec::new(),
            failing_delete_ids: Vec::new(),
        }
    }

    pub fn with_next_id(mut self, id: u64) -> Self {
        self.next_id = id;
        self
    }

    pub fn with_existing(mut self, ids: &[u64]) -> Self {
        self.existing = ids.to_vec();
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_state(mut self, state: DeploymentState) -> Self {
        self.failing_states.push(state);
        self
    }

    pub fn failing_status_for(mut self, id: u64) -> Self {
        self.failing_status_ids.push(id);
        self
    }

    pub fn failing_delete_for(mut self, id: u64) -> Self {
        self.failing_delete_ids.push(id);
        self
    }
}

#[async_trait]
impl DeploymentApi for MockApi {
    async fn create_deployment(
        &self,
        _repo: &Repository,
        deployment: &NewDeployment,
    ) -> Result<DeploymentRecord, ApiError> {
        self.log.record(Call::CreateDeployment {
            git_ref: deployment.git_ref.clone(),
            environment: deployment.environment.clone(),
        });
        if self.fail_create {
            return Err(server_error());
        }
        Ok(DeploymentRecord {
            id: self.next_id,
            git_ref: deployment.git_ref.clone(),
            environment: deployment.environment.clone(),
            sha: None,
            created_at: None,
        })
    }

    async fn list_deployments(
        &self,
        _repo: &Repository,
        environment: &str,
    ) -> Result<Vec<DeploymentRecord>, ApiError> {
        self.log.record(Call::ListDeployments {
            environment: environment.to_string(),
        });
        if self.fail_list {
            return Err(server_error());
        }
        Ok(self
            .existing
            .iter()
            .map(|&id| DeploymentRecord {
                id,
                git_ref: "main".to_string(),
                environment: environment.to_string(),
                sha: None,
                created_at: None,
            })
            .collect())
    }

    async fn set_deployment_status(
        &self,
        _repo: &Repository,
        deployment_id: u64,
        status: &StatusUpdate,
    ) -> Result<DeploymentStatusRecord, ApiError> {
        self.log.record(Call::SetStatus {
            deployment_id,
            state: status.state,
            log_url: status.log_url.clone(),
            environment_url: status.environment_url.clone(),
        });
        // let sibling calls in a fan-out interleave
        tokio::task::yield_now().await;

        if self.failing_states.contains(&status.state)
            || self.failing_status_ids.contains(&deployment_id)
        {
            return Err(server_error());
        }
        Ok(DeploymentStatusRecord {
            id: 1,
            state: status.state,
            log_url: status.log_url.clone(),
            environment_url: status.environment_url.clone(),
        })
    }

    async fn delete_deployment(
        &self,
        _repo: &Repository,
        deployment_id: u64,
    ) -> Result<(), ApiError> {
        self.log.record(Call::DeleteDeployment { deployment_id });
        tokio::task::yield_now().await;

        if self.failing_delete_ids.contains(&deployment_id) {
            return Err(server_error());
        }
        Ok(())
    }
}

pub struct MockReleases {
    log: CallLog,
    fail_install: bool,
    fail_uninstall: bool,
}

impl MockReleases {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            fail_install: false,
            fail_uninstall: false,
        }
    }

    pub fn failing_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    pub fn failing_uninstall(mut self) -> Self {
        self.fail_uninstall = true;
        self
    }
}

fn helm_failure() -> HelmError {
    HelmError::Exited {
        code: Some(1),
        output: "Error: UPGRADE FAILED".to_string(),
    }
}

#[async_trait]
impl ReleaseManager for MockReleases {
    async fn install(&self, spec: &ReleaseSpec) -> Result<(), HelmError> {
        self.log.record(Call::Helm {
            args: spec.upgrade_args(),
        });
        if self.fail_install {
            return Err(helm_failure());
        }
        Ok(())
    }

    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<(), HelmError> {
        self.log.record(Call::Helm {
            args: uninstall_args(release_name, namespace),
        });
        if self.fail_uninstall {
            return Err(helm_failure());
        }
        Ok(())
    }
}

pub fn trigger_context() -> TriggerContext {
    TriggerContext {
        repository: Repository::new("acme", "website"),
        sha: Some("abc123".to_string()),
        event_name: Some("push".to_string()),
        head_ref: None,
        run_id: Some("987".to_string()),
        server_url: "https://github.com".to_string(),
    }
}

pub fn deploy_settings() -> DeploySettings {
    DeploySettings {
        environment: "staging".to_string(),
        namespace: "apps".to_string(),
        release_name: "web".to_string(),
        chart_name: "charts/web".to_string(),
        chart_version: "1.4.0".to_string(),
        values_file: "values/staging.yaml".to_string(),
        ingress_rule: None,
        image_tag: None,
        environment_url: None,
    }
}

pub fn undeploy_settings() -> UndeploySettings {
    UndeploySettings {
        environment: "staging".to_string(),
        namespace: "apps".to_string(),
        release_name: "web".to_string(),
    }
}
