//! GitHub Client
//!
//! Implementation of DeploymentApi for the GitHub REST deployments API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::remote::adapter::{
    DeploymentApi, DeploymentRecord, DeploymentStatusRecord, NewDeployment, Repository,
    StatusUpdate,
};

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// GitHub deployments client
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    /// Create a client against a custom API root (GitHub Enterprise, tests)
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ApiError::Decode(format!("invalid token: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("helm-deploy/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn deployments_url(&self, repo: &Repository) -> String {
        format!(
            "{}/repos/{}/{}/deployments",
            self.base_url, repo.owner, repo.name
        )
    }

    /// Turn a non-success response into an ApiError
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        Err(Self::status_error(response).await)
    }

    /// Build a status error, preferring GitHub's `message` over the raw body
    async fn status_error(response: Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);

        ApiError::Status { status, message }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DeploymentApi for GitHubClient {
    async fn create_deployment(
        &self,
        repo: &Repository,
        deployment: &NewDeployment,
    ) -> Result<DeploymentRecord, ApiError> {
        let url = self.deployments_url(repo);
        debug!(url = %url, "Creating deployment");

        let response = self.client.post(&url).json(deployment).send().await?;
        let response = Self::check(response).await?;

        // 202 means GitHub merged the default branch instead of deploying
        if response.status() == StatusCode::ACCEPTED {
            return Err(Self::status_error(response).await);
        }

        Self::decode(response).await
    }

    async fn list_deployments(
        &self,
        repo: &Repository,
        environment: &str,
    ) -> Result<Vec<DeploymentRecord>, ApiError> {
        let url = self.deployments_url(repo);
        let mut deployments = Vec::new();
        let mut page = 1usize;

        loop {
            debug!(url = %url, environment = %environment, page, "Listing deployments");
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("environment", environment.to_string()),
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await?;
            let response = Self::check(response).await?;

            let batch: Vec<DeploymentRecord> = Self::decode(response).await?;
            let done = batch.len() < PAGE_SIZE;
            deployments.extend(batch);

            if done {
                break;
            }
            page += 1;
        }

        Ok(deployments)
    }

    async fn set_deployment_status(
        &self,
        repo: &Repository,
        deployment_id: u64,
        status: &StatusUpdate,
    ) -> Result<DeploymentStatusRecord, ApiError> {
        let url = format!("{}/{}/statuses", self.deployments_url(repo), deployment_id);
        debug!(url = %url, state = %status.state, "Creating deployment status");

        let response = self.client.post(&url).json(status).send().await?;
        let response = Self::check(response).await?;

        Self::decode(response).await
    }

    async fn delete_deployment(
        &self,
        repo: &Repository,
        deployment_id: u64,
    ) -> Result<(), ApiError> {
        let url = format!("{}/{}", self.deployments_url(repo), deployment_id);
        debug!(url = %url, "Deleting deployment");

        let response = self.client.delete(&url).send().await?;
        Self::check(response).await?;

        Ok(())
    }
}
