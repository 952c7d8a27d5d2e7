//! GitHub module
//!
//! DeploymentApi implementation backed by the GitHub REST API.

pub mod client;
