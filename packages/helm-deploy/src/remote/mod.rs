//! Remote module
//!
//! This module provides abstraction over the deployment-tracking service
//! through a common DeploymentApi trait.

pub mod adapter;
pub mod github;
