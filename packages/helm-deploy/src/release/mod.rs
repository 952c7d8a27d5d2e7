//! Release module
//!
//! This module provides abstraction over the package manager that installs
//! and removes releases through a common ReleaseManager trait.

pub mod adapter;
pub mod helm;
