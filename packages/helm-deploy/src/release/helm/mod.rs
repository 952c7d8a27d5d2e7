//! Helm module
//!
//! ReleaseManager implementation that runs the helm CLI.

pub mod cli;
