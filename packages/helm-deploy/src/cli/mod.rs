//! CLI module
//!
//! Configuration and run context handed to the orchestrators.

pub mod config;
pub mod context;
