//! Orchestrator module
//!
//! The deploy and undeploy flows, plus the phase tracking and fan-out
//! result types they use.

pub mod batch;
pub mod deploy;
pub mod phase;
pub mod undeploy;
