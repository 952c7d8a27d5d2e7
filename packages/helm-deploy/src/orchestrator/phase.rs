//! Deploy Phase Tracking
//!
//! The deploy flow is a linear state machine. The tracker validates each
//! step and keeps a timestamped history of the run.

use chrono::{DateTime, Duration, Utc};

/// Phases of a single deploy run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    /// Nothing has happened yet
    Start,
    /// Deployment record created
    Recorded,
    /// Record marked in_progress, helm about to run
    InProgress,
    /// Helm finished successfully
    Installed,
    /// Helm failed
    InstallFailed,
    /// Record marked success
    Succeeded,
    /// Run ended in failure
    Failed,
}

impl std::fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployPhase::Start => write!(f, "Start"),
            DeployPhase::Recorded => write!(f, "Recorded"),
            DeployPhase::InProgress => write!(f, "InProgress"),
            DeployPhase::Installed => write!(f, "Installed"),
            DeployPhase::InstallFailed => write!(f, "InstallFailed"),
            DeployPhase::Succeeded => write!(f, "Succeeded"),
            DeployPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Phase transition information
#[derive(Debug, Clone)]
pub struct PhaseTransition {
    pub from: DeployPhase,
    pub to: DeployPhase,
    pub timestamp: DateTime<Utc>,
}

/// Tracks the phase of one deploy run
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    current: DeployPhase,
    started_at: DateTime<Utc>,
    transitions: Vec<PhaseTransition>,
}

impl PhaseTracker {
    /// Create a tracker in the Start phase
    pub fn new() -> Self {
        Self {
            current: DeployPhase::Start,
            started_at: Utc::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> DeployPhase {
        self.current
    }

    /// Move to `next`; returns false and stays put if the step is not allowed
    pub fn transition_to(&mut self, next: DeployPhase) -> bool {
        if !Self::is_valid_transition(self.current, next) {
            tracing::warn!(from = %self.current, to = %next, "Rejected deploy phase transition");
            return false;
        }

        tracing::info!(from = %self.current, to = %next, "Deploy phase transition");

        self.transitions.push(PhaseTransition {
            from: self.current,
            to: next,
            timestamp: Utc::now(),
        });
        self.current = next;

        true
    }

    fn is_valid_transition(from: DeployPhase, to: DeployPhase) -> bool {
        matches!(
            (from, to),
            (DeployPhase::Start, DeployPhase::Recorded) |
            (DeployPhase::Start, DeployPhase::Failed) |
            (DeployPhase::Recorded, DeployPhase::InProgress) |
            (DeployPhase::Recorded, DeployPhase::Failed) |
            (DeployPhase::InProgress, DeployPhase::Installed) |
            (DeployPhase::InProgress, DeployPhase::InstallFailed) |
            (DeployPhase::Installed, DeployPhase::Succeeded) |
            // success status could not be recorded
            (DeployPhase::Installed, DeployPhase::Failed) |
            (DeployPhase::InstallFailed, DeployPhase::Failed)
        )
    }

    /// Phases visited so far, starting with Start
    pub fn path(&self) -> Vec<DeployPhase> {
        std::iter::once(DeployPhase::Start)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }

    /// Time from creation to the latest transition
    pub fn elapsed(&self) -> Duration {
        self.transitions
            .last()
            .map(|t| t.timestamp - self.started_at)
            .unwrap_or_else(Duration::zero)
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
