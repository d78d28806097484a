//! Per-service outcomes and the aggregate sync report

use crate::{DragError, Result};
use std::fmt;

/// Terminal state of one service after a sync
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SyncOutcome {
    /// Uses a pre-built image, nothing to do
    Skipped,
    Pulled,
    BuiltAndPushed,
    /// Built locally, push disabled
    Built,
    Failed(String),
}

impl SyncOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Get status string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Pulled => "pulled",
            Self::BuiltAndPushed => "built and pushed",
            Self::Built => "built",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Outcomes of one sync invocation, in the order they were recorded
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    records: Vec<(String, SyncOutcome)>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, service: impl Into<String>, outcome: SyncOutcome) {
        self.records.push((service.into(), outcome));
    }

    pub fn outcomes(&self) -> &[(String, SyncOutcome)] {
        &self.records
    }

    pub fn outcome(&self, service: &str) -> Option<&SyncOutcome> {
        self.records
            .iter()
            .find(|(name, _)| name == service)
            .map(|(_, outcome)| outcome)
    }

    /// Failed services with their error messages, in recording order
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.records
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                SyncOutcome::Failed(reason) => Some((name.as_str(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        !self.records.iter().any(|(_, outcome)| outcome.is_failed())
    }

    /// Every failure message joined by newlines, `None` when nothing failed
    pub fn combined_errors(&self) -> Option<String> {
        let failures = self.failures();
        if failures.is_empty() {
            return None;
        }
        Some(
            failures
                .into_iter()
                .map(|(_, reason)| reason)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Turn any recorded failure into a single `SyncFailure`
    pub fn into_result(self) -> Result<Self> {
        match self.combined_errors() {
            Some(message) => Err(DragError::SyncFailure(message)),
            None => Ok(self),
        }
    }
}
