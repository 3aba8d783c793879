//! Notifications delivered to the presentation layer.

use serde::Serialize;

use super::orchestrator::RefreshBundle;
use crate::docker::{LifecycleError, Operation};

/// Everything the core tells the presentation layer.
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    /// A refresh cycle finished; the bundle replaces all prior state.
    Refreshed(RefreshBundle),
    /// A lifecycle operation finished.
    OperationCompleted(OperationReport),
}

/// Outcome of one lifecycle operation, reduced for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationReport {
    /// What was attempted, e.g. "stop container web".
    pub operation: String,
    /// True iff the runtime command exited 0.
    pub success: bool,
    /// Error text on failure.
    pub error: Option<String>,
}

impl OperationReport {
    /// Builds a report from an operation and its result.
    #[must_use]
    pub fn new(operation: &Operation, result: &Result<(), LifecycleError>) -> Self {
        let error = result.as_ref().err().map(|e| match e {
            LifecycleError::CommandFailed { output, .. } if !output.is_empty() => {
                format!("{}: {}", e, output)
            }
            _ => e.to_string(),
        });

        Self {
            operation: operation.to_string(),
            success: result.is_ok(),
            error,
        }
    }
}
