//! Job handler contract for scheduled work.

use async_trait::async_trait;
use serde_json::Value;

use solace_core::error::AppError;

/// Trait for scheduled job implementations.
///
/// Handlers are invoked directly by the scheduler; the optional return
/// value is a JSON report emitted to the operational logs.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Get the job type this handler processes.
    fn job_type(&self) -> &str;

    /// Execute the job.
    async fn execute(&self) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure — do not retry.
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure — the next scheduled run may succeed.
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}
