//! Cron scheduler for periodic maintenance tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use solace_core::error::AppError;

use crate::executor::JobHandler;

/// Cron-based scheduler that invokes registered job handlers directly.
pub struct CronScheduler {
    /// The underlying job scheduler.
    scheduler: JobScheduler,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler.
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler })
    }

    /// Register a handler on a 6-field cron schedule.
    pub async fn register(
        &self,
        schedule: &str,
        handler: Arc<dyn JobHandler>,
    ) -> Result<(), AppError> {
        let job_type = handler.job_type().to_string();

        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                tracing::debug!(job_type = handler.job_type(), "Running scheduled job");
                match handler.execute().await {
                    Ok(Some(report)) => {
                        tracing::info!(
                            job_type = handler.job_type(),
                            %report,
                            "Scheduled job finished"
                        );
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(
                            job_type = handler.job_type(),
                            error = %e,
                            "Scheduled job failed"
                        );
                    }
                }
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create schedule for '{job_type}': {e}"))
        })?;

        let mut scheduler = self.scheduler.clone();
        scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add schedule for '{job_type}': {e}"))
        })?;

        tracing::info!(job_type = %job_type, schedule, "Registered scheduled job");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
