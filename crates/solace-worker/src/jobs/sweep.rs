//! Presence drift reconciliation sweep.
//!
//! Periodic self-healing pass over every profile flagged online: the
//! backstop for missed trigger invocations. Holds no in-memory state
//! between runs and is safe to run concurrently with itself.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use solace_core::result::AppResult;
use solace_entity::listener::store::ProfileStore;
use solace_entity::presence::store::PresenceStore;

use crate::executor::{JobExecutionError, JobHandler};

/// Reason marker recorded on profiles corrected by the sweep.
const SWEEP_REASON: &str = "presence_sweep";

/// Per-listener sweep outcome.
#[derive(Debug, Default)]
struct ListenerOutcome {
    corrected: bool,
    record_removed: bool,
}

/// Finds and corrects profiles whose denormalized flag has drifted from
/// the realtime ground truth.
#[derive(Debug)]
pub struct PresenceSweepHandler {
    /// Durable profile store.
    profiles: Arc<dyn ProfileStore>,
    /// Realtime presence store.
    presence: Arc<dyn PresenceStore>,
    /// Staleness threshold for presence activity.
    stale_after: Duration,
}

impl PresenceSweepHandler {
    /// Create a new sweep handler.
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        presence: Arc<dyn PresenceStore>,
        stale_after_minutes: i64,
    ) -> Self {
        Self {
            profiles,
            presence,
            stale_after: Duration::minutes(stale_after_minutes),
        }
    }

    /// Run one full reconciliation pass.
    pub async fn reconcile(&self) -> Result<Value, JobExecutionError> {
        tracing::debug!("Running presence drift sweep");

        let cutoff = Utc::now() - self.stale_after;

        let online_ids = self.profiles.find_online_ids().await.map_err(|e| {
            JobExecutionError::Transient(format!("Failed to list online profiles: {e}"))
        })?;

        let scanned = online_ids.len();
        let mut corrected = 0usize;
        let mut records_removed = 0usize;
        let mut failures = 0usize;

        for listener_id in online_ids {
            match self.reconcile_listener(listener_id, cutoff).await {
                Ok(outcome) => {
                    if outcome.corrected {
                        corrected += 1;
                    }
                    if outcome.record_removed {
                        records_removed += 1;
                    }
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        listener_id = %listener_id,
                        error = %e,
                        "Failed to reconcile listener; continuing sweep"
                    );
                }
            }
        }

        if corrected > 0 || failures > 0 {
            tracing::info!(
                scanned,
                corrected,
                records_removed,
                failures,
                "Presence drift sweep finished"
            );
        }

        Ok(serde_json::json!({
            "task": "presence_sweep",
            "scanned": scanned,
            "corrected": corrected,
            "records_removed": records_removed,
            "failures": failures,
            "stale_after_minutes": self.stale_after.num_minutes(),
        }))
    }

    /// Cross-check one flagged-online profile against the realtime
    /// record. A profile is stale when the record is absent, reports
    /// offline, or reports online with no activity since the cutoff.
    async fn reconcile_listener(
        &self,
        listener_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> AppResult<ListenerOutcome> {
        let record = self.presence.get(listener_id).await?;

        let stale = match &record {
            None => true,
            Some(r) => !r.is_online || r.is_stale(cutoff),
        };

        if !stale {
            return Ok(ListenerOutcome::default());
        }

        let found = self
            .profiles
            .set_online_flag(listener_id, false, Some(SWEEP_REASON))
            .await?;
        if !found {
            tracing::warn!(
                listener_id = %listener_id,
                "Profile missing during sweep; skipped"
            );
        }

        // An unresponsive record cannot be trusted; removing it forces
        // the next connect to re-establish state cleanly.
        let mut record_removed = false;
        if let Some(r) = &record {
            if r.is_stale(cutoff) {
                self.presence.remove(listener_id).await?;
                record_removed = true;
                tracing::debug!(
                    listener_id = %listener_id,
                    last_active = %r.last_active,
                    "Removed stale presence record"
                );
            }
        }

        Ok(ListenerOutcome {
            corrected: true,
            record_removed,
        })
    }
}

#[async_trait]
impl JobHandler for PresenceSweepHandler {
    fn job_type(&self) -> &str {
        "presence_sweep"
    }

    async fn execute(&self) -> Result<Option<Value>, JobExecutionError> {
        let report = self.reconcile().await?;
        Ok(Some(report))
    }
}
