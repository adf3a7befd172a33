//! Presence propagation trigger.
//!
//! Mirrors realtime presence transitions into the durable profile
//! store's denormalized flag. Invoked with the before/after snapshot of
//! every presence record write; only an actual online-flag transition
//! produces a profile write.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use solace_core::result::AppResult;
use solace_entity::listener::store::ProfileStore;
use solace_entity::presence::store::PresenceChange;

/// Reactive mirror from the presence change feed to the profile store.
#[derive(Debug)]
pub struct PresencePropagator {
    profiles: Arc<dyn ProfileStore>,
}

impl PresencePropagator {
    /// Create a new propagator.
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// Apply one before/after change. Returns `true` when a profile
    /// write was performed.
    ///
    /// Replaying the same pair converges to the same end state: the
    /// write carries only values derived from the pair itself.
    pub async fn apply(&self, change: &PresenceChange) -> AppResult<bool> {
        let before_online = change.before.as_ref().map(|r| r.is_online).unwrap_or(false);
        let after_online = change.after.as_ref().map(|r| r.is_online).unwrap_or(false);

        // Heartbeats and metadata-only updates must not amplify into
        // profile writes.
        if before_online == after_online {
            return Ok(false);
        }

        let found = self
            .profiles
            .set_online_flag(change.listener_id, after_online, None)
            .await?;

        if !found {
            tracing::warn!(
                listener_id = %change.listener_id,
                "Profile missing during presence propagation; skipped"
            );
            return Ok(false);
        }

        tracing::debug!(
            listener_id = %change.listener_id,
            online = after_online,
            "Propagated presence transition"
        );
        Ok(true)
    }

    /// Consume a change feed until shutdown.
    pub fn spawn(
        self: Arc<Self>,
        mut changes: broadcast::Receiver<PresenceChange>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = changes.recv() => match result {
                        Ok(change) => {
                            if let Err(e) = self.apply(&change).await {
                                tracing::error!(
                                    listener_id = %change.listener_id,
                                    error = %e,
                                    "Presence propagation failed"
                                );
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Presence change feed lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = shutdown.changed() => break,
                }
            }
            tracing::debug!("Presence propagator stopped");
        })
    }
}
