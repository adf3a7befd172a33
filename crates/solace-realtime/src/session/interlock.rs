//! Call-lifecycle busy interlock.
//!
//! The active-call component marks the listener busy for the duration of
//! a call and restores the prior intent afterwards. It mutates only the
//! profile; the session controller's status subscription carries the
//! change into the presence record.

use std::sync::Arc;

use uuid::Uuid;

use solace_core::error::AppError;
use solace_core::result::AppResult;
use solace_entity::listener::status::AppStatus;
use solace_entity::listener::store::ProfileStore;

/// Guard holding the pre-call availability of one listener.
#[derive(Debug)]
pub struct CallBusyGuard {
    profiles: Arc<dyn ProfileStore>,
    listener_id: Uuid,
    prior: AppStatus,
}

impl CallBusyGuard {
    /// Mark the listener busy at call start.
    ///
    /// Caches the current availability and writes `Busy` unless the
    /// listener is already busy.
    pub async fn engage(profiles: Arc<dyn ProfileStore>, listener_id: Uuid) -> AppResult<Self> {
        let profile = profiles.get(listener_id).await?.ok_or_else(|| {
            AppError::not_found(format!("Listener {listener_id} not found"))
        })?;

        let prior = profile.app_status;
        if prior != AppStatus::Busy {
            profiles.set_app_status(listener_id, AppStatus::Busy).await?;
        }

        tracing::debug!(
            listener_id = %listener_id,
            prior = %prior,
            "Call interlock engaged"
        );

        Ok(Self {
            profiles,
            listener_id,
            prior,
        })
    }

    /// The availability that will be restored on release.
    pub fn prior_status(&self) -> AppStatus {
        self.prior
    }

    /// Restore the pre-call availability at call end, for any reason.
    /// A listener who was `Offline` before the call stays `Offline`.
    pub async fn release(self) {
        if let Err(e) = self
            .profiles
            .set_app_status(self.listener_id, self.prior)
            .await
        {
            tracing::warn!(
                listener_id = %self.listener_id,
                error = %e,
                "Failed to restore pre-call availability"
            );
        } else {
            tracing::debug!(
                listener_id = %self.listener_id,
                restored = %self.prior,
                "Call interlock released"
            );
        }
    }
}
