//! Explicit sign-out teardown.
//!
//! Invoked by the authentication layer before the session token is
//! invalidated: the session controller's subscriptions are about to be
//! torn down, so the offline state must be forced here, best-effort.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use solace_entity::listener::status::AppStatus;
use solace_entity::listener::store::ProfileStore;
use solace_entity::presence::record::PresenceRecord;
use solace_entity::presence::store::PresenceStore;

/// Reason marker recorded on the profile for sign-out writes.
const SIGN_OUT_REASON: &str = "signed_out";

/// Forces a signed-off presence state on explicit logout.
#[derive(Debug)]
pub struct SessionTeardown {
    profiles: Arc<dyn ProfileStore>,
    presence: Arc<dyn PresenceStore>,
}

impl SessionTeardown {
    /// Create a new teardown hook.
    pub fn new(profiles: Arc<dyn ProfileStore>, presence: Arc<dyn PresenceStore>) -> Self {
        Self { profiles, presence }
    }

    /// Write the signed-off shape to both stores. Every failure is
    /// logged; none blocks the logout.
    pub async fn on_session_end(&self, listener_id: Uuid) {
        let now = Utc::now();

        if let Err(e) = self
            .presence
            .set(listener_id, PresenceRecord::signed_off(now))
            .await
        {
            tracing::warn!(
                listener_id = %listener_id,
                error = %e,
                "Failed to write signed-off presence record"
            );
        }

        if let Err(e) = self
            .profiles
            .set_app_status(listener_id, AppStatus::Offline)
            .await
        {
            tracing::warn!(
                listener_id = %listener_id,
                error = %e,
                "Failed to reset app status on sign-out"
            );
        }

        match self
            .profiles
            .set_online_flag(listener_id, false, Some(SIGN_OUT_REASON))
            .await
        {
            Ok(false) => {
                tracing::warn!(
                    listener_id = %listener_id,
                    "Profile missing during sign-out teardown"
                );
            }
            Err(e) => {
                tracing::warn!(
                    listener_id = %listener_id,
                    error = %e,
                    "Failed to clear online flag on sign-out"
                );
            }
            Ok(true) => {}
        }

        tracing::info!(listener_id = %listener_id, "Session teardown complete");
    }
}
