//! Listener profile entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{AccountStatus, AppStatus};

/// A listener (counselor) profile in the Solace marketplace.
///
/// `is_online` is denormalized from the realtime presence store and is
/// never written by client-facing code; only the propagation trigger,
/// the drift sweep and the sign-out teardown may set it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ListenerProfile {
    /// Unique listener identifier.
    pub id: Uuid,
    /// Human-readable display name.
    pub display_name: String,
    /// The listener's availability intent.
    pub app_status: AppStatus,
    /// Denormalized online flag used by matching and admin counts.
    pub is_online: bool,
    /// Account lifecycle status.
    pub account_status: AccountStatus,
    /// Admins are excluded from presence tracking.
    pub is_admin: bool,
    /// Stamped on every denormalized flag write.
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Reason marker for the most recent forced-offline write.
    pub offline_reason: Option<String>,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
    /// When the profile was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ListenerProfile {
    /// Build the profile shape created when an application is approved.
    ///
    /// New listeners start signed off; they flip themselves `Available`
    /// from the dashboard after first login.
    pub fn new_approved(id: Uuid, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            display_name: display_name.into(),
            app_status: AppStatus::Offline,
            is_online: false,
            account_status: AccountStatus::Active,
            is_admin: false,
            last_seen_at: None,
            offline_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether this profile participates in presence tracking.
    pub fn tracks_presence(&self) -> bool {
        !self.is_admin
    }
}
