//! Presence record value object and payload construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::listener::status::AppStatus;

/// The ephemeral realtime presence record for one listener.
///
/// `is_online` is true only while a live connection exists and the last
/// known `app_status` was `Available`. The record carries the status so
/// the last-will payload stays informative without a round-trip read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    /// Live-and-available flag.
    pub is_online: bool,
    /// Mirror of the profile's availability intent.
    pub app_status: AppStatus,
    /// Updated on every presence write.
    pub last_active: DateTime<Utc>,
}

impl PresenceRecord {
    /// The current-state payload written while connected.
    pub fn current(app_status: AppStatus, now: DateTime<Utc>) -> Self {
        Self {
            is_online: app_status.is_available(),
            app_status,
            last_active: now,
        }
    }

    /// The last-will payload registered on every connect.
    ///
    /// Always offline; preserves the availability intent observed at
    /// registration time.
    pub fn last_will(app_status: AppStatus, now: DateTime<Utc>) -> Self {
        Self {
            is_online: false,
            app_status,
            last_active: now,
        }
    }

    /// The payload written on explicit sign-out or admin exclusion.
    pub fn signed_off(now: DateTime<Utc>) -> Self {
        Self {
            is_online: false,
            app_status: AppStatus::Offline,
            last_active: now,
        }
    }

    /// Check whether this record's activity timestamp is older than the
    /// given cutoff.
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_active < cutoff
    }
}
