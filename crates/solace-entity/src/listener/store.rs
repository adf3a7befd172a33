//! Durable profile store contract.

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use solace_core::result::AppResult;

use super::model::ListenerProfile;
use super::status::AppStatus;

/// Interface to the durable profile store.
///
/// Implemented by `ListenerRepository` (PostgreSQL) and by the in-memory
/// store used in tests and local development. The denormalized online
/// flag is only reachable through [`ProfileStore::set_online_flag`],
/// which the propagation trigger, the drift sweep and the sign-out
/// teardown own exclusively.
#[async_trait]
pub trait ProfileStore: Send + Sync + std::fmt::Debug + 'static {
    /// Point read of a profile by listener id.
    async fn get(&self, listener_id: Uuid) -> AppResult<Option<ListenerProfile>>;

    /// Live subscription to a profile document.
    ///
    /// The receiver holds the current value (possibly `None` for a
    /// missing profile) and is updated on every store write.
    async fn watch(&self, listener_id: Uuid) -> AppResult<watch::Receiver<Option<ListenerProfile>>>;

    /// Create a profile (listener approval collaborator path).
    async fn create(&self, profile: &ListenerProfile) -> AppResult<ListenerProfile>;

    /// Update the listener's availability intent.
    async fn set_app_status(&self, listener_id: Uuid, status: AppStatus) -> AppResult<()>;

    /// Write the denormalized online flag and stamp `last_seen_at`.
    ///
    /// Returns `false` when the profile does not exist; callers treat a
    /// missing profile as a logged skip, since account teardown can race
    /// with presence propagation. `reason` is recorded on forced-offline
    /// writes and cleared when the flag goes true.
    async fn set_online_flag(
        &self,
        listener_id: Uuid,
        online: bool,
        reason: Option<&str>,
    ) -> AppResult<bool>;

    /// Ids of every profile currently flagged online (sweep scan).
    async fn find_online_ids(&self) -> AppResult<Vec<Uuid>>;
}
