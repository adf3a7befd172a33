//! In-memory profile store for tests and local development.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::watch;
use uuid::Uuid;

use solace_core::error::AppError;
use solace_core::result::AppResult;
use solace_entity::listener::model::ListenerProfile;
use solace_entity::listener::status::AppStatus;
use solace_entity::listener::store::ProfileStore;

/// Dashmap-backed [`ProfileStore`] with the same observable semantics as
/// the PostgreSQL repository.
///
/// Counts online-flag writes and effective flag transitions so tests can
/// assert trigger idempotency and write amplification.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: DashMap<Uuid, ListenerProfile>,
    watchers: DashMap<Uuid, watch::Sender<Option<ListenerProfile>>>,
    flag_writes: AtomicU64,
    flag_transitions: AtomicU64,
}

impl MemoryProfileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile directly, bypassing the creation path.
    pub fn insert(&self, profile: ListenerProfile) {
        let id = profile.id;
        self.profiles.insert(id, profile.clone());
        self.publish(id, Some(profile));
    }

    /// Delete a profile (account-teardown collaborator path).
    pub fn remove(&self, listener_id: Uuid) {
        self.profiles.remove(&listener_id);
        self.publish(listener_id, None);
    }

    /// Number of online-flag writes applied to existing profiles.
    pub fn flag_writes(&self) -> u64 {
        self.flag_writes.load(Ordering::SeqCst)
    }

    /// Number of online-flag writes that changed the flag value.
    pub fn flag_transitions(&self) -> u64 {
        self.flag_transitions.load(Ordering::SeqCst)
    }

    fn publish(&self, listener_id: Uuid, profile: Option<ListenerProfile>) {
        if let Some(sender) = self.watchers.get(&listener_id) {
            let _ = sender.send(profile);
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, listener_id: Uuid) -> AppResult<Option<ListenerProfile>> {
        Ok(self.profiles.get(&listener_id).map(|p| p.value().clone()))
    }

    async fn watch(&self, listener_id: Uuid) -> AppResult<watch::Receiver<Option<ListenerProfile>>> {
        let current = self.profiles.get(&listener_id).map(|p| p.value().clone());
        let entry = self
            .watchers
            .entry(listener_id)
            .or_insert_with(|| watch::channel(None).0);
        let _ = entry.send(current);
        Ok(entry.subscribe())
    }

    async fn create(&self, profile: &ListenerProfile) -> AppResult<ListenerProfile> {
        self.insert(profile.clone());
        Ok(profile.clone())
    }

    async fn set_app_status(&self, listener_id: Uuid, status: AppStatus) -> AppResult<()> {
        let updated = match self.profiles.get_mut(&listener_id) {
            Some(mut entry) => {
                entry.app_status = status;
                entry.updated_at = Utc::now();
                entry.value().clone()
            }
            None => {
                return Err(AppError::not_found(format!(
                    "Listener {listener_id} not found"
                )));
            }
        };
        self.publish(listener_id, Some(updated));
        Ok(())
    }

    async fn set_online_flag(
        &self,
        listener_id: Uuid,
        online: bool,
        reason: Option<&str>,
    ) -> AppResult<bool> {
        let reason = if online { None } else { reason };

        let updated = match self.profiles.get_mut(&listener_id) {
            Some(mut entry) => {
                if entry.is_online != online {
                    self.flag_transitions.fetch_add(1, Ordering::SeqCst);
                }
                entry.is_online = online;
                entry.offline_reason = reason.map(str::to_string);
                entry.last_seen_at = Some(Utc::now());
                entry.updated_at = Utc::now();
                entry.value().clone()
            }
            None => return Ok(false),
        };

        self.flag_writes.fetch_add(1, Ordering::SeqCst);
        self.publish(listener_id, Some(updated));
        Ok(true)
    }

    async fn find_online_ids(&self) -> AppResult<Vec<Uuid>> {
        Ok(self
            .profiles
            .iter()
            .filter(|entry| entry.value().is_online)
            .map(|entry| *entry.key())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_profile() -> ListenerProfile {
        ListenerProfile::new_approved(Uuid::new_v4(), "Asha")
    }

    #[tokio::test]
    async fn test_set_online_flag_counts_transitions() {
        let store = MemoryProfileStore::new();
        let profile = make_profile();
        let id = profile.id;
        store.insert(profile);

        assert!(store.set_online_flag(id, true, None).await.unwrap());
        assert!(store.set_online_flag(id, true, None).await.unwrap());
        assert_eq!(store.flag_writes(), 2);
        assert_eq!(store.flag_transitions(), 1);
    }

    #[tokio::test]
    async fn test_missing_profile_is_skipped() {
        let store = MemoryProfileStore::new();
        assert!(!store.set_online_flag(Uuid::new_v4(), false, None).await.unwrap());
        assert_eq!(store.flag_writes(), 0);
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryProfileStore::new();
        let profile = make_profile();
        let created = store.create(&profile).await.unwrap();
        assert_eq!(created.id, profile.id);
        assert!(store.get(profile.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_offline_reason_cleared_when_online() {
        let store = MemoryProfileStore::new();
        let profile = make_profile();
        let id = profile.id;
        store.insert(profile);

        store
            .set_online_flag(id, false, Some("presence_sweep"))
            .await
            .unwrap();
        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.offline_reason.as_deref(), Some("presence_sweep"));

        store
            .set_online_flag(id, true, Some("presence_sweep"))
            .await
            .unwrap();
        let stored = store.get(id).await.unwrap().unwrap();
        assert!(stored.offline_reason.is_none());
    }

    #[tokio::test]
    async fn test_watch_sees_status_updates() {
        let store = MemoryProfileStore::new();
        let profile = make_profile();
        let id = profile.id;
        store.insert(profile);

        let mut rx = store.watch(id).await.unwrap();
        assert!(rx.borrow().is_some());

        store.set_app_status(id, AppStatus::Available).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow().as_ref().unwrap().app_status,
            AppStatus::Available
        );
    }

    #[tokio::test]
    async fn test_find_online_ids() {
        let store = MemoryProfileStore::new();
        let a = make_profile();
        let b = make_profile();
        let a_id = a.id;
        store.insert(a);
        store.insert(b);

        store.set_online_flag(a_id, true, None).await.unwrap();
        let online = store.find_online_ids().await.unwrap();
        assert_eq!(online, vec![a_id]);
    }
}
