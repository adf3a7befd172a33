//! Per-session presence controller.
//!
//! One controller task runs for the lifetime of an authenticated
//! listener session. It is a single explicit state machine driven by
//! exactly two subscriptions (the profile document and the store's
//! connection signal), and it is the only writer of the session's
//! presence record.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use solace_entity::listener::status::AppStatus;
use solace_entity::listener::store::ProfileStore;
use solace_entity::presence::record::PresenceRecord;
use solace_entity::presence::store::PresenceStore;

/// Connection lifecycle state of one listener session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No live connection.
    Disconnected,
    /// Connection live, but the profile has not been observed yet, so
    /// nothing has been announced.
    Connecting,
    /// Connection live and announced with the given availability.
    Connected {
        /// The availability the current-state record reflects.
        app_status: AppStatus,
    },
}

/// Handle to a spawned presence session.
#[derive(Debug)]
pub struct SessionHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Detach the session: cancel both subscriptions without writing a
    /// final state. An abrupt teardown relies on the registered
    /// last-will; a clean sign-out goes through `SessionTeardown`.
    pub fn detach(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Whether the session task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Detach and wait for the session task to end.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Keeps one listener's realtime presence consistent with their durable
/// preference and live connection state.
#[derive(Debug)]
pub struct PresenceSessionController {
    listener_id: Uuid,
    profiles: Arc<dyn ProfileStore>,
    presence: Arc<dyn PresenceStore>,
}

impl PresenceSessionController {
    /// Create a controller for one authenticated listener session.
    pub fn new(
        listener_id: Uuid,
        profiles: Arc<dyn ProfileStore>,
        presence: Arc<dyn PresenceStore>,
    ) -> Self {
        Self {
            listener_id,
            profiles,
            presence,
        }
    }

    /// Spawn the session task and return its handle.
    pub fn spawn(self) -> SessionHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        SessionHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut profile_rx = match self.profiles.watch(self.listener_id).await {
            Ok(rx) => rx,
            Err(e) => {
                tracing::error!(
                    listener_id = %self.listener_id,
                    error = %e,
                    "Failed to subscribe to profile; presence session not started"
                );
                return;
            }
        };

        let mut last_status: Option<AppStatus> = None;
        let initial_profile = profile_rx.borrow_and_update().clone();
        match initial_profile {
            Some(profile) => {
                if profile.is_admin {
                    self.exclude_admin().await;
                    return;
                }
                last_status = Some(profile.app_status);
            }
            None => {
                tracing::warn!(
                    listener_id = %self.listener_id,
                    "Profile missing at session start; waiting for document"
                );
            }
        }

        let mut connected_rx = self.presence.connection_signal(self.listener_id);
        let mut phase = SessionPhase::Disconnected;

        // The transport may have connected before this session attached.
        if *connected_rx.borrow_and_update() {
            phase = match last_status {
                Some(status) => self.announce(status).await,
                None => SessionPhase::Connecting,
            };
        }

        loop {
            tokio::select! {
                result = connected_rx.changed() => {
                    if result.is_err() {
                        break;
                    }
                    let connected = *connected_rx.borrow_and_update();
                    phase = if connected {
                        match last_status {
                            Some(status) => self.announce(status).await,
                            None => SessionPhase::Connecting,
                        }
                    } else {
                        // The registered last-will owns offline correctness.
                        SessionPhase::Disconnected
                    };
                }
                result = profile_rx.changed() => {
                    if result.is_err() {
                        break;
                    }
                    let profile = profile_rx.borrow_and_update().clone();
                    let Some(profile) = profile else {
                        tracing::warn!(
                            listener_id = %self.listener_id,
                            "Profile disappeared mid-session"
                        );
                        continue;
                    };

                    if profile.is_admin {
                        self.exclude_admin().await;
                        return;
                    }

                    let status = profile.app_status;
                    let previous = last_status.replace(status);

                    phase = match phase {
                        SessionPhase::Connecting => self.announce(status).await,
                        SessionPhase::Connected { app_status } if app_status != status => {
                            self.write_current(status).await;
                            SessionPhase::Connected { app_status: status }
                        }
                        // Disconnected: no write. The last-will path owns
                        // offline correctness, and the next connect edge
                        // re-announces from the latest status.
                        other => {
                            if previous != Some(status) {
                                tracing::debug!(
                                    listener_id = %self.listener_id,
                                    status = %status,
                                    "Availability changed while not announced"
                                );
                            }
                            other
                        }
                    };
                }
                _ = shutdown.changed() => {
                    break;
                }
            }
        }

        tracing::debug!(listener_id = %self.listener_id, "Presence session detached");
    }

    /// Announce a live session: register the last-will, then write the
    /// current-state record. The will registration must be acknowledged
    /// before the record can go online; if it fails, nothing is written
    /// and the next connect edge or the drift sweep repairs the state.
    async fn announce(&self, status: AppStatus) -> SessionPhase {
        let registered = self
            .presence
            .register_last_will(self.listener_id, PresenceRecord::last_will(status, Utc::now()))
            .await;

        if let Err(e) = registered {
            tracing::warn!(
                listener_id = %self.listener_id,
                error = %e,
                "Last-will registration failed; presence announce skipped"
            );
            return SessionPhase::Connecting;
        }

        self.write_current(status).await;
        SessionPhase::Connected { app_status: status }
    }

    async fn write_current(&self, status: AppStatus) {
        let record = PresenceRecord::current(status, Utc::now());
        if let Err(e) = self.presence.set(self.listener_id, record).await {
            tracing::warn!(
                listener_id = %self.listener_id,
                error = %e,
                "Presence write failed"
            );
        }
    }

    /// Admins are excluded from presence tracking: force the record
    /// offline and end the session without attaching the connection
    /// signal subscription.
    async fn exclude_admin(&self) {
        tracing::info!(
            listener_id = %self.listener_id,
            "Admin account; forcing presence offline"
        );
        if let Err(e) = self
            .presence
            .set(self.listener_id, PresenceRecord::signed_off(Utc::now()))
            .await
        {
            tracing::warn!(
                listener_id = %self.listener_id,
                error = %e,
                "Failed to force admin presence offline"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use solace_database::MemoryProfileStore;
    use solace_entity::listener::model::ListenerProfile;

    use crate::store::memory::MemoryPresenceStore;

    fn seed(profiles: &MemoryProfileStore, status: AppStatus, is_admin: bool) -> Uuid {
        let mut profile = ListenerProfile::new_approved(Uuid::new_v4(), "Meera");
        profile.app_status = status;
        profile.is_admin = is_admin;
        let id = profile.id;
        profiles.insert(profile);
        id
    }

    async fn wait_until<F>(mut check: F)
    where
        F: FnMut() -> bool,
    {
        for _ in 0..400 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met within timeout");
    }

    fn online(presence: &MemoryPresenceStore, id: Uuid) -> bool {
        presence.snapshot(id).map(|r| r.is_online).unwrap_or(false)
    }

    #[tokio::test]
    async fn test_connect_registers_will_before_online_record() {
        let profiles = Arc::new(MemoryProfileStore::new());
        let presence = Arc::new(MemoryPresenceStore::default());
        let id = seed(&profiles, AppStatus::Available, false);

        let handle =
            PresenceSessionController::new(id, profiles.clone(), presence.clone()).spawn();

        presence.client_connected(id);
        wait_until(|| online(&presence, id)).await;

        let record = presence.snapshot(id).unwrap();
        assert!(record.is_online);
        assert_eq!(record.app_status, AppStatus::Available);
        assert!(presence.has_last_will(id));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_change_while_connected_rewrites_record() {
        let profiles = Arc::new(MemoryProfileStore::new());
        let presence = Arc::new(MemoryPresenceStore::default());
        let id = seed(&profiles, AppStatus::Available, false);

        let handle =
            PresenceSessionController::new(id, profiles.clone(), presence.clone()).spawn();

        presence.client_connected(id);
        wait_until(|| online(&presence, id)).await;

        profiles.set_app_status(id, AppStatus::Offline).await.unwrap();
        wait_until(|| {
            presence
                .snapshot(id)
                .map(|r| !r.is_online && r.app_status == AppStatus::Offline)
                .unwrap_or(false)
        })
        .await;

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_change_while_disconnected_writes_nothing() {
        let profiles = Arc::new(MemoryProfileStore::new());
        let presence = Arc::new(MemoryPresenceStore::default());
        let id = seed(&profiles, AppStatus::Available, false);

        let handle =
            PresenceSessionController::new(id, profiles.clone(), presence.clone()).spawn();

        profiles.set_app_status(id, AppStatus::Busy).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(presence.snapshot(id).is_none());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconnect_reannounces_with_latest_status() {
        let profiles = Arc::new(MemoryProfileStore::new());
        let presence = Arc::new(MemoryPresenceStore::default());
        let id = seed(&profiles, AppStatus::Available, false);

        let handle =
            PresenceSessionController::new(id, profiles.clone(), presence.clone()).spawn();

        presence.client_connected(id);
        wait_until(|| online(&presence, id)).await;

        presence.client_disconnected(id);
        wait_until(|| !online(&presence, id)).await;
        assert!(!presence.has_last_will(id));

        presence.client_connected(id);
        wait_until(|| online(&presence, id)).await;
        assert!(presence.has_last_will(id));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_admin_session_is_excluded() {
        let profiles = Arc::new(MemoryProfileStore::new());
        let presence = Arc::new(MemoryPresenceStore::default());
        let id = seed(&profiles, AppStatus::Available, true);

        let handle =
            PresenceSessionController::new(id, profiles.clone(), presence.clone()).spawn();

        wait_until(|| presence.snapshot(id).map(|r| !r.is_online).unwrap_or(false)).await;
        wait_until(|| handle.is_finished()).await;

        // Connection events after exclusion have no presence effect.
        presence.client_connected(id);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let record = presence.snapshot(id).unwrap();
        assert!(!record.is_online);
        assert!(!presence.has_last_will(id));
    }

    #[tokio::test]
    async fn test_detach_stops_reacting_without_final_write() {
        let profiles = Arc::new(MemoryProfileStore::new());
        let presence = Arc::new(MemoryPresenceStore::default());
        let id = seed(&profiles, AppStatus::Available, false);

        let handle =
            PresenceSessionController::new(id, profiles.clone(), presence.clone()).spawn();

        presence.client_connected(id);
        wait_until(|| online(&presence, id)).await;

        handle.shutdown().await;

        // The record is untouched by detach; the will is still armed.
        assert!(presence.snapshot(id).unwrap().is_online);
        assert!(presence.has_last_will(id));

        profiles.set_app_status(id, AppStatus::Offline).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(presence.snapshot(id).unwrap().is_online);
    }
}
