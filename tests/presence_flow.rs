//! End-to-end presence reconciliation flows over the in-memory stores:
//! session controller → presence store → propagation trigger → profile
//! store, with the drift sweep as the backstop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use uuid::Uuid;

use solace_database::MemoryProfileStore;
use solace_entity::listener::model::ListenerProfile;
use solace_entity::listener::status::AppStatus;
use solace_entity::listener::store::ProfileStore;
use solace_entity::presence::store::PresenceStore;
use solace_realtime::{
    CallBusyGuard, MemoryPresenceStore, PresencePropagator, PresenceSessionController,
    SessionHandle, SessionTeardown,
};
use solace_worker::PresenceSweepHandler;

struct Harness {
    profiles: Arc<MemoryProfileStore>,
    presence: Arc<MemoryPresenceStore>,
    shutdown: watch::Sender<bool>,
}

impl Harness {
    fn new() -> Self {
        let profiles = Arc::new(MemoryProfileStore::new());
        let presence = Arc::new(MemoryPresenceStore::default());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let propagator = Arc::new(PresencePropagator::new(
            profiles.clone() as Arc<dyn ProfileStore>
        ));
        propagator.spawn(presence.changes(), shutdown_rx);

        Self {
            profiles,
            presence,
            shutdown,
        }
    }

    fn seed(&self, status: AppStatus, is_admin: bool) -> Uuid {
        let mut profile = ListenerProfile::new_approved(Uuid::new_v4(), "Lata");
        profile.app_status = status;
        profile.is_admin = is_admin;
        let id = profile.id;
        self.profiles.insert(profile);
        id
    }

    fn spawn_session(&self, id: Uuid) -> SessionHandle {
        PresenceSessionController::new(
            id,
            self.profiles.clone() as Arc<dyn ProfileStore>,
            self.presence.clone() as Arc<dyn PresenceStore>,
        )
        .spawn()
    }

    fn sweep(&self) -> PresenceSweepHandler {
        PresenceSweepHandler::new(
            self.profiles.clone() as Arc<dyn ProfileStore>,
            self.presence.clone() as Arc<dyn PresenceStore>,
            30,
        )
    }

    /// Stop the propagation trigger, simulating an outage of the
    /// trigger pipeline.
    fn stop_propagator(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn wait_profile_online(&self, id: Uuid, expect: bool) {
        for _ in 0..400 {
            let online = self
                .profiles
                .get(id)
                .await
                .unwrap()
                .map(|p| p.is_online)
                .unwrap_or(false);
            if online == expect {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("profile {id} never reached is_online={expect}");
    }

    async fn wait_presence_online(&self, id: Uuid, expect: bool) {
        for _ in 0..400 {
            let online = self
                .presence
                .snapshot(id)
                .map(|r| r.is_online)
                .unwrap_or(false);
            if online == expect {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("presence record {id} never reached is_online={expect}");
    }
}

/// The concrete scenario: an available listener connects and goes
/// online, then switches themselves off while still connected.
#[tokio::test]
async fn available_listener_goes_online_then_sets_offline_without_disconnect() {
    let h = Harness::new();
    let id = h.seed(AppStatus::Available, false);
    let session = h.spawn_session(id);

    h.presence.client_connected(id);
    h.wait_presence_online(id, true).await;
    h.wait_profile_online(id, true).await;

    let record = h.presence.snapshot(id).unwrap();
    assert_eq!(record.app_status, AppStatus::Available);

    h.profiles.set_app_status(id, AppStatus::Offline).await.unwrap();
    h.wait_presence_online(id, false).await;
    h.wait_profile_online(id, false).await;

    let record = h.presence.snapshot(id).unwrap();
    assert_eq!(record.app_status, AppStatus::Offline);

    session.shutdown().await;
}

/// Convergence: after an arbitrary event sequence settles and the sweep
/// runs once, the profile flag equals (available AND connected).
#[tokio::test]
async fn event_storm_converges_after_sweep() {
    let h = Harness::new();
    let id = h.seed(AppStatus::Available, false);
    let session = h.spawn_session(id);

    h.presence.client_connected(id);
    h.wait_presence_online(id, true).await;
    h.profiles.set_app_status(id, AppStatus::Busy).await.unwrap();
    h.wait_presence_online(id, false).await;
    h.presence.client_disconnected(id);
    h.presence.client_connected(id);
    h.profiles.set_app_status(id, AppStatus::Available).await.unwrap();
    h.wait_presence_online(id, true).await;

    h.sweep().reconcile().await.unwrap();

    // Last state: connected and available.
    h.wait_profile_online(id, true).await;
    assert!(h.presence.snapshot(id).unwrap().is_online);

    session.shutdown().await;
}

/// Last-will safety: a disconnect after any processed connect yields an
/// offline record with no further client action.
#[tokio::test]
async fn ungraceful_disconnect_commits_last_will() {
    let h = Harness::new();
    let id = h.seed(AppStatus::Available, false);
    let session = h.spawn_session(id);

    h.presence.client_connected(id);
    h.wait_presence_online(id, true).await;

    // Kill the client-side session first: nothing but the store's own
    // last-will mechanism can clean up now.
    session.shutdown().await;
    h.presence.client_disconnected(id);

    let record = h.presence.snapshot(id).unwrap();
    assert!(!record.is_online);
    assert_eq!(record.app_status, AppStatus::Available);
    h.wait_profile_online(id, false).await;
}

/// Admin exclusion: no online flag, no record subscription effects.
#[tokio::test]
async fn admin_sessions_never_go_online() {
    let h = Harness::new();
    let id = h.seed(AppStatus::Available, true);
    let session = h.spawn_session(id);

    // The controller force-writes a signed-off record, then detaches.
    for _ in 0..400 {
        if h.presence.snapshot(id).is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    h.presence.client_connected(id);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!h.presence.snapshot(id).unwrap().is_online);
    assert!(!h.presence.has_last_will(id));
    assert!(!h.profiles.get(id).await.unwrap().unwrap().is_online);
    assert_eq!(h.profiles.flag_writes(), 0);

    drop(session);
}

/// Sweep correction: a trigger outage leaves the profile flag stale;
/// the sweep repairs it from the realtime ground truth.
#[tokio::test]
async fn sweep_repairs_drift_after_trigger_outage() {
    let h = Harness::new();
    let id = h.seed(AppStatus::Available, false);
    let session = h.spawn_session(id);

    h.presence.client_connected(id);
    h.wait_profile_online(id, true).await;

    // Outage: the trigger stops consuming, then the connection drops.
    h.stop_propagator();
    tokio::time::sleep(Duration::from_millis(20)).await;
    h.presence.client_disconnected(id);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Drift: record offline, profile still flagged online.
    assert!(!h.presence.snapshot(id).unwrap().is_online);
    assert!(h.profiles.get(id).await.unwrap().unwrap().is_online);

    let report = h.sweep().reconcile().await.unwrap();
    assert_eq!(report["corrected"], 1);

    let profile = h.profiles.get(id).await.unwrap().unwrap();
    assert!(!profile.is_online);
    assert_eq!(profile.offline_reason.as_deref(), Some("presence_sweep"));

    session.shutdown().await;
}

/// Busy interlock round-trip: call start forces Busy (not online), call
/// end restores Available (online again).
#[tokio::test]
async fn busy_interlock_round_trip() {
    let h = Harness::new();
    let id = h.seed(AppStatus::Available, false);
    let session = h.spawn_session(id);

    h.presence.client_connected(id);
    h.wait_profile_online(id, true).await;

    let guard = CallBusyGuard::engage(h.profiles.clone() as Arc<dyn ProfileStore>, id)
        .await
        .unwrap();
    h.wait_presence_online(id, false).await;
    h.wait_profile_online(id, false).await;
    assert_eq!(
        h.presence.snapshot(id).unwrap().app_status,
        AppStatus::Busy
    );

    guard.release().await;
    h.wait_presence_online(id, true).await;
    h.wait_profile_online(id, true).await;

    session.shutdown().await;
}

/// Explicit sign-out forces both stores offline before the session is
/// discarded.
#[tokio::test]
async fn sign_out_teardown_forces_offline() {
    let h = Harness::new();
    let id = h.seed(AppStatus::Available, false);
    let session = h.spawn_session(id);

    h.presence.client_connected(id);
    h.wait_profile_online(id, true).await;

    let teardown = SessionTeardown::new(
        h.profiles.clone() as Arc<dyn ProfileStore>,
        h.presence.clone() as Arc<dyn PresenceStore>,
    );
    teardown.on_session_end(id).await;
    session.shutdown().await;

    assert!(!h.presence.snapshot(id).unwrap().is_online);
    let profile = h.profiles.get(id).await.unwrap().unwrap();
    assert!(!profile.is_online);
    assert_eq!(profile.app_status, AppStatus::Offline);
}
