//! In-process realtime presence store.
//!
//! The store is the connection authority: the transport layer reports
//! connect/disconnect edges here, and a registered last-will payload is
//! committed in the same call that flips the connection signal off, so
//! an ungraceful drop can never leave a record online with no pending
//! cleanup.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use solace_core::result::AppResult;
use solace_entity::presence::record::PresenceRecord;
use solace_entity::presence::store::{PresenceChange, PresenceStore};

/// Default buffer size of the change feed.
const DEFAULT_CHANGE_BUFFER: usize = 256;

/// Dashmap-backed [`PresenceStore`] with per-listener connection signals
/// and a consumable last-will registry.
#[derive(Debug)]
pub struct MemoryPresenceStore {
    /// Listener ID → current presence record.
    records: DashMap<Uuid, PresenceRecord>,
    /// Listener ID → payload to commit on ungraceful disconnect.
    wills: DashMap<Uuid, PresenceRecord>,
    /// Listener ID → server-authoritative connectivity signal.
    signals: DashMap<Uuid, watch::Sender<bool>>,
    /// Listener ID → live record subscription channel.
    watchers: DashMap<Uuid, watch::Sender<Option<PresenceRecord>>>,
    /// Change feed consumed by the propagation trigger.
    changes: broadcast::Sender<PresenceChange>,
}

impl MemoryPresenceStore {
    /// Create a store with the given change feed buffer size.
    pub fn new(change_buffer: usize) -> Self {
        let (changes, _) = broadcast::channel(change_buffer);
        Self {
            records: DashMap::new(),
            wills: DashMap::new(),
            signals: DashMap::new(),
            watchers: DashMap::new(),
            changes,
        }
    }

    /// Report a live connection for a listener's session.
    ///
    /// Subscribers only see an edge when connectivity actually changed.
    pub fn client_connected(&self, listener_id: Uuid) {
        let notified = self.signal(listener_id).send_if_modified(|connected| {
            if *connected {
                false
            } else {
                *connected = true;
                true
            }
        });
        if notified {
            tracing::debug!(listener_id = %listener_id, "Client connected");
        }
    }

    /// Report a dropped connection for a listener's session.
    ///
    /// Flips the connection signal and commits any registered last-will
    /// payload in the same call; the registration is consumed.
    pub fn client_disconnected(&self, listener_id: Uuid) {
        self.signal(listener_id).send_if_modified(|connected| {
            if *connected {
                *connected = false;
                true
            } else {
                false
            }
        });

        if let Some((_, will)) = self.wills.remove(&listener_id) {
            tracing::debug!(listener_id = %listener_id, "Committing last-will payload");
            self.write_record(listener_id, Some(will));
        }
    }

    /// Check whether a last-will payload is currently registered.
    pub fn has_last_will(&self, listener_id: Uuid) -> bool {
        self.wills.contains_key(&listener_id)
    }

    /// Synchronous point read for in-process callers.
    pub fn snapshot(&self, listener_id: Uuid) -> Option<PresenceRecord> {
        self.records.get(&listener_id).map(|r| r.value().clone())
    }

    /// Number of records currently flagged online.
    pub fn online_count(&self) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.value().is_online)
            .count()
    }

    fn signal(&self, listener_id: Uuid) -> watch::Sender<bool> {
        self.signals
            .entry(listener_id)
            .or_insert_with(|| watch::channel(false).0)
            .clone()
    }

    fn write_record(&self, listener_id: Uuid, after: Option<PresenceRecord>) {
        let before = match &after {
            Some(record) => self.records.insert(listener_id, record.clone()),
            None => self.records.remove(&listener_id).map(|(_, record)| record),
        };

        if let Some(sender) = self.watchers.get(&listener_id) {
            let _ = sender.send(after.clone());
        }

        let _ = self.changes.send(PresenceChange {
            listener_id,
            before,
            after,
        });
    }
}

impl Default for MemoryPresenceStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_BUFFER)
    }
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn get(&self, listener_id: Uuid) -> AppResult<Option<PresenceRecord>> {
        Ok(self.records.get(&listener_id).map(|r| r.value().clone()))
    }

    async fn set(&self, listener_id: Uuid, record: PresenceRecord) -> AppResult<()> {
        self.write_record(listener_id, Some(record));
        Ok(())
    }

    async fn remove(&self, listener_id: Uuid) -> AppResult<()> {
        self.write_record(listener_id, None);
        Ok(())
    }

    async fn register_last_will(
        &self,
        listener_id: Uuid,
        record: PresenceRecord,
    ) -> AppResult<()> {
        self.wills.insert(listener_id, record);
        Ok(())
    }

    async fn watch(
        &self,
        listener_id: Uuid,
    ) -> AppResult<watch::Receiver<Option<PresenceRecord>>> {
        let current = self.records.get(&listener_id).map(|r| r.value().clone());
        let entry = self
            .watchers
            .entry(listener_id)
            .or_insert_with(|| watch::channel(None).0);
        let _ = entry.send(current);
        Ok(entry.subscribe())
    }

    fn connection_signal(&self, listener_id: Uuid) -> watch::Receiver<bool> {
        self.signal(listener_id).subscribe()
    }

    fn changes(&self) -> broadcast::Receiver<PresenceChange> {
        self.changes.subscribe()
    }
}
