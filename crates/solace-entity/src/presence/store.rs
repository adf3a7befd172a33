//! Realtime presence store contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use solace_core::result::AppResult;

use super::record::PresenceRecord;

/// A before/after snapshot of one presence record write.
///
/// This is the propagation trigger's invocation contract: the store
/// emits one change per effective write, with `after = None` modeling
/// record deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceChange {
    /// The listener whose record changed.
    pub listener_id: Uuid,
    /// Record value before the write.
    pub before: Option<PresenceRecord>,
    /// Record value after the write.
    pub after: Option<PresenceRecord>,
}

/// Interface to the realtime presence store.
///
/// The store is the single authority on live connectivity: it owns the
/// per-session connection signal and commits registered last-will
/// payloads the instant a connection drops, with no further client
/// action.
#[async_trait]
pub trait PresenceStore: Send + Sync + std::fmt::Debug + 'static {
    /// Point read of a presence record.
    async fn get(&self, listener_id: Uuid) -> AppResult<Option<PresenceRecord>>;

    /// Full overwrite of a presence record.
    async fn set(&self, listener_id: Uuid, record: PresenceRecord) -> AppResult<()>;

    /// Remove a presence record.
    async fn remove(&self, listener_id: Uuid) -> AppResult<()>;

    /// Register the payload the store must commit if the listener's
    /// connection drops ungracefully.
    ///
    /// A registration is consumed when it fires; every connect edge must
    /// re-register. Completion of this call is the acknowledgement the
    /// session controller sequences its current-state write behind.
    async fn register_last_will(&self, listener_id: Uuid, record: PresenceRecord) -> AppResult<()>;

    /// Live subscription to one listener's record.
    async fn watch(&self, listener_id: Uuid) -> AppResult<watch::Receiver<Option<PresenceRecord>>>;

    /// Server-authoritative connectivity signal for one listener.
    fn connection_signal(&self, listener_id: Uuid) -> watch::Receiver<bool>;

    /// Feed of every record change, consumed by the propagation trigger.
    fn changes(&self) -> broadcast::Receiver<PresenceChange>;
}
