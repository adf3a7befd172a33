//! # solace-entity
//!
//! Domain entity models and store contracts for Solace. Every struct in
//! this crate represents a database table row or a domain value object.
//! All entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and
//! database entities additionally derive `sqlx::FromRow`.
//!
//! The [`listener::store::ProfileStore`] and
//! [`presence::store::PresenceStore`] traits are the interfaces through
//! which the presence engine talks to the durable profile store and the
//! realtime presence store. They live beside the entities they describe;
//! implementations live in `solace-database` and `solace-realtime`.

pub mod listener;
pub mod presence;
