//! # solace-database
//!
//! PostgreSQL database connection management and the concrete
//! [`ProfileStore`](solace_entity::listener::store::ProfileStore)
//! implementations: the sqlx-backed `ListenerRepository` and the
//! in-memory store used in tests and local development.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use memory::MemoryProfileStore;
