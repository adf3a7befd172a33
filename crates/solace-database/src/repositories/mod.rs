//! Concrete repository implementations.

pub mod listener;

pub use listener::ListenerRepository;
