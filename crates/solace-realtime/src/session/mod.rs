//! Session-scoped presence components.

pub mod controller;
pub mod interlock;
pub mod teardown;

pub use controller::{PresenceSessionController, SessionHandle, SessionPhase};
pub use interlock::CallBusyGuard;
pub use teardown::SessionTeardown;
