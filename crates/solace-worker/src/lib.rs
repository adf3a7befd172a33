//! # solace-worker
//!
//! Background worker for Solace: the cron scheduler and the periodic
//! presence drift reconciliation sweep.

pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use executor::{JobExecutionError, JobHandler};
pub use jobs::sweep::PresenceSweepHandler;
pub use scheduler::CronScheduler;
