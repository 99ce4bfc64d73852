//! Activation pipeline core
//!
//! Owns the PENDING -> PROCESSING -> {SUCCESS, FAILED} state machine that
//! settles an offer purchase across the ledger, the fast-status cache and
//! the partner-of-record.

pub mod admission;
pub mod db;
pub mod orchestrator;
pub mod queue;
pub mod state;
pub mod status;
pub mod types;
pub mod worker;

#[cfg(test)]
mod integration_tests;

pub use admission::{AdmissionReceipt, AdmissionService};
pub use db::TransactionDb;
pub use orchestrator::ActivationOrchestrator;
pub use queue::ActivationQueue;
pub use state::ActivationState;
pub use status::{StatusService, StatusView};
pub use types::{ActivationRecord, TransactionId};
pub use worker::ActivationWorker;
