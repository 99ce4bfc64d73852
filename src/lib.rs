//! Offerflow - Asynchronous Offer Activation Engine
//!
//! Users spend account balance to activate subscription offers; a partner
//! system performs the activation asynchronously and the outcome is settled
//! with compensating refunds on failure.
//!
//! # Modules
//!
//! - [`config`] - YAML configuration with environment overrides
//! - [`db`] - PostgreSQL pool and schema bootstrap
//! - [`account`] - Users and monetary accounts
//! - [`offers`] - Offer catalog and user grants
//! - [`activation`] - The core pipeline: state machine, admission,
//!   orchestrator, queue/worker, status surface
//! - [`partner`] - Partner gateway (remote HTTP or local partner-of-record)
//! - [`cache`] - Fast-status projection for low-latency polling
//! - [`notify`] - Best-effort terminal-state notifications
//! - [`expiry`] - Expiring-grant reminder scan

pub mod account;
pub mod activation;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod expiry;
pub mod logging;
pub mod notify;
pub mod offers;
pub mod partner;

// Convenient re-exports at crate root
pub use activation::{
    ActivationOrchestrator, ActivationQueue, ActivationRecord, ActivationState, ActivationWorker,
    AdmissionReceipt, AdmissionService, StatusService, StatusView, TransactionDb, TransactionId,
};
pub use cache::StatusCache;
pub use config::{AppConfig, PartnerMode};
pub use db::Database;
pub use error::ActivationError;
pub use notify::{LogNotifier, Notifier};
pub use partner::{GatewayOutcome, LocalPartnerGateway, PartnerGateway, RemotePartnerGateway};
