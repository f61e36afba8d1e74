//! Accounting Core
//!
//! Treasury, voucher, and reconciliation engine for multi-sub-system
//! businesses: cross-sub-system transfers post paired vouchers through
//! intermediary clearing accounts, and an auto-reconciliation pass
//! matches the open legs back together.
//!
//! # Architecture
//!
//! - **Single Writer**: One logical writer task eliminates race conditions
//! - **Atomic Batches**: Multi-entity operations commit in one WriteBatch
//! - **Exact Arithmetic**: All money is fixed-point `Decimal`
//!
//! # Invariants
//!
//! - Treasury balance == opening balance + Σ(confirmed receipts) - Σ(confirmed payments)
//! - Transfers are all-or-nothing: no partially-posted transfer is ever observable
//! - Auto-reconcile is idempotent: an unchanged store yields no new proposals
//! - A rejected voucher pair stays excluded until the rejection is cleared

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod actor;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod storage;
pub mod types;

mod intermediary;
mod reconcile;
mod subsystem;
mod transfer;
mod treasury;
mod voucher;

// Re-exports
pub use config::{ActorConfig, Config, ReconcileConfig, RocksDbConfig};
pub use engine::AccountingEngine;
pub use error::{Error, Result};
pub use metrics::EngineMetrics;
pub use storage::Storage;
pub use types::{
    BusinessId, Confidence, Counterpart, Currency, IntermediaryAccount, Reconciliation,
    ReconciliationStatus, SubSystem, TransferReceipt, TransferRequest, Treasury, TreasuryKind,
    Voucher, VoucherDirection, VoucherStatus,
};
