//! Main engine orchestration layer
//!
//! This module ties together storage, the single-writer actor, and
//! metrics into a high-level API for treasury and voucher processing.
//!
//! # Example
//!
//! ```no_run
//! use accounting_core::{AccountingEngine, Config};
//!
//! #[tokio::main]
//! async fn main() -> accounting_core::Result<()> {
//!     let config = Config::default();
//!     let engine = AccountingEngine::open(config).await?;
//!
//!     // Create sub-systems, treasuries, vouchers, transfers...
//!     // let receipt = engine.transfer(request).await?;
//!
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_engine_actor, EngineHandle},
    metrics::EngineMetrics,
    storage::{Storage, StorageStats},
    types::{
        BusinessId, CreateTreasuryRequest, CreateVoucherRequest, DraftVoucherUpdate,
        IntermediaryAccount, IntermediaryStats, Reconciliation, ReconciliationStatus, SubSystem,
        SubSystemStats, SubSystemUpdate, TransferLists, TransferReceipt, TransferRequest,
        Treasury, TreasuryUpdate, Voucher, VoucherDirection, VoucherStatus,
    },
    Config, Error, Result,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Main engine interface
pub struct AccountingEngine {
    /// Actor handle for serialized operations
    handle: EngineHandle,

    /// Metrics collector
    metrics: EngineMetrics,

    /// Configuration
    config: Config,
}

impl AccountingEngine {
    /// Open the engine with configuration
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(Storage::open(&config)?);
        let handle = spawn_engine_actor(storage, &config);
        let metrics = EngineMetrics::new()
            .map_err(|e| Error::Config(format!("Failed to register metrics: {}", e)))?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            service = %config.service_name,
            "Accounting engine opened"
        );

        Ok(Self {
            handle,
            metrics,
            config,
        })
    }

    /// Metrics collector, for scrape endpoints
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Configuration the engine was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Record any failure, then hand the result back unchanged
    fn noted<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ref err) = result {
            self.metrics.record_error(err);
        }
        result
    }

    // Sub-system registry

    /// Register a sub-system
    pub async fn create_sub_system(
        &self,
        business_id: BusinessId,
        code: String,
        name: String,
        description: Option<String>,
    ) -> Result<SubSystem> {
        let result = self
            .handle
            .create_sub_system(business_id, code, name, description)
            .await;
        self.noted(result)
    }

    /// Update sub-system metadata
    pub async fn update_sub_system(&self, id: Uuid, update: SubSystemUpdate) -> Result<SubSystem> {
        let result = self.handle.update_sub_system(id, update).await;
        self.noted(result)
    }

    /// Delete a sub-system with no treasuries
    pub async fn delete_sub_system(&self, id: Uuid) -> Result<()> {
        let result = self.handle.delete_sub_system(id).await;
        self.noted(result)
    }

    /// List sub-systems of a business
    pub async fn list_sub_systems(&self, business_id: BusinessId) -> Result<Vec<SubSystem>> {
        self.handle.list_sub_systems(business_id).await
    }

    /// Aggregate confirmed-voucher statistics for a sub-system
    pub async fn sub_system_stats(&self, id: Uuid) -> Result<SubSystemStats> {
        self.handle.sub_system_stats(id).await
    }

    // Treasury store

    /// Create a treasury
    pub async fn create_treasury(&self, request: CreateTreasuryRequest) -> Result<Treasury> {
        request.validate()?;
        let result = self.handle.create_treasury(request).await;
        self.noted(result)
    }

    /// Update treasury metadata
    pub async fn update_treasury(&self, id: Uuid, update: TreasuryUpdate) -> Result<Treasury> {
        let result = self.handle.update_treasury(id, update).await;
        self.noted(result)
    }

    /// Delete a treasury with zero balance and no open vouchers
    pub async fn delete_treasury(&self, id: Uuid) -> Result<()> {
        let result = self.handle.delete_treasury(id).await;
        self.noted(result)
    }

    /// Get a treasury by id
    pub async fn get_treasury(&self, id: Uuid) -> Result<Treasury> {
        self.handle.get_treasury(id).await
    }

    /// Point-in-time balance, consistent with the last confirmed posting
    pub async fn get_balance(&self, treasury_id: Uuid) -> Result<Decimal> {
        Ok(self.handle.get_treasury(treasury_id).await?.balance)
    }

    /// List treasuries, optionally narrowed to one sub-system
    pub async fn list_treasuries(
        &self,
        business_id: BusinessId,
        sub_system_id: Option<Uuid>,
    ) -> Result<Vec<Treasury>> {
        self.handle.list_treasuries(business_id, sub_system_id).await
    }

    // Voucher ledger

    /// Create a draft voucher
    pub async fn create_voucher(&self, request: CreateVoucherRequest) -> Result<Voucher> {
        request.validate()?;
        let result = self.handle.create_voucher(request).await;
        self.noted(result)
    }

    /// Edit a draft voucher
    pub async fn update_draft_voucher(
        &self,
        id: Uuid,
        update: DraftVoucherUpdate,
    ) -> Result<Voucher> {
        let result = self.handle.update_draft_voucher(id, update).await;
        self.noted(result)
    }

    /// Confirm a draft voucher, posting its amount to the treasury
    pub async fn confirm_voucher(&self, id: Uuid) -> Result<Voucher> {
        let result = self.noted(self.handle.confirm_voucher(id).await);
        if result.is_ok() {
            self.metrics.record_voucher_confirmed();
        }
        result
    }

    /// Cancel a draft voucher
    pub async fn cancel_voucher(&self, id: Uuid) -> Result<Voucher> {
        let result = self.handle.cancel_voucher(id).await;
        self.noted(result)
    }

    /// Get a voucher by id
    pub async fn get_voucher(&self, id: Uuid) -> Result<Voucher> {
        self.handle.get_voucher(id).await
    }

    /// List vouchers with optional filters
    pub async fn list_vouchers(
        &self,
        business_id: BusinessId,
        sub_system_id: Option<Uuid>,
        direction: Option<VoucherDirection>,
        status: Option<VoucherStatus>,
    ) -> Result<Vec<Voucher>> {
        self.handle
            .list_vouchers(business_id, sub_system_id, direction, status)
            .await
    }

    // Transfer orchestrator

    /// Move funds between two sub-systems in one atomic unit.
    ///
    /// Creates a confirmed payment voucher in the source, a confirmed
    /// receipt voucher in the destination, posts both treasuries and the
    /// shared intermediary account. On any failure mid-sequence the store
    /// stays at the pre-transfer state.
    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt> {
        request.validate()?;

        let start = Instant::now();
        let result = self.noted(self.handle.create_transfer(request).await);
        if result.is_ok() {
            self.metrics.record_transfer(start.elapsed().as_secs_f64());
        }
        result
    }

    /// Transfer legs of a sub-system, grouped by direction
    pub async fn list_transfers(
        &self,
        business_id: BusinessId,
        sub_system_id: Uuid,
    ) -> Result<TransferLists> {
        self.handle.list_transfers(business_id, sub_system_id).await
    }

    /// Unreconciled transfer legs of a sub-system
    pub async fn list_unreconciled_transfers(
        &self,
        business_id: BusinessId,
        sub_system_id: Uuid,
    ) -> Result<TransferLists> {
        self.handle
            .list_unreconciled_transfers(business_id, sub_system_id)
            .await
    }

    // Intermediary registry

    /// Get a clearing account by id
    pub async fn get_intermediary(&self, id: Uuid) -> Result<IntermediaryAccount> {
        self.handle.get_intermediary(id).await
    }

    /// List clearing accounts of a business
    pub async fn list_intermediaries(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<IntermediaryAccount>> {
        self.handle.list_intermediaries(business_id).await
    }

    /// Registry-wide clearing aggregates
    pub async fn intermediary_stats(&self, business_id: BusinessId) -> Result<IntermediaryStats> {
        self.handle.intermediary_stats(business_id).await
    }

    // Reconciliation engine

    /// Run one auto-match pass over a business
    pub async fn auto_reconcile(&self, business_id: BusinessId) -> Result<Vec<Reconciliation>> {
        let start = Instant::now();
        let result = self.noted(self.handle.auto_reconcile(business_id).await);
        if let Ok(ref proposals) = result {
            self.metrics
                .record_reconcile_pass(start.elapsed().as_secs_f64(), proposals.len());
        }
        result
    }

    /// Manually pair a payment with a receipt
    pub async fn propose_reconciliation(
        &self,
        payment_voucher_id: Uuid,
        receipt_voucher_id: Uuid,
        notes: Option<String>,
    ) -> Result<Reconciliation> {
        let result = self.noted(
            self.handle
                .propose_reconciliation(payment_voucher_id, receipt_voucher_id, notes)
                .await,
        );
        if result.is_ok() {
            self.metrics.record_proposal();
        }
        result
    }

    /// Confirm a pending proposal, marking both vouchers reconciled
    pub async fn confirm_reconciliation(
        &self,
        id: Uuid,
        confirmed_by: Option<String>,
    ) -> Result<Reconciliation> {
        let result = self.noted(self.handle.confirm_reconciliation(id, confirmed_by).await);
        if result.is_ok() {
            self.metrics.record_reconciliation_confirmed();
        }
        result
    }

    /// Reject a pending proposal; its pair stays excluded from auto-match
    pub async fn reject_reconciliation(
        &self,
        id: Uuid,
        notes: Option<String>,
    ) -> Result<Reconciliation> {
        let result = self.noted(self.handle.reject_reconciliation(id, notes).await);
        if result.is_ok() {
            self.metrics.record_reconciliation_rejected();
        }
        result
    }

    /// Drop a rejected proposal, making its pair matchable again
    pub async fn clear_rejection(&self, id: Uuid) -> Result<()> {
        let result = self.handle.clear_rejection(id).await;
        self.noted(result)
    }

    /// List reconciliations with an optional status filter
    pub async fn list_reconciliations(
        &self,
        business_id: BusinessId,
        status: Option<ReconciliationStatus>,
    ) -> Result<Vec<Reconciliation>> {
        self.handle.list_reconciliations(business_id, status).await
    }

    // Verification

    /// Recompute a treasury balance from its confirmed vouchers.
    ///
    /// The result must always equal the stored balance; a mismatch means
    /// the balance invariant was broken.
    pub async fn rebuild_treasury_balance(&self, id: Uuid) -> Result<Decimal> {
        self.handle.rebuild_treasury_balance(id).await
    }

    /// Check a clearing balance against the signed sum of its transfer legs
    pub async fn check_intermediary_conservation(&self, id: Uuid) -> Result<bool> {
        self.handle.check_intermediary_conservation(id).await
    }

    /// Approximate entity counts
    pub async fn stats(&self) -> Result<StorageStats> {
        self.handle.stats().await
    }

    /// Shutdown the engine
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
