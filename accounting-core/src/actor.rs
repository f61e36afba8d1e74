//! Actor-based concurrency for the engine
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One logical writer task eliminates race conditions
//! - Multi-step operations (transfers, reconcile passes) run unsliced
//! - Async message passing with backpressure
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              AccountingEngine (facade)               │
//! │        Validates requests, then sends messages       │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │             EngineActor (Single Task)                │
//! │   subsystem / treasury / voucher / transfer /        │
//! │   reconcile operations, one message at a time        │
//! │                       │                              │
//! │                       ▼                              │
//! │            Storage (atomic WriteBatch)               │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Reads route through the same mailbox, which is what makes balance
//! reads strongly consistent with the last confirmed posting.

use crate::{
    config::Config,
    reconcile,
    storage::{Storage, StorageStats},
    subsystem, transfer, treasury,
    types::{
        BusinessId, CreateTreasuryRequest, CreateVoucherRequest, DraftVoucherUpdate,
        IntermediaryAccount, IntermediaryStats, Reconciliation, ReconciliationStatus, SubSystem,
        SubSystemStats, SubSystemUpdate, TransferLists, TransferReceipt, TransferRequest,
        Treasury, TreasuryUpdate, Voucher, VoucherDirection, VoucherStatus,
    },
    voucher, Error, ReconcileConfig, Result,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the engine actor
pub enum EngineMessage {
    // Sub-system registry
    /// Register a sub-system
    CreateSubSystem {
        business_id: BusinessId,
        code: String,
        name: String,
        description: Option<String>,
        response: oneshot::Sender<Result<SubSystem>>,
    },
    /// Update sub-system metadata
    UpdateSubSystem {
        id: Uuid,
        update: SubSystemUpdate,
        response: oneshot::Sender<Result<SubSystem>>,
    },
    /// Delete an empty sub-system
    DeleteSubSystem {
        id: Uuid,
        response: oneshot::Sender<Result<()>>,
    },
    /// List sub-systems of a business
    ListSubSystems {
        business_id: BusinessId,
        response: oneshot::Sender<Result<Vec<SubSystem>>>,
    },
    /// Aggregate confirmed-voucher statistics
    GetSubSystemStats {
        id: Uuid,
        response: oneshot::Sender<Result<SubSystemStats>>,
    },

    // Treasury store
    /// Create a treasury
    CreateTreasury {
        request: CreateTreasuryRequest,
        response: oneshot::Sender<Result<Treasury>>,
    },
    /// Update treasury metadata
    UpdateTreasury {
        id: Uuid,
        update: TreasuryUpdate,
        response: oneshot::Sender<Result<Treasury>>,
    },
    /// Delete an empty treasury
    DeleteTreasury {
        id: Uuid,
        response: oneshot::Sender<Result<()>>,
    },
    /// Get a treasury (balance included)
    GetTreasury {
        id: Uuid,
        response: oneshot::Sender<Result<Treasury>>,
    },
    /// List treasuries, optionally per sub-system
    ListTreasuries {
        business_id: BusinessId,
        sub_system_id: Option<Uuid>,
        response: oneshot::Sender<Result<Vec<Treasury>>>,
    },

    // Voucher ledger
    /// Create a draft voucher
    CreateVoucher {
        request: CreateVoucherRequest,
        response: oneshot::Sender<Result<Voucher>>,
    },
    /// Edit a draft voucher
    UpdateDraftVoucher {
        id: Uuid,
        update: DraftVoucherUpdate,
        response: oneshot::Sender<Result<Voucher>>,
    },
    /// Confirm a draft, posting to its treasury
    ConfirmVoucher {
        id: Uuid,
        response: oneshot::Sender<Result<Voucher>>,
    },
    /// Cancel a draft
    CancelVoucher {
        id: Uuid,
        response: oneshot::Sender<Result<Voucher>>,
    },
    /// Get a voucher by id
    GetVoucher {
        id: Uuid,
        response: oneshot::Sender<Result<Voucher>>,
    },
    /// List vouchers with optional filters
    ListVouchers {
        business_id: BusinessId,
        sub_system_id: Option<Uuid>,
        direction: Option<VoucherDirection>,
        status: Option<VoucherStatus>,
        response: oneshot::Sender<Result<Vec<Voucher>>>,
    },

    // Transfer orchestrator
    /// Execute an atomic cross-sub-system transfer
    CreateTransfer {
        request: TransferRequest,
        response: oneshot::Sender<Result<TransferReceipt>>,
    },
    /// Transfer legs of a sub-system
    ListTransfers {
        business_id: BusinessId,
        sub_system_id: Uuid,
        response: oneshot::Sender<Result<TransferLists>>,
    },
    /// Unreconciled transfer legs of a sub-system
    ListUnreconciledTransfers {
        business_id: BusinessId,
        sub_system_id: Uuid,
        response: oneshot::Sender<Result<TransferLists>>,
    },

    // Intermediary registry
    /// Get a clearing account by id
    GetIntermediary {
        id: Uuid,
        response: oneshot::Sender<Result<IntermediaryAccount>>,
    },
    /// List clearing accounts of a business
    ListIntermediaries {
        business_id: BusinessId,
        response: oneshot::Sender<Result<Vec<IntermediaryAccount>>>,
    },
    /// Registry-wide clearing aggregates
    GetIntermediaryStats {
        business_id: BusinessId,
        response: oneshot::Sender<Result<IntermediaryStats>>,
    },

    // Reconciliation engine
    /// Run one auto-match pass
    AutoReconcile {
        business_id: BusinessId,
        response: oneshot::Sender<Result<Vec<Reconciliation>>>,
    },
    /// Manually pair two vouchers
    ProposeReconciliation {
        payment_voucher_id: Uuid,
        receipt_voucher_id: Uuid,
        notes: Option<String>,
        response: oneshot::Sender<Result<Reconciliation>>,
    },
    /// Confirm a pending proposal
    ConfirmReconciliation {
        id: Uuid,
        confirmed_by: Option<String>,
        response: oneshot::Sender<Result<Reconciliation>>,
    },
    /// Reject a pending proposal
    RejectReconciliation {
        id: Uuid,
        notes: Option<String>,
        response: oneshot::Sender<Result<Reconciliation>>,
    },
    /// Drop a rejected proposal, unblocking its pair
    ClearRejection {
        id: Uuid,
        response: oneshot::Sender<Result<()>>,
    },
    /// List reconciliations with an optional status filter
    ListReconciliations {
        business_id: BusinessId,
        status: Option<ReconciliationStatus>,
        response: oneshot::Sender<Result<Vec<Reconciliation>>>,
    },

    // Verification
    /// Recompute a treasury balance from its confirmed vouchers
    RebuildTreasuryBalance {
        id: Uuid,
        response: oneshot::Sender<Result<Decimal>>,
    },
    /// Check a clearing balance against its transfer legs
    CheckIntermediaryConservation {
        id: Uuid,
        response: oneshot::Sender<Result<bool>>,
    },
    /// Approximate entity counts
    GetStats {
        response: oneshot::Sender<Result<StorageStats>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes engine messages
pub struct EngineActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Matching windows for the reconciliation engine
    reconcile_config: ReconcileConfig,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<EngineMessage>,
}

impl EngineActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        reconcile_config: ReconcileConfig,
        mailbox: mpsc::Receiver<EngineMessage>,
    ) -> Self {
        Self {
            storage,
            reconcile_config,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(msg) = self.mailbox.recv() => {
                    match msg {
                        EngineMessage::Shutdown => {
                            tracing::info!("Engine actor shutting down");
                            break;
                        }
                        _ => self.handle_message(msg),
                    }
                }

                // Mailbox closed
                else => {
                    break;
                }
            }
        }
    }

    /// Handle a single message; every arm answers on its response channel
    fn handle_message(&mut self, msg: EngineMessage) {
        match msg {
            EngineMessage::CreateSubSystem {
                business_id,
                code,
                name,
                description,
                response,
            } => {
                let result = subsystem::create(&self.storage, business_id, code, name, description);
                let _ = response.send(result);
            }
            EngineMessage::UpdateSubSystem { id, update, response } => {
                let _ = response.send(subsystem::update(&self.storage, id, update));
            }
            EngineMessage::DeleteSubSystem { id, response } => {
                let _ = response.send(subsystem::delete(&self.storage, id));
            }
            EngineMessage::ListSubSystems { business_id, response } => {
                let _ = response.send(self.storage.list_sub_systems(business_id));
            }
            EngineMessage::GetSubSystemStats { id, response } => {
                let _ = response.send(subsystem::stats(&self.storage, id));
            }

            EngineMessage::CreateTreasury { request, response } => {
                let _ = response.send(treasury::create(&self.storage, request));
            }
            EngineMessage::UpdateTreasury { id, update, response } => {
                let _ = response.send(treasury::update(&self.storage, id, update));
            }
            EngineMessage::DeleteTreasury { id, response } => {
                let _ = response.send(treasury::delete(&self.storage, id));
            }
            EngineMessage::GetTreasury { id, response } => {
                let _ = response.send(self.storage.get_treasury(id));
            }
            EngineMessage::ListTreasuries {
                business_id,
                sub_system_id,
                response,
            } => {
                let _ = response.send(self.storage.list_treasuries(business_id, sub_system_id));
            }

            EngineMessage::CreateVoucher { request, response } => {
                let _ = response.send(voucher::create(&self.storage, request));
            }
            EngineMessage::UpdateDraftVoucher { id, update, response } => {
                let _ = response.send(voucher::update_draft(&self.storage, id, update));
            }
            EngineMessage::ConfirmVoucher { id, response } => {
                let _ = response.send(voucher::confirm(&self.storage, id));
            }
            EngineMessage::CancelVoucher { id, response } => {
                let _ = response.send(voucher::cancel(&self.storage, id));
            }
            EngineMessage::GetVoucher { id, response } => {
                let _ = response.send(self.storage.get_voucher(id));
            }
            EngineMessage::ListVouchers {
                business_id,
                sub_system_id,
                direction,
                status,
                response,
            } => {
                let result =
                    voucher::list(&self.storage, business_id, sub_system_id, direction, status);
                let _ = response.send(result);
            }

            EngineMessage::CreateTransfer { request, response } => {
                let _ = response.send(transfer::create(&self.storage, request));
            }
            EngineMessage::ListTransfers {
                business_id,
                sub_system_id,
                response,
            } => {
                let _ = response.send(transfer::list(&self.storage, business_id, sub_system_id));
            }
            EngineMessage::ListUnreconciledTransfers {
                business_id,
                sub_system_id,
                response,
            } => {
                let result = transfer::list_unreconciled(&self.storage, business_id, sub_system_id);
                let _ = response.send(result);
            }

            EngineMessage::GetIntermediary { id, response } => {
                let _ = response.send(self.storage.get_intermediary(id));
            }
            EngineMessage::ListIntermediaries { business_id, response } => {
                let _ = response.send(self.storage.list_intermediaries(business_id));
            }
            EngineMessage::GetIntermediaryStats { business_id, response } => {
                let _ = response.send(crate::intermediary::stats(&self.storage, business_id));
            }

            EngineMessage::AutoReconcile { business_id, response } => {
                let result =
                    reconcile::auto_reconcile(&self.storage, &self.reconcile_config, business_id);
                let _ = response.send(result);
            }
            EngineMessage::ProposeReconciliation {
                payment_voucher_id,
                receipt_voucher_id,
                notes,
                response,
            } => {
                let result = reconcile::propose(
                    &self.storage,
                    &self.reconcile_config,
                    payment_voucher_id,
                    receipt_voucher_id,
                    notes,
                );
                let _ = response.send(result);
            }
            EngineMessage::ConfirmReconciliation {
                id,
                confirmed_by,
                response,
            } => {
                let _ = response.send(reconcile::confirm(&self.storage, id, confirmed_by));
            }
            EngineMessage::RejectReconciliation { id, notes, response } => {
                let _ = response.send(reconcile::reject(&self.storage, id, notes));
            }
            EngineMessage::ClearRejection { id, response } => {
                let _ = response.send(reconcile::clear_rejection(&self.storage, id));
            }
            EngineMessage::ListReconciliations {
                business_id,
                status,
                response,
            } => {
                let _ = response.send(reconcile::list(&self.storage, business_id, status));
            }

            EngineMessage::RebuildTreasuryBalance { id, response } => {
                let _ = response.send(treasury::rebuild_balance(&self.storage, id));
            }
            EngineMessage::CheckIntermediaryConservation { id, response } => {
                let _ = response.send(crate::intermediary::check_conservation(&self.storage, id));
            }
            EngineMessage::GetStats { response } => {
                let _ = response.send(self.storage.get_stats());
            }

            EngineMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineMessage>,
}

impl EngineHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<EngineMessage>) -> Self {
        Self { sender }
    }

    /// Send one message and await its response channel.
    ///
    /// Mailbox and channel failures surface as retryable concurrency
    /// errors; the actor only disappears during shutdown.
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> EngineMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| Error::ConcurrencyConflict("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::ConcurrencyConflict("Response channel closed".to_string()))?
    }

    /// Register a sub-system
    pub async fn create_sub_system(
        &self,
        business_id: BusinessId,
        code: String,
        name: String,
        description: Option<String>,
    ) -> Result<SubSystem> {
        self.request(|response| EngineMessage::CreateSubSystem {
            business_id,
            code,
            name,
            description,
            response,
        })
        .await
    }

    /// Update sub-system metadata
    pub async fn update_sub_system(&self, id: Uuid, update: SubSystemUpdate) -> Result<SubSystem> {
        self.request(|response| EngineMessage::UpdateSubSystem { id, update, response })
            .await
    }

    /// Delete an empty sub-system
    pub async fn delete_sub_system(&self, id: Uuid) -> Result<()> {
        self.request(|response| EngineMessage::DeleteSubSystem { id, response })
            .await
    }

    /// List sub-systems of a business
    pub async fn list_sub_systems(&self, business_id: BusinessId) -> Result<Vec<SubSystem>> {
        self.request(|response| EngineMessage::ListSubSystems { business_id, response })
            .await
    }

    /// Aggregate confirmed-voucher statistics for a sub-system
    pub async fn sub_system_stats(&self, id: Uuid) -> Result<SubSystemStats> {
        self.request(|response| EngineMessage::GetSubSystemStats { id, response })
            .await
    }

    /// Create a treasury
    pub async fn create_treasury(&self, request: CreateTreasuryRequest) -> Result<Treasury> {
        self.request(|response| EngineMessage::CreateTreasury { request, response })
            .await
    }

    /// Update treasury metadata
    pub async fn update_treasury(&self, id: Uuid, update: TreasuryUpdate) -> Result<Treasury> {
        self.request(|response| EngineMessage::UpdateTreasury { id, update, response })
            .await
    }

    /// Delete an empty treasury
    pub async fn delete_treasury(&self, id: Uuid) -> Result<()> {
        self.request(|response| EngineMessage::DeleteTreasury { id, response })
            .await
    }

    /// Get a treasury by id
    pub async fn get_treasury(&self, id: Uuid) -> Result<Treasury> {
        self.request(|response| EngineMessage::GetTreasury { id, response })
            .await
    }

    /// List treasuries, optionally narrowed to one sub-system
    pub async fn list_treasuries(
        &self,
        business_id: BusinessId,
        sub_system_id: Option<Uuid>,
    ) -> Result<Vec<Treasury>> {
        self.request(|response| EngineMessage::ListTreasuries {
            business_id,
            sub_system_id,
            response,
        })
        .await
    }

    /// Create a draft voucher
    pub async fn create_voucher(&self, request: CreateVoucherRequest) -> Result<Voucher> {
        self.request(|response| EngineMessage::CreateVoucher { request, response })
            .await
    }

    /// Edit a draft voucher
    pub async fn update_draft_voucher(
        &self,
        id: Uuid,
        update: DraftVoucherUpdate,
    ) -> Result<Voucher> {
        self.request(|response| EngineMessage::UpdateDraftVoucher { id, update, response })
            .await
    }

    /// Confirm a draft voucher
    pub async fn confirm_voucher(&self, id: Uuid) -> Result<Voucher> {
        self.request(|response| EngineMessage::ConfirmVoucher { id, response })
            .await
    }

    /// Cancel a draft voucher
    pub async fn cancel_voucher(&self, id: Uuid) -> Result<Voucher> {
        self.request(|response| EngineMessage::CancelVoucher { id, response })
            .await
    }

    /// Get a voucher by id
    pub async fn get_voucher(&self, id: Uuid) -> Result<Voucher> {
        self.request(|response| EngineMessage::GetVoucher { id, response })
            .await
    }

    /// List vouchers with optional filters
    pub async fn list_vouchers(
        &self,
        business_id: BusinessId,
        sub_system_id: Option<Uuid>,
        direction: Option<VoucherDirection>,
        status: Option<VoucherStatus>,
    ) -> Result<Vec<Voucher>> {
        self.request(|response| EngineMessage::ListVouchers {
            business_id,
            sub_system_id,
            direction,
            status,
            response,
        })
        .await
    }

    /// Execute an atomic cross-sub-system transfer
    pub async fn create_transfer(&self, request: TransferRequest) -> Result<TransferReceipt> {
        self.request(|response| EngineMessage::CreateTransfer { request, response })
            .await
    }

    /// Transfer legs of a sub-system, grouped by direction
    pub async fn list_transfers(
        &self,
        business_id: BusinessId,
        sub_system_id: Uuid,
    ) -> Result<TransferLists> {
        self.request(|response| EngineMessage::ListTransfers {
            business_id,
            sub_system_id,
            response,
        })
        .await
    }

    /// Unreconciled transfer legs of a sub-system
    pub async fn list_unreconciled_transfers(
        &self,
        business_id: BusinessId,
        sub_system_id: Uuid,
    ) -> Result<TransferLists> {
        self.request(|response| EngineMessage::ListUnreconciledTransfers {
            business_id,
            sub_system_id,
            response,
        })
        .await
    }

    /// Get a clearing account by id
    pub async fn get_intermediary(&self, id: Uuid) -> Result<IntermediaryAccount> {
        self.request(|response| EngineMessage::GetIntermediary { id, response })
            .await
    }

    /// List clearing accounts of a business
    pub async fn list_intermediaries(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<IntermediaryAccount>> {
        self.request(|response| EngineMessage::ListIntermediaries { business_id, response })
            .await
    }

    /// Registry-wide clearing aggregates
    pub async fn intermediary_stats(&self, business_id: BusinessId) -> Result<IntermediaryStats> {
        self.request(|response| EngineMessage::GetIntermediaryStats { business_id, response })
            .await
    }

    /// Run one auto-match pass over a business
    pub async fn auto_reconcile(&self, business_id: BusinessId) -> Result<Vec<Reconciliation>> {
        self.request(|response| EngineMessage::AutoReconcile { business_id, response })
            .await
    }

    /// Manually pair a payment with a receipt
    pub async fn propose_reconciliation(
        &self,
        payment_voucher_id: Uuid,
        receipt_voucher_id: Uuid,
        notes: Option<String>,
    ) -> Result<Reconciliation> {
        self.request(|response| EngineMessage::ProposeReconciliation {
            payment_voucher_id,
            receipt_voucher_id,
            notes,
            response,
        })
        .await
    }

    /// Confirm a pending proposal
    pub async fn confirm_reconciliation(
        &self,
        id: Uuid,
        confirmed_by: Option<String>,
    ) -> Result<Reconciliation> {
        self.request(|response| EngineMessage::ConfirmReconciliation {
            id,
            confirmed_by,
            response,
        })
        .await
    }

    /// Reject a pending proposal
    pub async fn reject_reconciliation(
        &self,
        id: Uuid,
        notes: Option<String>,
    ) -> Result<Reconciliation> {
        self.request(|response| EngineMessage::RejectReconciliation { id, notes, response })
            .await
    }

    /// Drop a rejected proposal, unblocking its pair
    pub async fn clear_rejection(&self, id: Uuid) -> Result<()> {
        self.request(|response| EngineMessage::ClearRejection { id, response })
            .await
    }

    /// List reconciliations with an optional status filter
    pub async fn list_reconciliations(
        &self,
        business_id: BusinessId,
        status: Option<ReconciliationStatus>,
    ) -> Result<Vec<Reconciliation>> {
        self.request(|response| EngineMessage::ListReconciliations {
            business_id,
            status,
            response,
        })
        .await
    }

    /// Recompute a treasury balance from its confirmed vouchers
    pub async fn rebuild_treasury_balance(&self, id: Uuid) -> Result<Decimal> {
        self.request(|response| EngineMessage::RebuildTreasuryBalance { id, response })
            .await
    }

    /// Check a clearing balance against its transfer legs
    pub async fn check_intermediary_conservation(&self, id: Uuid) -> Result<bool> {
        self.request(|response| EngineMessage::CheckIntermediaryConservation { id, response })
            .await
    }

    /// Approximate entity counts
    pub async fn stats(&self) -> Result<StorageStats> {
        self.request(|response| EngineMessage::GetStats { response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(EngineMessage::Shutdown)
            .await
            .map_err(|_| Error::ConcurrencyConflict("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the engine actor
pub fn spawn_engine_actor(storage: Arc<Storage>, config: &Config) -> EngineHandle {
    // Bounded channel for backpressure
    let (tx, rx) = mpsc::channel(config.actor.mailbox_size);
    let actor = EngineActor::new(storage, config.reconcile.clone(), rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    EngineHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Counterpart, TreasuryDetails, TreasuryKind};
    use crate::types::Currency;
    use chrono::Utc;

    fn test_setup() -> (EngineHandle, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let storage = Arc::new(Storage::open(&config).unwrap());
        (spawn_engine_actor(storage, &config), temp_dir)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (handle, _temp) = test_setup();
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_after_shutdown_is_concurrency_error() {
        let (handle, _temp) = test_setup();
        handle.shutdown().await.unwrap();

        // Give the actor a moment to drop its mailbox
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let err = handle
            .list_sub_systems(BusinessId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConcurrencyConflict(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_full_voucher_flow_through_actor() {
        let (handle, _temp) = test_setup();
        let business = BusinessId::new(1);

        let sub = handle
            .create_sub_system(business, "OPS".into(), "Operations".into(), None)
            .await
            .unwrap();
        let treasury = handle
            .create_treasury(CreateTreasuryRequest {
                business_id: business,
                sub_system_id: sub.id,
                code: "MAIN".into(),
                name: "Main account".into(),
                description: None,
                kind: TreasuryKind::Bank,
                currency: Currency::USD,
                opening_balance: rust_decimal::Decimal::new(100000, 2),
                overdraft_allowed: false,
                details: TreasuryDetails::default(),
            })
            .await
            .unwrap();

        let voucher = handle
            .create_voucher(CreateVoucherRequest {
                business_id: business,
                sub_system_id: sub.id,
                treasury_id: treasury.id,
                direction: VoucherDirection::Payment,
                amount: rust_decimal::Decimal::new(2500, 2),
                counterpart: Counterpart::Entity {
                    name: "Utility Co".into(),
                },
                description: None,
                voucher_date: Utc::now(),
            })
            .await
            .unwrap();
        handle.confirm_voucher(voucher.id).await.unwrap();

        let stored = handle.get_treasury(treasury.id).await.unwrap();
        assert_eq!(stored.balance, rust_decimal::Decimal::new(97500, 2));
        assert_eq!(
            handle.rebuild_treasury_balance(treasury.id).await.unwrap(),
            stored.balance
        );

        handle.shutdown().await.unwrap();
    }
}
