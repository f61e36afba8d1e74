//! Treasury store operations
//!
//! Treasuries hold a running balance in a single currency. The balance is
//! mutated only by confirmed voucher postings; everything here is metadata
//! and lifecycle. Deletion is refused while money or open ledger entries
//! remain.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{CreateTreasuryRequest, Treasury, TreasuryUpdate, VoucherStatus},
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Create a treasury under an existing sub-system
pub(crate) fn create(storage: &Storage, request: CreateTreasuryRequest) -> Result<Treasury> {
    request.validate()?;

    let sub_system = storage.get_sub_system(request.sub_system_id)?;
    if sub_system.business_id != request.business_id {
        return Err(Error::NotFound(format!(
            "sub-system {}",
            request.sub_system_id
        )));
    }
    if !sub_system.is_active {
        return Err(Error::Validation(format!(
            "sub-system {} is inactive",
            sub_system.code
        )));
    }

    if storage
        .find_treasury_by_code(request.business_id, request.sub_system_id, &request.code)?
        .is_some()
    {
        return Err(Error::Validation(format!(
            "treasury code {} is already used in sub-system {}",
            request.code, sub_system.code
        )));
    }

    let now = Utc::now();
    let treasury = Treasury {
        id: Uuid::now_v7(),
        business_id: request.business_id,
        sub_system_id: request.sub_system_id,
        code: request.code,
        name: request.name,
        description: request.description,
        kind: request.kind,
        currency: request.currency,
        opening_balance: request.opening_balance,
        balance: request.opening_balance,
        overdraft_allowed: request.overdraft_allowed,
        is_active: true,
        details: request.details,
        created_at: now,
        updated_at: now,
    };

    storage.create_treasury_atomic(&treasury)?;

    tracing::info!(
        treasury_id = %treasury.id,
        code = %treasury.code,
        kind = %treasury.kind,
        currency = %treasury.currency,
        opening_balance = %treasury.opening_balance,
        "Treasury created"
    );

    Ok(treasury)
}

/// Apply a metadata-only update; kind, currency and balances are immutable
pub(crate) fn update(storage: &Storage, id: Uuid, update: TreasuryUpdate) -> Result<Treasury> {
    let mut treasury = storage.get_treasury(id)?;

    if let Some(name) = update.name {
        if name.trim().is_empty() {
            return Err(Error::Validation("treasury name is required".into()));
        }
        treasury.name = name;
    }
    if let Some(description) = update.description {
        treasury.description = Some(description);
    }
    if let Some(is_active) = update.is_active {
        treasury.is_active = is_active;
    }
    if let Some(overdraft_allowed) = update.overdraft_allowed {
        if !overdraft_allowed && treasury.balance < Decimal::ZERO {
            return Err(Error::Validation(format!(
                "treasury {} balance {} is negative, overdraft cannot be revoked",
                treasury.code, treasury.balance
            )));
        }
        treasury.overdraft_allowed = overdraft_allowed;
    }
    if let Some(details) = update.details {
        treasury.details = details;
    }
    treasury.updated_at = Utc::now();

    storage.put_treasury(&treasury)?;
    Ok(treasury)
}

/// Delete a treasury with a zero balance and no open ledger entries
pub(crate) fn delete(storage: &Storage, id: Uuid) -> Result<()> {
    let treasury = storage.get_treasury(id)?;

    if treasury.balance != Decimal::ZERO {
        return Err(Error::InvalidState(format!(
            "treasury {} has balance {}",
            treasury.code, treasury.balance
        )));
    }

    let open = storage
        .list_unreconciled(treasury.business_id)?
        .into_iter()
        .filter(|v| v.treasury_id == id)
        .count();
    if open > 0 {
        return Err(Error::InvalidState(format!(
            "treasury {} has {} unreconciled confirmed vouchers",
            treasury.code, open
        )));
    }

    storage.delete_treasury_atomic(&treasury)?;

    tracing::info!(treasury_id = %id, code = %treasury.code, "Treasury deleted");
    Ok(())
}

/// Recompute `opening_balance + signed sum of confirmed vouchers`.
///
/// Integrity check; the stored balance must always equal this.
pub(crate) fn rebuild_balance(storage: &Storage, id: Uuid) -> Result<Decimal> {
    let treasury = storage.get_treasury(id)?;

    let mut balance = treasury.opening_balance;
    for voucher in storage.list_vouchers(treasury.business_id, Some(treasury.sub_system_id))? {
        if voucher.treasury_id == id && voucher.status == VoucherStatus::Confirmed {
            balance += voucher.signed_amount();
        }
    }

    Ok(balance)
}
