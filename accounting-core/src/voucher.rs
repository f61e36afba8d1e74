//! Voucher ledger operations
//!
//! State machine: `draft -> confirmed -> {reconciled}` with a `draft ->
//! cancelled` exit. Drafts never move money; confirmation posts the signed
//! amount to the treasury in the same batch that flips the status, so a
//! failed floor check leaves the voucher in `draft`.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{
        BusinessId, Counterpart, CreateVoucherRequest, DraftVoucherUpdate, Treasury, Voucher,
        VoucherDirection, VoucherStatus,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Create a draft voucher with the next sequential number
pub(crate) fn create(storage: &Storage, request: CreateVoucherRequest) -> Result<Voucher> {
    request.validate()?;

    let treasury = storage.get_treasury(request.treasury_id)?;
    if treasury.business_id != request.business_id
        || treasury.sub_system_id != request.sub_system_id
    {
        return Err(Error::Validation(format!(
            "treasury {} does not belong to sub-system {}",
            treasury.code, request.sub_system_id
        )));
    }
    if !treasury.is_active {
        return Err(Error::Validation(format!(
            "treasury {} is inactive",
            treasury.code
        )));
    }
    let sub_system = storage.get_sub_system(request.sub_system_id)?;
    if !sub_system.is_active {
        return Err(Error::Validation(format!(
            "sub-system {} is inactive",
            sub_system.code
        )));
    }

    check_counterpart(storage, &request.counterpart, &treasury)?;

    let sequence = storage.current_sequence(
        request.business_id,
        request.sub_system_id,
        request.direction,
    )? + 1;
    let number = format!("{}-{:06}", request.direction.number_prefix(), sequence);

    let voucher = Voucher {
        id: Uuid::now_v7(),
        business_id: request.business_id,
        sub_system_id: request.sub_system_id,
        treasury_id: request.treasury_id,
        number,
        direction: request.direction,
        amount: request.amount,
        currency: treasury.currency,
        counterpart: request.counterpart,
        description: request.description,
        voucher_date: request.voucher_date,
        status: VoucherStatus::Draft,
        reconciled: false,
        reconciled_with: None,
        reconciled_at: None,
        transfer_ref: None,
        created_at: Utc::now(),
    };

    storage.create_voucher_atomic(&voucher, sequence)?;
    Ok(voucher)
}

/// Edit a draft; confirmed and cancelled vouchers are immutable
pub(crate) fn update_draft(
    storage: &Storage,
    id: Uuid,
    update: DraftVoucherUpdate,
) -> Result<Voucher> {
    let mut voucher = storage.get_voucher(id)?;

    if voucher.status != VoucherStatus::Draft {
        return Err(Error::InvalidState(format!(
            "voucher {} is {}, only drafts can be edited",
            voucher.number, voucher.status
        )));
    }

    if let Some(amount) = update.amount {
        if amount <= Decimal::ZERO {
            return Err(Error::Validation("amount must be positive".into()));
        }
        voucher.amount = amount;
    }
    if let Some(counterpart) = update.counterpart {
        let treasury = storage.get_treasury(voucher.treasury_id)?;
        check_counterpart(storage, &counterpart, &treasury)?;
        voucher.counterpart = counterpart;
    }
    if let Some(description) = update.description {
        voucher.description = Some(description);
    }
    if let Some(voucher_date) = update.voucher_date {
        voucher.voucher_date = voucher_date;
    }

    storage.put_voucher(&voucher)?;
    Ok(voucher)
}

/// Confirm a draft, posting its signed amount to the treasury.
///
/// `InsufficientFunds` (payments against a non-overdraft treasury) leaves
/// the voucher untouched in `draft`.
pub(crate) fn confirm(storage: &Storage, id: Uuid) -> Result<Voucher> {
    let mut voucher = storage.get_voucher(id)?;
    let mut treasury = storage.get_treasury(voucher.treasury_id)?;

    if !treasury.is_active {
        return Err(Error::Validation(format!(
            "treasury {} is inactive",
            treasury.code
        )));
    }

    voucher.mark_confirmed()?;
    treasury.post(voucher.signed_amount(), Utc::now())?;

    storage.confirm_voucher_atomic(&voucher, &treasury)?;

    tracing::info!(
        voucher_id = %voucher.id,
        number = %voucher.number,
        direction = %voucher.direction,
        amount = %voucher.amount,
        treasury = %treasury.code,
        balance = %treasury.balance,
        "Voucher confirmed"
    );

    Ok(voucher)
}

/// Cancel a draft; confirmed vouchers require a reversing entry instead
pub(crate) fn cancel(storage: &Storage, id: Uuid) -> Result<Voucher> {
    let mut voucher = storage.get_voucher(id)?;
    voucher.mark_cancelled()?;
    storage.put_voucher(&voucher)?;

    tracing::info!(voucher_id = %id, number = %voucher.number, "Voucher cancelled");
    Ok(voucher)
}

/// Vouchers of a business, optionally narrowed by sub-system, direction
/// and status
pub(crate) fn list(
    storage: &Storage,
    business_id: BusinessId,
    sub_system_id: Option<Uuid>,
    direction: Option<VoucherDirection>,
    status: Option<VoucherStatus>,
) -> Result<Vec<Voucher>> {
    let vouchers = storage.list_vouchers(business_id, sub_system_id)?;
    Ok(vouchers
        .into_iter()
        .filter(|v| direction.map_or(true, |d| v.direction == d))
        .filter(|v| status.map_or(true, |s| v.status == s))
        .collect())
}

/// A counterpart naming an intermediary account must reference a real one
/// that clears for this treasury's sub-system in this currency
fn check_counterpart(
    storage: &Storage,
    counterpart: &Counterpart,
    treasury: &Treasury,
) -> Result<()> {
    let Some(account_id) = counterpart.intermediary_id() else {
        return Ok(());
    };

    let account = storage.get_intermediary(account_id)?;
    if account.business_id != treasury.business_id {
        return Err(Error::NotFound(format!("intermediary account {}", account_id)));
    }
    if !account.links(treasury.sub_system_id) {
        return Err(Error::Validation(format!(
            "intermediary account {} does not clear for sub-system {}",
            account.code, treasury.sub_system_id
        )));
    }
    if account.currency != treasury.currency {
        return Err(Error::Validation(format!(
            "intermediary account {} clears in {}, treasury {} holds {}",
            account.code, account.currency, treasury.code, treasury.currency
        )));
    }
    Ok(())
}
