//! Cross-sub-system transfer orchestration
//!
//! One transfer produces a confirmed payment voucher in the source
//! sub-system, a confirmed receipt voucher in the destination, both
//! treasury postings, and the signed intermediary posting. Everything
//! commits in one storage batch; every precondition is checked before the
//! first write, so a failed transfer leaves the store exactly as it was.

use crate::{
    error::{Error, Result},
    intermediary,
    storage::Storage,
    types::{
        BusinessId, Counterpart, TransferLists, TransferReceipt, TransferRequest, Voucher,
        VoucherDirection, VoucherStatus,
    },
};
use chrono::Utc;
use uuid::Uuid;

/// Execute a transfer between two sub-systems of one business
pub(crate) fn create(storage: &Storage, request: TransferRequest) -> Result<TransferReceipt> {
    request.validate()?;

    let mut from_treasury = storage.get_treasury(request.from_treasury_id)?;
    let mut to_treasury = storage.get_treasury(request.to_treasury_id)?;

    for (treasury, sub_system_id) in [
        (&from_treasury, request.from_sub_system_id),
        (&to_treasury, request.to_sub_system_id),
    ] {
        if treasury.business_id != request.business_id
            || treasury.sub_system_id != sub_system_id
        {
            return Err(Error::Validation(format!(
                "treasury {} does not belong to sub-system {}",
                treasury.code, sub_system_id
            )));
        }
        if !treasury.is_active {
            return Err(Error::Validation(format!(
                "treasury {} is inactive",
                treasury.code
            )));
        }
        let sub_system = storage.get_sub_system(sub_system_id)?;
        if !sub_system.is_active {
            return Err(Error::Validation(format!(
                "sub-system {} is inactive",
                sub_system.code
            )));
        }
    }

    if from_treasury.currency != to_treasury.currency {
        return Err(Error::Validation(format!(
            "currency mismatch: {} holds {}, {} holds {}",
            from_treasury.code, from_treasury.currency, to_treasury.code, to_treasury.currency
        )));
    }

    let (mut account, account_is_new) = intermediary::resolve_for_transfer(
        storage,
        request.business_id,
        request.from_sub_system_id,
        request.to_sub_system_id,
        from_treasury.currency,
    )?;

    let now = Utc::now();
    let transfer_ref = Uuid::now_v7();

    let payment_sequence = storage.current_sequence(
        request.business_id,
        request.from_sub_system_id,
        VoucherDirection::Payment,
    )? + 1;
    let receipt_sequence = storage.current_sequence(
        request.business_id,
        request.to_sub_system_id,
        VoucherDirection::Receipt,
    )? + 1;

    let payment = Voucher {
        id: Uuid::now_v7(),
        business_id: request.business_id,
        sub_system_id: request.from_sub_system_id,
        treasury_id: from_treasury.id,
        number: format!("PV-{:06}", payment_sequence),
        direction: VoucherDirection::Payment,
        amount: request.amount,
        currency: from_treasury.currency,
        counterpart: Counterpart::Intermediary { account_id: account.id },
        description: request.description.clone(),
        voucher_date: request.transfer_date,
        status: VoucherStatus::Confirmed,
        reconciled: false,
        reconciled_with: None,
        reconciled_at: None,
        transfer_ref: Some(transfer_ref),
        created_at: now,
    };
    let receipt = Voucher {
        id: Uuid::now_v7(),
        business_id: request.business_id,
        sub_system_id: request.to_sub_system_id,
        treasury_id: to_treasury.id,
        number: format!("RV-{:06}", receipt_sequence),
        direction: VoucherDirection::Receipt,
        amount: request.amount,
        currency: to_treasury.currency,
        counterpart: Counterpart::Intermediary { account_id: account.id },
        description: request.description,
        voucher_date: request.transfer_date,
        status: VoucherStatus::Confirmed,
        reconciled: false,
        reconciled_with: None,
        reconciled_at: None,
        transfer_ref: Some(transfer_ref),
        created_at: now,
    };

    // Floor check happens here; nothing has been written yet
    from_treasury.post(-request.amount, now)?;
    to_treasury.post(request.amount, now)?;

    account.balance += account.signed_delta(request.from_sub_system_id, request.amount);
    account.updated_at = now;

    storage.apply_transfer_atomic(
        &payment,
        &receipt,
        &from_treasury,
        &to_treasury,
        &account,
        account_is_new,
        payment_sequence,
        receipt_sequence,
    )?;

    Ok(TransferReceipt {
        payment_voucher_id: payment.id,
        payment_voucher_number: payment.number,
        receipt_voucher_id: receipt.id,
        receipt_voucher_number: receipt.number,
        intermediary_account_id: account.id,
    })
}

/// Confirmed transfer-leg vouchers of one sub-system, grouped by direction
pub(crate) fn list(
    storage: &Storage,
    business_id: BusinessId,
    sub_system_id: Uuid,
) -> Result<TransferLists> {
    let vouchers = storage.list_vouchers(business_id, Some(sub_system_id))?;
    Ok(split(vouchers.into_iter().filter(|v| {
        v.status == VoucherStatus::Confirmed && v.intermediary_id().is_some()
    })))
}

/// Same as [`list`], restricted to unreconciled legs
pub(crate) fn list_unreconciled(
    storage: &Storage,
    business_id: BusinessId,
    sub_system_id: Uuid,
) -> Result<TransferLists> {
    let vouchers = storage.list_unreconciled(business_id)?;
    Ok(split(
        vouchers.into_iter().filter(|v| v.sub_system_id == sub_system_id),
    ))
}

fn split(vouchers: impl Iterator<Item = Voucher>) -> TransferLists {
    let mut lists = TransferLists::default();
    for voucher in vouchers {
        match voucher.direction {
            VoucherDirection::Payment => lists.outgoing.push(voucher),
            VoucherDirection::Receipt => lists.incoming.push(voucher),
        }
    }
    lists
}
