//! Intermediary account registry
//!
//! One clearing account per (business, unordered sub-system pair,
//! currency), created lazily by the first transfer between the pair. The
//! balance is the signed net obligation: positive means the low-id side
//! has paid the high-id side more than it received back.

use crate::{
    error::Result,
    storage::Storage,
    types::{BusinessId, Currency, IntermediaryAccount, IntermediaryStats, VoucherDirection, VoucherStatus},
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Fetch the clearing account for a sub-system pair, or build a fresh one.
///
/// A fresh account is returned unpersisted with `true`; the transfer batch
/// that needed it writes it, so a failed transfer never leaves an empty
/// account behind.
pub(crate) fn resolve_for_transfer(
    storage: &Storage,
    business_id: BusinessId,
    from_sub_system_id: Uuid,
    to_sub_system_id: Uuid,
    currency: Currency,
) -> Result<(IntermediaryAccount, bool)> {
    let (low, high) = IntermediaryAccount::pair_key(from_sub_system_id, to_sub_system_id);

    if let Some(id) = storage.find_intermediary(business_id, low, high, currency)? {
        return Ok((storage.get_intermediary(id)?, false));
    }

    // Short hex prefixes keep the code readable; the pair index is what
    // guarantees uniqueness
    let low_hex = low.simple().to_string();
    let high_hex = high.simple().to_string();

    let now = Utc::now();
    let account = IntermediaryAccount {
        id: Uuid::now_v7(),
        business_id,
        code: format!("INT-{}-{}-{}", &low_hex[..8], &high_hex[..8], currency),
        low_sub_system_id: low,
        high_sub_system_id: high,
        balance: Decimal::ZERO,
        currency,
        created_at: now,
        updated_at: now,
    };

    tracing::debug!(
        code = %account.code,
        low = %low,
        high = %high,
        "New intermediary account for pair"
    );

    Ok((account, true))
}

/// Registry-wide aggregates for one business
pub(crate) fn stats(storage: &Storage, business_id: BusinessId) -> Result<IntermediaryStats> {
    let accounts = storage.list_intermediaries(business_id)?;

    let mut stats = IntermediaryStats {
        total_accounts: accounts.len() as u64,
        non_zero_accounts: 0,
        open_exposure: Decimal::ZERO,
    };
    for account in &accounts {
        if account.balance != Decimal::ZERO {
            stats.non_zero_accounts += 1;
        }
        stats.open_exposure += account.balance.abs();
    }

    Ok(stats)
}

/// Check that the stored balance equals the signed sum of confirmed
/// transfer postings between the pair.
///
/// Each transfer is counted once through its payment leg; the legs carry
/// equal amounts, so a clearing ledger that passes this check never leaks
/// money.
pub(crate) fn check_conservation(storage: &Storage, id: Uuid) -> Result<bool> {
    let account = storage.get_intermediary(id)?;

    let mut expected = Decimal::ZERO;
    for voucher in storage.list_vouchers(account.business_id, None)? {
        if voucher.status != VoucherStatus::Confirmed
            || voucher.direction != VoucherDirection::Payment
            || voucher.transfer_ref.is_none()
            || voucher.intermediary_id() != Some(id)
        {
            continue;
        }
        expected += account.signed_delta(voucher.sub_system_id, voucher.amount);
    }

    Ok(expected == account.balance)
}
