//! Sub-system registry operations
//!
//! Sub-systems are the organizational units that own treasuries and
//! vouchers. Codes are unique within a business; a sub-system that still
//! owns treasuries cannot be deleted.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{BusinessId, SubSystem, SubSystemStats, SubSystemUpdate, VoucherDirection, VoucherStatus},
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Register a new sub-system
pub(crate) fn create(
    storage: &Storage,
    business_id: BusinessId,
    code: String,
    name: String,
    description: Option<String>,
) -> Result<SubSystem> {
    if code.trim().is_empty() {
        return Err(Error::Validation("sub-system code is required".into()));
    }
    if name.trim().is_empty() {
        return Err(Error::Validation("sub-system name is required".into()));
    }
    if storage.find_sub_system_by_code(business_id, &code)?.is_some() {
        return Err(Error::Validation(format!(
            "sub-system code {} is already used in business {}",
            code, business_id
        )));
    }

    let sub_system = SubSystem {
        id: Uuid::now_v7(),
        business_id,
        code,
        name,
        description,
        is_active: true,
        created_at: Utc::now(),
    };

    storage.create_sub_system_atomic(&sub_system)?;

    tracing::info!(
        sub_system_id = %sub_system.id,
        code = %sub_system.code,
        business_id = %business_id,
        "Sub-system created"
    );

    Ok(sub_system)
}

/// Apply a metadata-only update; code is immutable
pub(crate) fn update(storage: &Storage, id: Uuid, update: SubSystemUpdate) -> Result<SubSystem> {
    let mut sub_system = storage.get_sub_system(id)?;

    if let Some(name) = update.name {
        if name.trim().is_empty() {
            return Err(Error::Validation("sub-system name is required".into()));
        }
        sub_system.name = name;
    }
    if let Some(description) = update.description {
        sub_system.description = Some(description);
    }
    if let Some(is_active) = update.is_active {
        sub_system.is_active = is_active;
    }

    storage.put_sub_system(&sub_system)?;
    Ok(sub_system)
}

/// Delete a sub-system that owns no treasuries
pub(crate) fn delete(storage: &Storage, id: Uuid) -> Result<()> {
    let sub_system = storage.get_sub_system(id)?;

    let treasuries = storage.list_treasuries(sub_system.business_id, Some(id))?;
    if !treasuries.is_empty() {
        return Err(Error::Validation(format!(
            "sub-system {} still owns {} treasuries",
            sub_system.code,
            treasuries.len()
        )));
    }

    storage.delete_sub_system_atomic(&sub_system)?;

    tracing::info!(sub_system_id = %id, code = %sub_system.code, "Sub-system deleted");
    Ok(())
}

/// Confirmed-voucher aggregates for one sub-system
pub(crate) fn stats(storage: &Storage, id: Uuid) -> Result<SubSystemStats> {
    let sub_system = storage.get_sub_system(id)?;

    let treasuries = storage.list_treasuries(sub_system.business_id, Some(id))?;

    let mut stats = SubSystemStats {
        treasury_count: treasuries.len() as u64,
        receipt_count: 0,
        receipt_total: Decimal::ZERO,
        payment_count: 0,
        payment_total: Decimal::ZERO,
        net: Decimal::ZERO,
    };

    for voucher in storage.list_vouchers(sub_system.business_id, Some(id))? {
        if voucher.status != VoucherStatus::Confirmed {
            continue;
        }
        match voucher.direction {
            VoucherDirection::Receipt => {
                stats.receipt_count += 1;
                stats.receipt_total += voucher.amount;
            }
            VoucherDirection::Payment => {
                stats.payment_count += 1;
                stats.payment_total += voucher.amount;
            }
        }
    }
    stats.net = stats.receipt_total - stats.payment_total;

    Ok(stats)
}
