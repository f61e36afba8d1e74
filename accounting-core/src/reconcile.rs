//! Voucher reconciliation engine
//!
//! Pairs confirmed, unreconciled payment vouchers with receipt vouchers
//! across the two sides of an intermediary account. Candidates must agree
//! exactly on currency, amount, and clearing account, and sit on opposite
//! sub-systems. Confidence grades the date gap: correlated transfer legs
//! inside the high window rank `high`, an exact amount inside the medium
//! window ranks `medium`, anything further apart ranks `low`.
//!
//! A pair that ever received a reconciliation row, rejected included, is
//! never proposed again until the rejection is cleared.

use crate::{
    config::ReconcileConfig,
    error::{Error, Result},
    storage::Storage,
    types::{
        BusinessId, Confidence, Reconciliation, ReconciliationStatus, Voucher, VoucherDirection,
        VoucherStatus,
    },
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

/// One auto-match pass over a business.
///
/// Payments are processed in id order; each takes the eligible receipt
/// with the closest voucher date, ties broken by the lower receipt id.
/// A receipt feeds at most one proposal per pass, and a pass over
/// unchanged state proposes nothing.
pub(crate) fn auto_reconcile(
    storage: &Storage,
    config: &ReconcileConfig,
    business_id: BusinessId,
) -> Result<Vec<Reconciliation>> {
    let open = storage.list_unreconciled(business_id)?;

    // Vouchers already sitting in a pending or confirmed proposal are out
    let mut busy: HashSet<Uuid> = HashSet::new();
    for row in storage.list_reconciliations(business_id)? {
        if row.status != ReconciliationStatus::Rejected {
            busy.insert(row.payment_voucher_id);
            busy.insert(row.receipt_voucher_id);
        }
    }

    let (payments, receipts): (Vec<_>, Vec<_>) = open
        .into_iter()
        .partition(|v| v.direction == VoucherDirection::Payment);

    let mut used: HashSet<Uuid> = HashSet::new();
    let mut proposals = Vec::new();

    for payment in &payments {
        if busy.contains(&payment.id) {
            continue;
        }

        let mut best: Option<(&Voucher, i64)> = None;
        for receipt in &receipts {
            if used.contains(&receipt.id) || busy.contains(&receipt.id) {
                continue;
            }
            if !is_candidate(payment, receipt) {
                continue;
            }
            // Any prior row for the pair, rejected included, blocks it
            if storage
                .find_reconciliation_for_pair(payment.id, receipt.id)?
                .is_some()
            {
                continue;
            }

            let gap = days_apart(payment.voucher_date, receipt.voucher_date);
            // Receipts come in id order, so on a tie the first seen
            // (lowest id) stays
            if best.map_or(true, |(_, best_gap)| gap < best_gap) {
                best = Some((receipt, gap));
            }
        }

        let Some((receipt, gap)) = best else {
            continue;
        };

        let confidence = confidence_for(payment, receipt, gap, config);
        let proposal = Reconciliation {
            id: Uuid::now_v7(),
            business_id,
            payment_voucher_id: payment.id,
            receipt_voucher_id: receipt.id,
            amount: payment.amount,
            currency: payment.currency,
            confidence,
            status: ReconciliationStatus::Pending,
            notes: None,
            created_at: Utc::now(),
            confirmed_by: None,
            confirmed_at: None,
        };
        storage.insert_reconciliation_atomic(&proposal)?;
        used.insert(receipt.id);

        tracing::debug!(
            payment = %payment.number,
            receipt = %receipt.number,
            confidence = %confidence,
            gap_days = gap,
            "Match proposed"
        );

        proposals.push(proposal);
    }

    tracing::info!(
        business_id = %business_id,
        payments = payments.len(),
        receipts = receipts.len(),
        proposed = proposals.len(),
        "Auto-reconcile pass complete"
    );

    Ok(proposals)
}

/// Manually pair a payment with a receipt.
///
/// The pair has to satisfy everything the auto-matcher requires; only the
/// date gap is the reviewer's to accept, and it still grades confidence.
pub(crate) fn propose(
    storage: &Storage,
    config: &ReconcileConfig,
    payment_id: Uuid,
    receipt_id: Uuid,
    notes: Option<String>,
) -> Result<Reconciliation> {
    let payment = storage.get_voucher(payment_id)?;
    let receipt = storage.get_voucher(receipt_id)?;

    if payment.direction != VoucherDirection::Payment {
        return Err(Error::Validation(format!(
            "voucher {} is not a payment",
            payment.number
        )));
    }
    if receipt.direction != VoucherDirection::Receipt {
        return Err(Error::Validation(format!(
            "voucher {} is not a receipt",
            receipt.number
        )));
    }
    if payment.business_id != receipt.business_id {
        return Err(Error::Validation(
            "vouchers belong to different businesses".into(),
        ));
    }
    for voucher in [&payment, &receipt] {
        if voucher.status != VoucherStatus::Confirmed {
            return Err(Error::InvalidState(format!(
                "voucher {} is {}, only confirmed vouchers reconcile",
                voucher.number, voucher.status
            )));
        }
        if voucher.reconciled {
            return Err(Error::InvalidState(format!(
                "voucher {} is already reconciled",
                voucher.number
            )));
        }
    }
    if payment.currency != receipt.currency {
        return Err(Error::Validation(format!(
            "currency mismatch: {} vs {}",
            payment.currency, receipt.currency
        )));
    }
    if payment.amount != receipt.amount {
        return Err(Error::Validation(format!(
            "amount mismatch: {} vs {}",
            payment.amount, receipt.amount
        )));
    }
    if payment.intermediary_id().is_none()
        || payment.intermediary_id() != receipt.intermediary_id()
    {
        return Err(Error::Validation(
            "vouchers do not reference the same intermediary account".into(),
        ));
    }
    if payment.sub_system_id == receipt.sub_system_id {
        return Err(Error::Validation(
            "vouchers sit on the same side of the intermediary account".into(),
        ));
    }

    if storage
        .find_reconciliation_for_pair(payment_id, receipt_id)?
        .is_some()
    {
        return Err(Error::InvalidState(format!(
            "vouchers {} and {} already have a reconciliation record",
            payment.number, receipt.number
        )));
    }
    for row in storage.list_reconciliations(payment.business_id)? {
        if row.status == ReconciliationStatus::Rejected {
            continue;
        }
        for (voucher_id, number) in [
            (payment_id, &payment.number),
            (receipt_id, &receipt.number),
        ] {
            if row.payment_voucher_id == voucher_id || row.receipt_voucher_id == voucher_id {
                return Err(Error::InvalidState(format!(
                    "voucher {} already has an open reconciliation",
                    number
                )));
            }
        }
    }

    let gap = days_apart(payment.voucher_date, receipt.voucher_date);
    let proposal = Reconciliation {
        id: Uuid::now_v7(),
        business_id: payment.business_id,
        payment_voucher_id: payment_id,
        receipt_voucher_id: receipt_id,
        amount: payment.amount,
        currency: payment.currency,
        confidence: confidence_for(&payment, &receipt, gap, config),
        status: ReconciliationStatus::Pending,
        notes,
        created_at: Utc::now(),
        confirmed_by: None,
        confirmed_at: None,
    };
    storage.insert_reconciliation_atomic(&proposal)?;

    tracing::info!(
        payment = %payment.number,
        receipt = %receipt.number,
        confidence = %proposal.confidence,
        "Manual reconciliation proposed"
    );

    Ok(proposal)
}

/// Confirm a pending proposal, reconciling both vouchers.
///
/// Of two racing confirms on one id the loser gets a retryable
/// `ConcurrencyConflict`; a voucher taken by a different proposal in the
/// interim surfaces as `InvalidState`.
pub(crate) fn confirm(
    storage: &Storage,
    id: Uuid,
    confirmed_by: Option<String>,
) -> Result<Reconciliation> {
    let mut reconciliation = storage.get_reconciliation(id)?;
    let now = Utc::now();
    reconciliation.mark_confirmed(confirmed_by, now)?;

    let mut payment = storage.get_voucher(reconciliation.payment_voucher_id)?;
    let mut receipt = storage.get_voucher(reconciliation.receipt_voucher_id)?;

    for voucher in [&payment, &receipt] {
        if voucher.reconciled {
            return Err(Error::InvalidState(format!(
                "voucher {} was reconciled by another proposal",
                voucher.number
            )));
        }
    }

    payment.mark_reconciled(receipt.id, now)?;
    receipt.mark_reconciled(payment.id, now)?;

    storage.confirm_reconciliation_atomic(&reconciliation, &payment, &receipt)?;
    Ok(reconciliation)
}

/// Reject a pending proposal; the pair stays excluded from auto-match
pub(crate) fn reject(
    storage: &Storage,
    id: Uuid,
    notes: Option<String>,
) -> Result<Reconciliation> {
    let mut reconciliation = storage.get_reconciliation(id)?;
    reconciliation.mark_rejected(notes)?;
    storage.put_reconciliation(&reconciliation)?;

    tracing::warn!(
        reconciliation_id = %id,
        payment_voucher_id = %reconciliation.payment_voucher_id,
        receipt_voucher_id = %reconciliation.receipt_voucher_id,
        "Reconciliation rejected"
    );

    Ok(reconciliation)
}

/// Drop a rejected proposal, making its pair matchable again
pub(crate) fn clear_rejection(storage: &Storage, id: Uuid) -> Result<()> {
    let reconciliation = storage.get_reconciliation(id)?;
    if reconciliation.status != ReconciliationStatus::Rejected {
        return Err(Error::InvalidState(format!(
            "reconciliation {} is {}, only rejected ones can be cleared",
            id, reconciliation.status
        )));
    }
    storage.clear_rejection_atomic(&reconciliation)?;

    tracing::info!(reconciliation_id = %id, "Rejection cleared, pair matchable again");
    Ok(())
}

/// Reconciliations of a business, optionally narrowed by status
pub(crate) fn list(
    storage: &Storage,
    business_id: BusinessId,
    status: Option<ReconciliationStatus>,
) -> Result<Vec<Reconciliation>> {
    let rows = storage.list_reconciliations(business_id)?;
    Ok(rows
        .into_iter()
        .filter(|r| status.map_or(true, |s| r.status == s))
        .collect())
}

/// Structural match: exact amount and currency, one clearing account,
/// opposite sub-systems
fn is_candidate(payment: &Voucher, receipt: &Voucher) -> bool {
    payment.currency == receipt.currency
        && payment.amount == receipt.amount
        && payment.intermediary_id().is_some()
        && payment.intermediary_id() == receipt.intermediary_id()
        && payment.sub_system_id != receipt.sub_system_id
}

/// Whole days between two voucher dates, direction-agnostic
fn days_apart(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (a - b).num_days().abs()
}

fn confidence_for(
    payment: &Voucher,
    receipt: &Voucher,
    gap_days: i64,
    config: &ReconcileConfig,
) -> Confidence {
    let correlated =
        payment.transfer_ref.is_some() && payment.transfer_ref == receipt.transfer_ref;
    if correlated && gap_days <= config.high_confidence_days {
        Confidence::High
    } else if gap_days <= config.medium_confidence_days {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Counterpart, CreateTreasuryRequest, CreateVoucherRequest, Currency, SubSystem,
        TransferRequest, Treasury, TreasuryDetails, TreasuryKind,
    };
    use crate::Config;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn windows() -> ReconcileConfig {
        ReconcileConfig::default()
    }

    fn seed_pair(
        storage: &Storage,
        business: BusinessId,
    ) -> (SubSystem, Treasury, SubSystem, Treasury) {
        let sub_a =
            crate::subsystem::create(storage, business, "A".into(), "Alpha".into(), None).unwrap();
        let sub_b =
            crate::subsystem::create(storage, business, "B".into(), "Beta".into(), None).unwrap();
        let mut treasuries = Vec::new();
        for (sub, code) in [(&sub_a, "A-MAIN"), (&sub_b, "B-MAIN")] {
            treasuries.push(
                crate::treasury::create(
                    storage,
                    CreateTreasuryRequest {
                        business_id: business,
                        sub_system_id: sub.id,
                        code: code.into(),
                        name: code.into(),
                        description: None,
                        kind: TreasuryKind::Bank,
                        currency: Currency::USD,
                        opening_balance: Decimal::new(1000000, 2),
                        overdraft_allowed: false,
                        details: TreasuryDetails::default(),
                    },
                )
                .unwrap(),
            );
        }
        let treasury_b = treasuries.pop().unwrap();
        let treasury_a = treasuries.pop().unwrap();
        (sub_a, treasury_a, sub_b, treasury_b)
    }

    fn transfer_on(
        storage: &Storage,
        business: BusinessId,
        from: (&SubSystem, &Treasury),
        to: (&SubSystem, &Treasury),
        amount: Decimal,
        date: DateTime<Utc>,
    ) -> crate::types::TransferReceipt {
        crate::transfer::create(
            storage,
            TransferRequest {
                business_id: business,
                from_sub_system_id: from.0.id,
                from_treasury_id: from.1.id,
                to_sub_system_id: to.0.id,
                to_treasury_id: to.1.id,
                amount,
                description: None,
                transfer_date: date,
            },
        )
        .unwrap()
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_transfer_pair_matches_high() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let (sub_a, treasury_a, sub_b, treasury_b) = seed_pair(&storage, business);

        let transfer = transfer_on(
            &storage,
            business,
            (&sub_a, &treasury_a),
            (&sub_b, &treasury_b),
            Decimal::new(50000, 2),
            day(1),
        );

        let proposals = auto_reconcile(&storage, &windows(), business).unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].confidence, Confidence::High);
        assert_eq!(proposals[0].payment_voucher_id, transfer.payment_voucher_id);
        assert_eq!(proposals[0].receipt_voucher_id, transfer.receipt_voucher_id);
        assert_eq!(proposals[0].status, ReconciliationStatus::Pending);
    }

    #[test]
    fn test_auto_reconcile_is_idempotent() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let (sub_a, treasury_a, sub_b, treasury_b) = seed_pair(&storage, business);

        transfer_on(
            &storage,
            business,
            (&sub_a, &treasury_a),
            (&sub_b, &treasury_b),
            Decimal::new(50000, 2),
            day(1),
        );

        let first = auto_reconcile(&storage, &windows(), business).unwrap();
        assert_eq!(first.len(), 1);

        let second = auto_reconcile(&storage, &windows(), business).unwrap();
        assert!(second.is_empty());
        assert_eq!(list(&storage, business, None).unwrap().len(), 1);
    }

    #[test]
    fn test_confirm_reconciles_both_vouchers() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let (sub_a, treasury_a, sub_b, treasury_b) = seed_pair(&storage, business);

        transfer_on(
            &storage,
            business,
            (&sub_a, &treasury_a),
            (&sub_b, &treasury_b),
            Decimal::new(50000, 2),
            day(1),
        );
        let proposal = auto_reconcile(&storage, &windows(), business).unwrap().remove(0);

        let confirmed = confirm(&storage, proposal.id, Some("auditor".into())).unwrap();
        assert_eq!(confirmed.status, ReconciliationStatus::Confirmed);
        assert_eq!(confirmed.confirmed_by.as_deref(), Some("auditor"));

        let payment = storage.get_voucher(proposal.payment_voucher_id).unwrap();
        let receipt = storage.get_voucher(proposal.receipt_voucher_id).unwrap();
        assert!(payment.reconciled && receipt.reconciled);
        assert_eq!(payment.reconciled_with, Some(receipt.id));
        assert_eq!(receipt.reconciled_with, Some(payment.id));
        assert!(payment.is_terminal());

        // Both legs left the open set
        assert!(storage.list_unreconciled(business).unwrap().is_empty());

        // A later pass finds nothing
        assert!(auto_reconcile(&storage, &windows(), business).unwrap().is_empty());
    }

    #[test]
    fn test_second_confirm_is_concurrency_conflict() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let (sub_a, treasury_a, sub_b, treasury_b) = seed_pair(&storage, business);

        transfer_on(
            &storage,
            business,
            (&sub_a, &treasury_a),
            (&sub_b, &treasury_b),
            Decimal::new(50000, 2),
            day(1),
        );
        let proposal = auto_reconcile(&storage, &windows(), business).unwrap().remove(0);

        confirm(&storage, proposal.id, None).unwrap();
        let err = confirm(&storage, proposal.id, None).unwrap_err();
        assert!(matches!(err, Error::ConcurrencyConflict(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_rejected_pair_stays_excluded_until_cleared() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let (sub_a, treasury_a, sub_b, treasury_b) = seed_pair(&storage, business);

        transfer_on(
            &storage,
            business,
            (&sub_a, &treasury_a),
            (&sub_b, &treasury_b),
            Decimal::new(50000, 2),
            day(1),
        );
        let proposal = auto_reconcile(&storage, &windows(), business).unwrap().remove(0);

        let rejected = reject(&storage, proposal.id, Some("looks off".into())).unwrap();
        assert_eq!(rejected.status, ReconciliationStatus::Rejected);
        assert_eq!(rejected.notes.as_deref(), Some("looks off"));

        // Vouchers are back in the open set but the pair is blocked
        assert_eq!(storage.list_unreconciled(business).unwrap().len(), 2);
        assert!(auto_reconcile(&storage, &windows(), business).unwrap().is_empty());

        // Confirming a rejected proposal is illegal
        assert!(matches!(
            confirm(&storage, proposal.id, None).unwrap_err(),
            Error::InvalidState(_)
        ));

        clear_rejection(&storage, proposal.id).unwrap();
        let reproposed = auto_reconcile(&storage, &windows(), business).unwrap();
        assert_eq!(reproposed.len(), 1);
        assert_eq!(reproposed[0].payment_voucher_id, proposal.payment_voucher_id);
    }

    #[test]
    fn test_rejection_crosses_pairs_at_medium() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let (sub_a, treasury_a, sub_b, treasury_b) = seed_pair(&storage, business);

        let t1 = transfer_on(
            &storage,
            business,
            (&sub_a, &treasury_a),
            (&sub_b, &treasury_b),
            Decimal::new(50000, 2),
            day(1),
        );
        // Pin payment id order: v7 ids order by timestamp
        std::thread::sleep(std::time::Duration::from_millis(5));
        let t2 = transfer_on(
            &storage,
            business,
            (&sub_a, &treasury_a),
            (&sub_b, &treasury_b),
            Decimal::new(50000, 2),
            day(3),
        );

        // Reject the natural (P1, R1) pairing
        let first_pass = auto_reconcile(&storage, &windows(), business).unwrap();
        let p1_row = first_pass
            .iter()
            .find(|r| r.payment_voucher_id == t1.payment_voucher_id)
            .unwrap();
        reject(&storage, p1_row.id, None).unwrap();
        let p2_row = first_pass
            .iter()
            .find(|r| r.payment_voucher_id == t2.payment_voucher_id)
            .unwrap();
        reject(&storage, p2_row.id, None).unwrap();

        // P1 can only take R2 now, P2 only R1; both gaps are 2 days and
        // uncorrelated, so both grade medium
        let crossed = auto_reconcile(&storage, &windows(), business).unwrap();
        assert_eq!(crossed.len(), 2);
        for row in &crossed {
            assert_eq!(row.confidence, Confidence::Medium);
        }
        let p1_match = crossed
            .iter()
            .find(|r| r.payment_voucher_id == t1.payment_voucher_id)
            .unwrap();
        assert_eq!(p1_match.receipt_voucher_id, t2.receipt_voucher_id);
        let p2_match = crossed
            .iter()
            .find(|r| r.payment_voucher_id == t2.payment_voucher_id)
            .unwrap();
        assert_eq!(p2_match.receipt_voucher_id, t1.receipt_voucher_id);
    }

    #[test]
    fn test_receipt_consumed_once_per_pass() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let (sub_a, treasury_a, sub_b, treasury_b) = seed_pair(&storage, business);

        let t1 = transfer_on(
            &storage,
            business,
            (&sub_a, &treasury_a),
            (&sub_b, &treasury_b),
            Decimal::new(50000, 2),
            day(1),
        );
        let account_id = t1.intermediary_account_id;

        // A second open payment on the same account, same amount, created
        // after the transfer legs
        std::thread::sleep(std::time::Duration::from_millis(5));
        let extra = crate::voucher::create(
            &storage,
            CreateVoucherRequest {
                business_id: business,
                sub_system_id: sub_a.id,
                treasury_id: treasury_a.id,
                direction: VoucherDirection::Payment,
                amount: Decimal::new(50000, 2),
                counterpart: Counterpart::Intermediary { account_id },
                description: None,
                voucher_date: day(1),
            },
        )
        .unwrap();
        crate::voucher::confirm(&storage, extra.id).unwrap();

        let proposals = auto_reconcile(&storage, &windows(), business).unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].payment_voucher_id, t1.payment_voucher_id);
        assert_eq!(proposals[0].confidence, Confidence::High);
    }

    #[test]
    fn test_amount_and_account_must_agree() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let (sub_a, treasury_a, sub_b, treasury_b) = seed_pair(&storage, business);

        // Different amounts never match
        transfer_on(
            &storage,
            business,
            (&sub_a, &treasury_a),
            (&sub_b, &treasury_b),
            Decimal::new(50000, 2),
            day(1),
        );
        transfer_on(
            &storage,
            business,
            (&sub_b, &treasury_b),
            (&sub_a, &treasury_a),
            Decimal::new(60000, 2),
            day(1),
        );

        let proposals = auto_reconcile(&storage, &windows(), business).unwrap();
        // Each transfer matches its own legs, never across amounts
        assert_eq!(proposals.len(), 2);
        let amounts: Vec<_> = proposals.iter().map(|p| p.amount).collect();
        assert!(amounts.contains(&Decimal::new(50000, 2)));
        assert!(amounts.contains(&Decimal::new(60000, 2)));
    }

    #[test]
    fn test_manual_propose_validates_pair() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let (sub_a, treasury_a, sub_b, treasury_b) = seed_pair(&storage, business);

        let transfer = transfer_on(
            &storage,
            business,
            (&sub_a, &treasury_a),
            (&sub_b, &treasury_b),
            Decimal::new(50000, 2),
            day(1),
        );

        // Swapped roles fail direction validation
        let err = propose(
            &storage,
            &windows(),
            transfer.receipt_voucher_id,
            transfer.payment_voucher_id,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let proposal = propose(
            &storage,
            &windows(),
            transfer.payment_voucher_id,
            transfer.receipt_voucher_id,
            Some("manual review".into()),
        )
        .unwrap();
        assert_eq!(proposal.confidence, Confidence::High);
        assert_eq!(proposal.notes.as_deref(), Some("manual review"));

        // The pair now has a row; proposing again is illegal
        let dup = propose(
            &storage,
            &windows(),
            transfer.payment_voucher_id,
            transfer.receipt_voucher_id,
            None,
        )
        .unwrap_err();
        assert!(matches!(dup, Error::InvalidState(_)));
    }

    #[test]
    fn test_confidence_windows() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let (sub_a, treasury_a, sub_b, treasury_b) = seed_pair(&storage, business);

        let t = transfer_on(
            &storage,
            business,
            (&sub_a, &treasury_a),
            (&sub_b, &treasury_b),
            Decimal::new(50000, 2),
            day(1),
        );
        let payment = storage.get_voucher(t.payment_voucher_id).unwrap();
        let mut receipt = storage.get_voucher(t.receipt_voucher_id).unwrap();

        assert_eq!(
            confidence_for(&payment, &receipt, 0, &windows()),
            Confidence::High
        );
        // Correlated but outside the high window falls back to the
        // amount-based grade
        assert_eq!(
            confidence_for(&payment, &receipt, 3, &windows()),
            Confidence::Medium
        );
        assert_eq!(
            confidence_for(&payment, &receipt, 8, &windows()),
            Confidence::Low
        );

        // Without correlation the high window grades medium
        receipt.transfer_ref = None;
        assert_eq!(
            confidence_for(&payment, &receipt, 0, &windows()),
            Confidence::Medium
        );
    }

    #[test]
    fn test_days_apart_is_symmetric() {
        let a = day(1);
        let b = day(4);
        assert_eq!(days_apart(a, b), 3);
        assert_eq!(days_apart(b, a), 3);
        assert_eq!(days_apart(a, a), 0);
    }
}
