//! Core types for the accounting ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for money)
//!
//! Entity ids are UUIDv7, so id order is creation order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Business (tenant) identifier, assigned by the embedding ERP.
///
/// Threaded explicitly through every call; the core never assumes a
/// default tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessId(i64);

impl BusinessId {
    /// Create new business ID
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get as i64
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
    /// Saudi Riyal
    SAR,
    /// UAE Dirham
    AED,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::SAR => "SAR",
            Currency::AED => "AED",
        }
    }

    /// Parse from an ISO 4217 code
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "SAR" => Some(Currency::SAR),
            "AED" => Some(Currency::AED),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Kind of treasury account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreasuryKind {
    /// Physical cash box
    Cash,
    /// Bank account
    Bank,
    /// Electronic wallet
    Wallet,
    /// Exchange/brokerage account
    Exchange,
}

impl TreasuryKind {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            TreasuryKind::Cash => "cash",
            TreasuryKind::Bank => "bank",
            TreasuryKind::Wallet => "wallet",
            TreasuryKind::Exchange => "exchange",
        }
    }
}

impl fmt::Display for TreasuryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a voucher relative to its treasury
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherDirection {
    /// Money out of the treasury
    Payment,
    /// Money into the treasury
    Receipt,
}

impl VoucherDirection {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherDirection::Payment => "payment",
            VoucherDirection::Receipt => "receipt",
        }
    }

    /// Voucher number prefix (`PV-` / `RV-`)
    pub fn number_prefix(&self) -> &'static str {
        match self {
            VoucherDirection::Payment => "PV",
            VoucherDirection::Receipt => "RV",
        }
    }
}

impl fmt::Display for VoucherDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Voucher lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum VoucherStatus {
    /// Editable, no balance effect yet
    Draft = 1,
    /// Posted to the treasury balance
    Confirmed = 2,
    /// Abandoned draft (terminal)
    Cancelled = 3,
}

impl VoucherStatus {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Draft => "draft",
            VoucherStatus::Confirmed => "confirmed",
            VoucherStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who the money came from or went to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Counterpart {
    /// A named individual
    Person {
        /// Display name
        name: String,
    },
    /// A named organization
    Entity {
        /// Display name
        name: String,
    },
    /// An intermediary clearing account (cross-sub-system transfer leg)
    Intermediary {
        /// Intermediary account id
        account_id: Uuid,
    },
    /// Anything else
    Other {
        /// Free-form label
        name: String,
    },
}

impl Counterpart {
    /// Intermediary account id, if this counterpart is a clearing account
    pub fn intermediary_id(&self) -> Option<Uuid> {
        match self {
            Counterpart::Intermediary { account_id } => Some(*account_id),
            _ => None,
        }
    }
}

/// Reconciliation confidence.
///
/// Declared low-to-high so the derived ordering ranks candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    /// Amounts match but dates differ by more than the medium window
    Low,
    /// Exact amount within the medium window, no correlation marker
    Medium,
    /// Correlated transfer legs within the high window
    High,
}

impl Confidence {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconciliation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReconciliationStatus {
    /// Proposed, awaiting user decision
    Pending = 1,
    /// Both vouchers marked reconciled (terminal)
    Confirmed = 2,
    /// Declined; the pair stays excluded from auto-match
    Rejected = 3,
}

impl ReconciliationStatus {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Pending => "pending",
            ReconciliationStatus::Confirmed => "confirmed",
            ReconciliationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Organizational sub-system owning treasuries and vouchers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSystem {
    /// Unique id (UUIDv7)
    pub id: Uuid,

    /// Owning business
    pub business_id: BusinessId,

    /// Short code, unique within the business
    pub code: String,

    /// Display name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Inactive sub-systems reject new treasuries and vouchers
    pub is_active: bool,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Optional bank/wallet identification for a treasury
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryDetails {
    /// Bank name (bank treasuries)
    pub bank_name: Option<String>,

    /// Account number (bank treasuries)
    pub account_number: Option<String>,

    /// IBAN (bank treasuries)
    pub iban: Option<String>,

    /// Wallet provider (wallet treasuries)
    pub wallet_provider: Option<String>,

    /// Wallet number (wallet treasuries)
    pub wallet_number: Option<String>,
}

/// A cash/bank/wallet/exchange account belonging to one sub-system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treasury {
    /// Unique id (UUIDv7)
    pub id: Uuid,

    /// Owning business
    pub business_id: BusinessId,

    /// Owning sub-system
    pub sub_system_id: Uuid,

    /// Short code, unique within the sub-system
    pub code: String,

    /// Display name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Kind of account
    pub kind: TreasuryKind,

    /// Account currency; every voucher against it must match
    pub currency: Currency,

    /// Balance at creation
    pub opening_balance: Decimal,

    /// Current balance; mutated only by confirmed voucher postings
    pub balance: Decimal,

    /// Whether the balance may go below zero
    pub overdraft_allowed: bool,

    /// Inactive treasuries reject new postings
    pub is_active: bool,

    /// Bank/wallet identification
    pub details: TreasuryDetails,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last posting or metadata update
    pub updated_at: DateTime<Utc>,
}

impl Treasury {
    /// Apply a signed balance delta from a confirmed voucher posting.
    ///
    /// Fails with [`crate::Error::InsufficientFunds`] when the delta would
    /// drive the balance below zero and overdraft is not allowed.
    pub fn post(&mut self, delta: Decimal, at: DateTime<Utc>) -> crate::Result<()> {
        let next = self.balance + delta;
        if next < Decimal::ZERO && !self.overdraft_allowed {
            return Err(crate::Error::InsufficientFunds(format!(
                "treasury {} balance {} cannot absorb {}",
                self.code, self.balance, delta
            )));
        }
        self.balance = next;
        self.updated_at = at;
        Ok(())
    }
}

/// A single-sided financial movement record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    /// Unique id (UUIDv7)
    pub id: Uuid,

    /// Owning business
    pub business_id: BusinessId,

    /// Owning sub-system
    pub sub_system_id: Uuid,

    /// Treasury the money moves out of / into
    pub treasury_id: Uuid,

    /// Sequential human-readable number (`PV-000001` / `RV-000001`)
    pub number: String,

    /// Payment (out) or receipt (in)
    pub direction: VoucherDirection,

    /// Positive amount
    pub amount: Decimal,

    /// Currency; always equals the treasury currency
    pub currency: Currency,

    /// Who the money came from or went to
    pub counterpart: Counterpart,

    /// Optional description
    pub description: Option<String>,

    /// Business date of the movement
    pub voucher_date: DateTime<Utc>,

    /// Lifecycle status
    pub status: VoucherStatus,

    /// Set when a reconciliation linking this voucher is confirmed
    pub reconciled: bool,

    /// The opposite-direction voucher this one was reconciled with
    pub reconciled_with: Option<Uuid>,

    /// When the reconciliation was confirmed
    pub reconciled_at: Option<DateTime<Utc>>,

    /// Shared by both legs of one transfer orchestration; None for
    /// directly entered vouchers
    pub transfer_ref: Option<Uuid>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Voucher {
    /// Signed balance effect on the treasury once confirmed
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            VoucherDirection::Receipt => self.amount,
            VoucherDirection::Payment => -self.amount,
        }
    }

    /// Intermediary account id, if the counterpart is a clearing account
    pub fn intermediary_id(&self) -> Option<Uuid> {
        self.counterpart.intermediary_id()
    }

    /// Transition `draft -> confirmed`
    pub fn mark_confirmed(&mut self) -> crate::Result<()> {
        match self.status {
            VoucherStatus::Draft => {
                self.status = VoucherStatus::Confirmed;
                Ok(())
            }
            other => Err(crate::Error::InvalidState(format!(
                "voucher {} is {}, only drafts can be confirmed",
                self.number, other
            ))),
        }
    }

    /// Transition `draft -> cancelled`.
    ///
    /// Confirmed vouchers require a reversing entry instead.
    pub fn mark_cancelled(&mut self) -> crate::Result<()> {
        match self.status {
            VoucherStatus::Draft => {
                self.status = VoucherStatus::Cancelled;
                Ok(())
            }
            other => Err(crate::Error::InvalidState(format!(
                "voucher {} is {}, only drafts can be cancelled",
                self.number, other
            ))),
        }
    }

    /// Mark a confirmed, unreconciled voucher as reconciled with its pair
    pub fn mark_reconciled(&mut self, with: Uuid, at: DateTime<Utc>) -> crate::Result<()> {
        if self.status != VoucherStatus::Confirmed {
            return Err(crate::Error::InvalidState(format!(
                "voucher {} is {}, only confirmed vouchers can be reconciled",
                self.number, self.status
            )));
        }
        if self.reconciled {
            return Err(crate::Error::InvalidState(format!(
                "voucher {} is already reconciled",
                self.number
            )));
        }
        self.reconciled = true;
        self.reconciled_with = Some(with);
        self.reconciled_at = Some(at);
        Ok(())
    }

    /// Check if the voucher is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, VoucherStatus::Cancelled)
            || (self.status == VoucherStatus::Confirmed && self.reconciled)
    }
}

/// Virtual clearing ledger between two sub-systems in one currency.
///
/// One account per (business, unordered pair, currency). The pair is
/// stored as (low id, high id); a transfer from the low side posts
/// `+amount`, from the high side `-amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediaryAccount {
    /// Unique id (UUIDv7)
    pub id: Uuid,

    /// Owning business
    pub business_id: BusinessId,

    /// Human-readable code (`INT-` prefixed)
    pub code: String,

    /// Smaller sub-system id of the pair
    pub low_sub_system_id: Uuid,

    /// Larger sub-system id of the pair
    pub high_sub_system_id: Uuid,

    /// Signed net obligation between the pair
    pub balance: Decimal,

    /// Clearing currency
    pub currency: Currency,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last posting
    pub updated_at: DateTime<Utc>,
}

impl IntermediaryAccount {
    /// Canonical unordered pair (low, high) for two sub-system ids
    pub fn pair_key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Signed posting for a transfer of `amount` leaving `from_sub_system`
    pub fn signed_delta(&self, from_sub_system: Uuid, amount: Decimal) -> Decimal {
        if from_sub_system == self.low_sub_system_id {
            amount
        } else {
            -amount
        }
    }

    /// Whether the account clears for the given sub-system
    pub fn links(&self, sub_system_id: Uuid) -> bool {
        self.low_sub_system_id == sub_system_id || self.high_sub_system_id == sub_system_id
    }
}

/// A proposed or decided link between a payment and a receipt voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Unique id (UUIDv7)
    pub id: Uuid,

    /// Owning business
    pub business_id: BusinessId,

    /// The payment leg
    pub payment_voucher_id: Uuid,

    /// The receipt leg
    pub receipt_voucher_id: Uuid,

    /// Matched amount (both vouchers carry it exactly)
    pub amount: Decimal,

    /// Matched currency
    pub currency: Currency,

    /// Match confidence at proposal time
    pub confidence: Confidence,

    /// Lifecycle status
    pub status: ReconciliationStatus,

    /// Optional reviewer notes
    pub notes: Option<String>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Who confirmed the proposal
    pub confirmed_by: Option<String>,

    /// When the proposal was confirmed
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Reconciliation {
    /// Transition `pending -> confirmed`.
    ///
    /// A proposal already confirmed by a racing call yields a retryable
    /// [`crate::Error::ConcurrencyConflict`]; a rejected one yields
    /// [`crate::Error::InvalidState`].
    pub fn mark_confirmed(
        &mut self,
        by: Option<String>,
        at: DateTime<Utc>,
    ) -> crate::Result<()> {
        match self.status {
            ReconciliationStatus::Pending => {
                self.status = ReconciliationStatus::Confirmed;
                self.confirmed_by = by;
                self.confirmed_at = Some(at);
                Ok(())
            }
            ReconciliationStatus::Confirmed => Err(crate::Error::ConcurrencyConflict(format!(
                "reconciliation {} was already confirmed",
                self.id
            ))),
            ReconciliationStatus::Rejected => Err(crate::Error::InvalidState(format!(
                "reconciliation {} was rejected",
                self.id
            ))),
        }
    }

    /// Transition `pending -> rejected`
    pub fn mark_rejected(&mut self, notes: Option<String>) -> crate::Result<()> {
        match self.status {
            ReconciliationStatus::Pending => {
                self.status = ReconciliationStatus::Rejected;
                if notes.is_some() {
                    self.notes = notes;
                }
                Ok(())
            }
            other => Err(crate::Error::InvalidState(format!(
                "reconciliation {} is {}, only pending proposals can be rejected",
                self.id, other
            ))),
        }
    }
}

// Request/response contracts for the engine boundary. Validation happens
// here, before anything reaches the actor.

/// Metadata-only sub-system update; `None` fields stay unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubSystemUpdate {
    /// New display name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New active flag
    pub is_active: Option<bool>,
}

/// Request to create a treasury
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTreasuryRequest {
    /// Owning business
    pub business_id: BusinessId,
    /// Owning sub-system
    pub sub_system_id: Uuid,
    /// Short code, unique within the sub-system
    pub code: String,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Kind of account
    pub kind: TreasuryKind,
    /// Account currency
    pub currency: Currency,
    /// Balance at creation
    pub opening_balance: Decimal,
    /// Whether the balance may go below zero
    pub overdraft_allowed: bool,
    /// Bank/wallet identification
    #[serde(default)]
    pub details: TreasuryDetails,
}

impl CreateTreasuryRequest {
    /// Validate field-level rules
    pub fn validate(&self) -> crate::Result<()> {
        if self.code.trim().is_empty() {
            return Err(crate::Error::Validation("treasury code is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(crate::Error::Validation("treasury name is required".into()));
        }
        if self.opening_balance < Decimal::ZERO && !self.overdraft_allowed {
            return Err(crate::Error::Validation(
                "opening balance cannot be negative without overdraft".into(),
            ));
        }
        Ok(())
    }
}

/// Metadata-only treasury update; `None` fields stay unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreasuryUpdate {
    /// New display name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New active flag
    pub is_active: Option<bool>,
    /// New overdraft flag
    pub overdraft_allowed: Option<bool>,
    /// New bank/wallet identification
    pub details: Option<TreasuryDetails>,
}

/// Request to create a draft voucher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVoucherRequest {
    /// Owning business
    pub business_id: BusinessId,
    /// Owning sub-system
    pub sub_system_id: Uuid,
    /// Treasury the money moves out of / into
    pub treasury_id: Uuid,
    /// Payment (out) or receipt (in)
    pub direction: VoucherDirection,
    /// Positive amount
    pub amount: Decimal,
    /// Who the money came from or went to
    pub counterpart: Counterpart,
    /// Optional description
    pub description: Option<String>,
    /// Business date of the movement
    pub voucher_date: DateTime<Utc>,
}

impl CreateVoucherRequest {
    /// Validate field-level rules
    pub fn validate(&self) -> crate::Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(crate::Error::Validation("amount must be positive".into()));
        }
        Ok(())
    }
}

/// Draft voucher edit; `None` fields stay unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftVoucherUpdate {
    /// New amount
    pub amount: Option<Decimal>,
    /// New counterpart
    pub counterpart: Option<Counterpart>,
    /// New description
    pub description: Option<String>,
    /// New business date
    pub voucher_date: Option<DateTime<Utc>>,
}

/// Request to move funds across sub-systems
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Owning business
    pub business_id: BusinessId,
    /// Paying sub-system
    pub from_sub_system_id: Uuid,
    /// Paying treasury (must belong to `from_sub_system_id`)
    pub from_treasury_id: Uuid,
    /// Receiving sub-system
    pub to_sub_system_id: Uuid,
    /// Receiving treasury (must belong to `to_sub_system_id`)
    pub to_treasury_id: Uuid,
    /// Positive amount, in the shared currency of both treasuries
    pub amount: Decimal,
    /// Optional description copied to both vouchers
    pub description: Option<String>,
    /// Business date stamped on both vouchers
    pub transfer_date: DateTime<Utc>,
}

impl TransferRequest {
    /// Validate field-level rules
    pub fn validate(&self) -> crate::Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(crate::Error::Validation("amount must be positive".into()));
        }
        if self.from_sub_system_id == self.to_sub_system_id {
            return Err(crate::Error::Validation(
                "transfer must cross sub-systems".into(),
            ));
        }
        Ok(())
    }
}

/// Result of one transfer orchestration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Payment-leg voucher id
    pub payment_voucher_id: Uuid,
    /// Payment-leg voucher number
    pub payment_voucher_number: String,
    /// Receipt-leg voucher id
    pub receipt_voucher_id: Uuid,
    /// Receipt-leg voucher number
    pub receipt_voucher_number: String,
    /// Clearing account both legs reference
    pub intermediary_account_id: Uuid,
}

/// Transfer-leg vouchers of one sub-system, grouped by direction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferLists {
    /// Payment legs (money leaving the sub-system)
    pub outgoing: Vec<Voucher>,
    /// Receipt legs (money entering the sub-system)
    pub incoming: Vec<Voucher>,
}

/// Confirmed-voucher aggregates for one sub-system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSystemStats {
    /// Treasuries owned
    pub treasury_count: u64,
    /// Confirmed receipt vouchers
    pub receipt_count: u64,
    /// Sum of confirmed receipt amounts
    pub receipt_total: Decimal,
    /// Confirmed payment vouchers
    pub payment_count: u64,
    /// Sum of confirmed payment amounts
    pub payment_total: Decimal,
    /// `receipt_total - payment_total`
    pub net: Decimal,
}

/// Registry-wide intermediary aggregates for one business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediaryStats {
    /// Clearing accounts in the business
    pub total_accounts: u64,
    /// Accounts with a non-zero balance
    pub non_zero_accounts: u64,
    /// Sum of absolute balances (open exposure between sub-systems)
    pub open_exposure: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_voucher(direction: VoucherDirection) -> Voucher {
        Voucher {
            id: Uuid::now_v7(),
            business_id: BusinessId::new(1),
            sub_system_id: Uuid::now_v7(),
            treasury_id: Uuid::now_v7(),
            number: "PV-000001".to_string(),
            direction,
            amount: Decimal::new(25000, 2),
            currency: Currency::USD,
            counterpart: Counterpart::Person {
                name: "A. Vendor".to_string(),
            },
            description: None,
            voucher_date: Utc::now(),
            status: VoucherStatus::Draft,
            reconciled: false,
            reconciled_with: None,
            reconciled_at: None,
            transfer_ref: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("USD"), Some(Currency::USD));
        assert_eq!(Currency::from_code("SAR"), Some(Currency::SAR));
        assert_eq!(Currency::from_code("INVALID"), None);
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
    }

    #[test]
    fn test_voucher_signed_amount() {
        let payment = test_voucher(VoucherDirection::Payment);
        assert_eq!(payment.signed_amount(), Decimal::new(-25000, 2));

        let receipt = test_voucher(VoucherDirection::Receipt);
        assert_eq!(receipt.signed_amount(), Decimal::new(25000, 2));
    }

    #[test]
    fn test_voucher_confirm_then_cancel_fails() {
        let mut voucher = test_voucher(VoucherDirection::Payment);
        voucher.mark_confirmed().unwrap();
        assert_eq!(voucher.status, VoucherStatus::Confirmed);

        let err = voucher.mark_cancelled().unwrap_err();
        assert!(matches!(err, crate::Error::InvalidState(_)));
    }

    #[test]
    fn test_voucher_double_confirm_fails() {
        let mut voucher = test_voucher(VoucherDirection::Receipt);
        voucher.mark_confirmed().unwrap();
        assert!(voucher.mark_confirmed().is_err());
    }

    #[test]
    fn test_voucher_reconcile_requires_confirmed() {
        let mut voucher = test_voucher(VoucherDirection::Payment);
        let other = Uuid::now_v7();

        assert!(voucher.mark_reconciled(other, Utc::now()).is_err());

        voucher.mark_confirmed().unwrap();
        voucher.mark_reconciled(other, Utc::now()).unwrap();
        assert_eq!(voucher.reconciled_with, Some(other));
        assert!(voucher.is_terminal());

        // Second reconciliation attempt is rejected
        assert!(voucher.mark_reconciled(other, Utc::now()).is_err());
    }

    #[test]
    fn test_treasury_post_floor() {
        let mut treasury = Treasury {
            id: Uuid::now_v7(),
            business_id: BusinessId::new(1),
            sub_system_id: Uuid::now_v7(),
            code: "MAIN".to_string(),
            name: "Main Cash".to_string(),
            description: None,
            kind: TreasuryKind::Cash,
            currency: Currency::USD,
            opening_balance: Decimal::new(50000, 2),
            balance: Decimal::new(50000, 2),
            overdraft_allowed: false,
            is_active: true,
            details: TreasuryDetails::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        // 500.00 - 600.00 breaches the floor
        let err = treasury
            .post(Decimal::new(-60000, 2), Utc::now())
            .unwrap_err();
        assert!(matches!(err, crate::Error::InsufficientFunds(_)));
        assert_eq!(treasury.balance, Decimal::new(50000, 2));

        // Overdraft-capable treasuries may go negative
        treasury.overdraft_allowed = true;
        treasury.post(Decimal::new(-60000, 2), Utc::now()).unwrap();
        assert_eq!(treasury.balance, Decimal::new(-10000, 2));
    }

    #[test]
    fn test_pair_key_is_unordered() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(
            IntermediaryAccount::pair_key(a, b),
            IntermediaryAccount::pair_key(b, a)
        );
        let (low, high) = IntermediaryAccount::pair_key(a, b);
        assert!(low <= high);
    }

    #[test]
    fn test_intermediary_signed_delta() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let (low, high) = IntermediaryAccount::pair_key(a, b);
        let account = IntermediaryAccount {
            id: Uuid::now_v7(),
            business_id: BusinessId::new(1),
            code: "INT-0001".to_string(),
            low_sub_system_id: low,
            high_sub_system_id: high,
            balance: Decimal::ZERO,
            currency: Currency::USD,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let amount = Decimal::new(100000, 2);
        assert_eq!(account.signed_delta(low, amount), amount);
        assert_eq!(account.signed_delta(high, amount), -amount);
    }

    #[test]
    fn test_reconciliation_transitions() {
        let mut rec = Reconciliation {
            id: Uuid::now_v7(),
            business_id: BusinessId::new(1),
            payment_voucher_id: Uuid::now_v7(),
            receipt_voucher_id: Uuid::now_v7(),
            amount: Decimal::new(25000, 2),
            currency: Currency::USD,
            confidence: Confidence::High,
            status: ReconciliationStatus::Pending,
            notes: None,
            created_at: Utc::now(),
            confirmed_by: None,
            confirmed_at: None,
        };

        rec.mark_confirmed(Some("auditor".to_string()), Utc::now())
            .unwrap();
        assert_eq!(rec.status, ReconciliationStatus::Confirmed);

        // The racing second confirm loses with a retryable error
        let err = rec.mark_confirmed(None, Utc::now()).unwrap_err();
        assert!(err.is_retryable());

        // Rejected proposals cannot be confirmed
        rec.status = ReconciliationStatus::Rejected;
        let err = rec.mark_confirmed(None, Utc::now()).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidState(_)));
    }

    #[test]
    fn test_transfer_request_validation() {
        let sub = Uuid::now_v7();
        let req = TransferRequest {
            business_id: BusinessId::new(1),
            from_sub_system_id: sub,
            from_treasury_id: Uuid::now_v7(),
            to_sub_system_id: sub,
            to_treasury_id: Uuid::now_v7(),
            amount: Decimal::new(100000, 2),
            description: None,
            transfer_date: Utc::now(),
        };
        assert!(req.validate().is_err());

        let req = TransferRequest {
            to_sub_system_id: Uuid::now_v7(),
            amount: Decimal::ZERO,
            ..req
        };
        assert!(req.validate().is_err());
    }
}
