//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the engine.
//!
//! # Metrics
//!
//! - `accounting_vouchers_confirmed_total` - Confirmed voucher postings
//! - `accounting_transfers_total` - Transfers posted
//! - `accounting_reconciliations_proposed_total` - Proposals created
//! - `accounting_reconciliations_confirmed_total` - Proposals confirmed
//! - `accounting_reconciliations_rejected_total` - Proposals rejected
//! - `accounting_errors_total{kind}` - Typed operation failures
//! - `accounting_transfer_duration_seconds` - Transfer latency
//! - `accounting_reconcile_duration_seconds` - Auto-match pass latency
//! - `accounting_open_proposals` - Pending proposals this process created

use crate::Error;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct EngineMetrics {
    /// Confirmed voucher postings
    pub vouchers_confirmed: IntCounter,

    /// Transfers posted
    pub transfers_total: IntCounter,

    /// Reconciliation proposals created
    pub reconciliations_proposed: IntCounter,

    /// Reconciliation proposals confirmed
    pub reconciliations_confirmed: IntCounter,

    /// Reconciliation proposals rejected
    pub reconciliations_rejected: IntCounter,

    /// Failures by error kind
    pub errors_total: IntCounterVec,

    /// Transfer latency histogram
    pub transfer_duration: Histogram,

    /// Auto-match pass latency histogram
    pub reconcile_duration: Histogram,

    /// Pending proposals opened and not yet decided
    pub open_proposals: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl EngineMetrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let vouchers_confirmed = IntCounter::with_opts(Opts::new(
            "accounting_vouchers_confirmed_total",
            "Confirmed voucher postings",
        ))?;
        registry.register(Box::new(vouchers_confirmed.clone()))?;

        let transfers_total = IntCounter::with_opts(Opts::new(
            "accounting_transfers_total",
            "Cross-sub-system transfers posted",
        ))?;
        registry.register(Box::new(transfers_total.clone()))?;

        let reconciliations_proposed = IntCounter::with_opts(Opts::new(
            "accounting_reconciliations_proposed_total",
            "Reconciliation proposals created",
        ))?;
        registry.register(Box::new(reconciliations_proposed.clone()))?;

        let reconciliations_confirmed = IntCounter::with_opts(Opts::new(
            "accounting_reconciliations_confirmed_total",
            "Reconciliation proposals confirmed",
        ))?;
        registry.register(Box::new(reconciliations_confirmed.clone()))?;

        let reconciliations_rejected = IntCounter::with_opts(Opts::new(
            "accounting_reconciliations_rejected_total",
            "Reconciliation proposals rejected",
        ))?;
        registry.register(Box::new(reconciliations_rejected.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("accounting_errors_total", "Operation failures by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let transfer_duration = Histogram::with_opts(
            HistogramOpts::new(
                "accounting_transfer_duration_seconds",
                "Transfer orchestration latency",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(transfer_duration.clone()))?;

        let reconcile_duration = Histogram::with_opts(
            HistogramOpts::new(
                "accounting_reconcile_duration_seconds",
                "Auto-match pass latency",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 5.0]),
        )?;
        registry.register(Box::new(reconcile_duration.clone()))?;

        let open_proposals = IntGauge::with_opts(Opts::new(
            "accounting_open_proposals",
            "Pending reconciliation proposals",
        ))?;
        registry.register(Box::new(open_proposals.clone()))?;

        Ok(Self {
            vouchers_confirmed,
            transfers_total,
            reconciliations_proposed,
            reconciliations_confirmed,
            reconciliations_rejected,
            errors_total,
            transfer_duration,
            reconcile_duration,
            open_proposals,
            registry,
        })
    }

    /// Record a confirmed voucher posting
    pub fn record_voucher_confirmed(&self) {
        self.vouchers_confirmed.inc();
    }

    /// Record a posted transfer with its latency
    pub fn record_transfer(&self, duration_seconds: f64) {
        self.transfers_total.inc();
        // Each transfer confirms two vouchers
        self.vouchers_confirmed.inc_by(2);
        self.transfer_duration.observe(duration_seconds);
    }

    /// Record an auto-match pass with its latency and proposal count
    pub fn record_reconcile_pass(&self, duration_seconds: f64, proposed: usize) {
        self.reconcile_duration.observe(duration_seconds);
        self.reconciliations_proposed.inc_by(proposed as u64);
        self.open_proposals.add(proposed as i64);
    }

    /// Record a manual proposal
    pub fn record_proposal(&self) {
        self.reconciliations_proposed.inc();
        self.open_proposals.inc();
    }

    /// Record a confirmed proposal
    pub fn record_reconciliation_confirmed(&self) {
        self.reconciliations_confirmed.inc();
        self.open_proposals.dec();
    }

    /// Record a rejected proposal
    pub fn record_reconciliation_rejected(&self) {
        self.reconciliations_rejected.inc();
        self.open_proposals.dec();
    }

    /// Record a failed operation
    pub fn record_error(&self, error: &Error) {
        self.errors_total.with_label_values(&[error.kind()]).inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
