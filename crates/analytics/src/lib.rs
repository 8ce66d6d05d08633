//! # Portfolio Analytics Crate
//!
//! Pure, synchronous derivations over already-fetched account summaries:
//! per-account risk metrics, the cross-account summary report, account
//! screening helpers, and the exportable portfolio snapshot.
//!
//! Nothing in this crate performs I/O. Fetching summaries is the
//! manager's job; rendering or persisting the results belongs to the
//! callers.

pub mod metrics;
pub mod report;
pub mod snapshot;

// Re-export the key components to provide a clean, public-facing API.
pub use metrics::{
    calculate_risk_metrics, RiskLevel, RiskMetrics, HIGH_EXPOSURE_PCT, LOW_BALANCE_THRESHOLD,
    MEDIUM_EXPOSURE_PCT,
};
pub use report::{
    accounts_with_orders, accounts_with_positions, generate_summary_report, low_balance_accounts,
    RiskDistribution, SummaryReport,
};
pub use snapshot::{build_snapshot, AccountSnapshot, PortfolioSnapshot};
