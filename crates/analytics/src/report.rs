use crate::metrics::{calculate_risk_metrics, RiskLevel, LOW_BALANCE_THRESHOLD};
use core_types::AccountSummary;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Counts of accounts per risk bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub none: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// A cross-account rollup of balances, activity and risk, ready for a
/// printer or a JSON response to render without re-deriving anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub total_accounts: usize,
    pub total_balance: Decimal,
    pub total_positions: usize,
    pub total_orders: usize,
    pub accounts_with_positions: usize,
    pub accounts_with_orders: usize,
    pub low_balance_accounts: usize,
    /// Zero when there are no accounts. An empty portfolio has no
    /// meaningful average and must not report NaN or infinity.
    pub average_balance: Decimal,
    pub risk_distribution: RiskDistribution,
}

/// Rolls a set of account summaries up into one report.
pub fn generate_summary_report(summaries: &[AccountSummary]) -> SummaryReport {
    let mut report = SummaryReport {
        total_accounts: summaries.len(),
        ..Default::default()
    };

    for summary in summaries {
        let balance = summary.cash_balance();

        report.total_balance += balance;
        report.total_positions += summary.positions.len();
        report.total_orders += summary.orders.len();

        if !summary.positions.is_empty() {
            report.accounts_with_positions += 1;
        }
        if !summary.orders.is_empty() {
            report.accounts_with_orders += 1;
        }
        if balance < LOW_BALANCE_THRESHOLD {
            report.low_balance_accounts += 1;
        }

        match calculate_risk_metrics(summary).risk_level {
            RiskLevel::None => report.risk_distribution.none += 1,
            RiskLevel::Low => report.risk_distribution.low += 1,
            RiskLevel::Medium => report.risk_distribution.medium += 1,
            RiskLevel::High => report.risk_distribution.high += 1,
        }
    }

    if report.total_accounts > 0 {
        report.average_balance = report.total_balance / Decimal::from(report.total_accounts as i64);
    }

    report
}

/// Summaries whose cash balance sits below `threshold`.
pub fn low_balance_accounts(
    summaries: &[AccountSummary],
    threshold: Decimal,
) -> Vec<&AccountSummary> {
    summaries
        .iter()
        .filter(|summary| summary.cash_balance() < threshold)
        .collect()
}

/// Summaries with at least one open position.
pub fn accounts_with_positions(summaries: &[AccountSummary]) -> Vec<&AccountSummary> {
    summaries
        .iter()
        .filter(|summary| !summary.positions.is_empty())
        .collect()
}

/// Summaries with at least one order.
pub fn accounts_with_orders(summaries: &[AccountSummary]) -> Vec<&AccountSummary> {
    summaries
        .iter()
        .filter(|summary| !summary.orders.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{CashBalance, Order, OrderAction, Position};
    use rust_decimal_macros::dec;

    fn summary(name: &str, balance: Decimal, net_positions: &[i64], orders: usize) -> AccountSummary {
        AccountSummary {
            account_name: name.to_string(),
            account_id: Some(1),
            account_info: None,
            positions: net_positions
                .iter()
                .enumerate()
                .map(|(i, &net_pos)| Position {
                    id: i as i64,
                    account_id: 1,
                    contract_id: 100 + i as i64,
                    net_pos,
                    net_price: None,
                    timestamp: None,
                    bought: None,
                    sold: None,
                })
                .collect(),
            orders: (0..orders)
                .map(|i| Order {
                    id: i as i64,
                    account_id: 1,
                    contract_id: Some(100),
                    action: OrderAction::Buy,
                    ord_status: Some("Working".to_string()),
                    qty: Some(1),
                    timestamp: None,
                })
                .collect(),
            balance: Some(CashBalance {
                cash_balance: balance,
                open_pnl: None,
                total_margin: None,
                week_realized_pnl: None,
            }),
        }
    }

    #[test]
    fn report_rolls_up_activity_and_risk_buckets() {
        let summaries = vec![
            summary("Flat", dec!(20000), &[], 0),
            summary("Light", dec!(10000), &[3, -2], 1),
            summary("Heavy", dec!(100), &[60], 2),
            summary("Thin", dec!(1000), &[], 0),
        ];

        let report = generate_summary_report(&summaries);

        assert_eq!(report.total_accounts, 4);
        assert_eq!(report.total_balance, dec!(31100));
        assert_eq!(report.total_positions, 3);
        assert_eq!(report.total_orders, 3);
        assert_eq!(report.accounts_with_positions, 2);
        assert_eq!(report.accounts_with_orders, 2);
        assert_eq!(report.low_balance_accounts, 2);
        assert_eq!(report.average_balance, dec!(7775));
        assert_eq!(report.risk_distribution.none, 2);
        assert_eq!(report.risk_distribution.low, 1);
        assert_eq!(report.risk_distribution.high, 1);
    }

    #[test]
    fn empty_report_has_a_defined_average() {
        let report = generate_summary_report(&[]);

        assert_eq!(report.total_accounts, 0);
        assert_eq!(report.total_balance, Decimal::ZERO);
        // Explicit contract: no accounts means an average of zero, not NaN.
        assert_eq!(report.average_balance, Decimal::ZERO);
    }

    #[test]
    fn screening_helpers_filter_by_condition() {
        let summaries = vec![
            summary("Rich", dec!(60000), &[1], 0),
            summary("Poor", dec!(800), &[], 1),
        ];

        let low = low_balance_accounts(&summaries, dec!(5000));
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].account_name, "Poor");

        assert_eq!(accounts_with_positions(&summaries).len(), 1);
        assert_eq!(accounts_with_orders(&summaries).len(), 1);
    }
}
