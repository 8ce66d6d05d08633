use crate::metrics::{calculate_risk_metrics, RiskMetrics};
use crate::report::{generate_summary_report, SummaryReport};
use chrono::{DateTime, Utc};
use core_types::{AccountSummary, Order, Position};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One account's slice of an exported snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub account_name: String,
    pub account_id: Option<i64>,
    pub balance: Decimal,
    pub positions: Vec<Position>,
    pub orders: Vec<Order>,
    pub risk: RiskMetrics,
}

/// A point-in-time JSON export of the whole portfolio. Write-only from
/// the system's perspective: nothing here is ever read back into live
/// state, so the format can grow freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub timestamp: DateTime<Utc>,
    pub report: SummaryReport,
    pub accounts: Vec<AccountSnapshot>,
}

/// Builds the export model from already-fetched summaries. Pure — writing
/// the file is the caller's concern.
pub fn build_snapshot(summaries: &[AccountSummary], timestamp: DateTime<Utc>) -> PortfolioSnapshot {
    PortfolioSnapshot {
        timestamp,
        report: generate_summary_report(summaries),
        accounts: summaries
            .iter()
            .map(|summary| AccountSnapshot {
                account_name: summary.account_name.clone(),
                account_id: summary.account_id,
                balance: summary.cash_balance(),
                positions: summary.positions.clone(),
                orders: summary.orders.clone(),
                risk: calculate_risk_metrics(summary),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{CashBalance, OrderAction};
    use rust_decimal_macros::dec;

    fn summary() -> AccountSummary {
        AccountSummary {
            account_name: "Primary".to_string(),
            account_id: Some(1001),
            account_info: None,
            positions: vec![Position {
                id: 7,
                account_id: 1001,
                contract_id: 12345,
                net_pos: -3,
                net_price: Some(dec!(5043.25)),
                timestamp: "2024-05-01T13:30:00Z".parse().ok(),
                bought: Some(2),
                sold: Some(5),
            }],
            orders: vec![Order {
                id: 9,
                account_id: 1001,
                contract_id: Some(12345),
                action: OrderAction::Sell,
                ord_status: Some("Working".to_string()),
                qty: Some(1),
                timestamp: None,
            }],
            balance: Some(CashBalance {
                cash_balance: dec!(48250.5),
                open_pnl: Some(dec!(-120.25)),
                total_margin: None,
                week_realized_pnl: None,
            }),
        }
    }

    #[test]
    fn snapshot_survives_a_json_round_trip_unchanged() {
        let timestamp = "2024-05-01T14:00:00Z".parse().unwrap();
        let snapshot = build_snapshot(&[summary()], timestamp);

        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        let restored: PortfolioSnapshot = serde_json::from_str(&json).unwrap();

        // Identical balances, positions, orders and risk on the way back.
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn snapshot_carries_report_and_per_account_risk() {
        let timestamp = "2024-05-01T14:00:00Z".parse().unwrap();
        let snapshot = build_snapshot(&[summary()], timestamp);

        assert_eq!(snapshot.report.total_accounts, 1);
        assert_eq!(snapshot.accounts.len(), 1);

        let account = &snapshot.accounts[0];
        assert_eq!(account.balance, dec!(48250.5));
        assert_eq!(account.risk.exposure, 3);
        assert_eq!(account.risk.position_count, 1);
    }
}
