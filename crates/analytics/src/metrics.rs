use core_types::AccountSummary;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exposure above this share of balance classifies as MEDIUM risk.
pub const MEDIUM_EXPOSURE_PCT: Decimal = dec!(30);
/// Exposure above this share of balance classifies as HIGH risk.
pub const HIGH_EXPOSURE_PCT: Decimal = dec!(50);
/// Accounts below this cash balance are flagged in reports and alerts.
pub const LOW_BALANCE_THRESHOLD: Decimal = dec!(5000);

/// Risk classification buckets derived from exposure as a share of balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::None => write!(f, "NONE"),
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Derived risk numbers for one account. Never stored — recomputed from a
/// fresh summary on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    pub balance: Decimal,
    /// Sum of absolute net position sizes, in contracts. A deliberate
    /// simplification: contract count, not notional value.
    pub exposure: i64,
    pub exposure_percent: Decimal,
    pub position_count: usize,
    pub avg_position_size: Decimal,
    pub risk_level: RiskLevel,
}

/// Classifies one account's exposure against its balance.
pub fn calculate_risk_metrics(summary: &AccountSummary) -> RiskMetrics {
    let balance = summary.cash_balance();
    let positions = &summary.positions;

    if positions.is_empty() {
        return RiskMetrics {
            balance,
            exposure: 0,
            exposure_percent: Decimal::ZERO,
            position_count: 0,
            avg_position_size: Decimal::ZERO,
            risk_level: RiskLevel::None,
        };
    }

    let exposure: i64 = positions.iter().map(|p| p.net_pos.abs()).sum();

    // Guard against a zero balance: exposure over nothing reads as 0%,
    // never infinity.
    let exposure_percent = if balance > Decimal::ZERO {
        Decimal::from(exposure) / balance * dec!(100)
    } else {
        Decimal::ZERO
    };

    let avg_position_size = Decimal::from(exposure) / Decimal::from(positions.len() as i64);

    let risk_level = if exposure_percent > HIGH_EXPOSURE_PCT {
        RiskLevel::High
    } else if exposure_percent > MEDIUM_EXPOSURE_PCT {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    RiskMetrics {
        balance,
        exposure,
        exposure_percent,
        position_count: positions.len(),
        avg_position_size,
        risk_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{CashBalance, Position};

    fn summary(balance: Option<Decimal>, net_positions: &[i64]) -> AccountSummary {
        AccountSummary {
            account_name: "Test".to_string(),
            account_id: Some(1001),
            account_info: None,
            positions: net_positions
                .iter()
                .enumerate()
                .map(|(i, &net_pos)| Position {
                    id: i as i64,
                    account_id: 1001,
                    contract_id: 100 + i as i64,
                    net_pos,
                    net_price: None,
                    timestamp: None,
                    bought: None,
                    sold: None,
                })
                .collect(),
            orders: Vec::new(),
            balance: balance.map(|cash_balance| CashBalance {
                cash_balance,
                open_pnl: None,
                total_margin: None,
                week_realized_pnl: None,
            }),
        }
    }

    #[test]
    fn small_exposure_is_low_risk() {
        let metrics = calculate_risk_metrics(&summary(Some(dec!(10000)), &[3, -2]));

        assert_eq!(metrics.exposure, 5);
        assert_eq!(metrics.exposure_percent, dec!(0.05));
        assert_eq!(metrics.position_count, 2);
        assert_eq!(metrics.avg_position_size, dec!(2.5));
        assert_eq!(metrics.risk_level, RiskLevel::Low);
    }

    #[test]
    fn exposure_above_half_of_balance_is_high_risk() {
        // 55 contracts against a balance of 100: 55%.
        let metrics = calculate_risk_metrics(&summary(Some(dec!(100)), &[55]));

        assert_eq!(metrics.exposure_percent, dec!(55));
        assert_eq!(metrics.risk_level, RiskLevel::High);
    }

    #[test]
    fn exposure_between_thresholds_is_medium_risk() {
        let metrics = calculate_risk_metrics(&summary(Some(dec!(100)), &[35]));

        assert_eq!(metrics.exposure_percent, dec!(35));
        assert_eq!(metrics.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn no_positions_means_no_risk() {
        let metrics = calculate_risk_metrics(&summary(Some(dec!(10000)), &[]));

        assert_eq!(metrics.exposure, 0);
        assert_eq!(metrics.exposure_percent, Decimal::ZERO);
        assert_eq!(metrics.risk_level, RiskLevel::None);
    }

    #[test]
    fn zero_balance_with_exposure_reads_as_zero_percent() {
        let metrics = calculate_risk_metrics(&summary(None, &[4]));

        assert_eq!(metrics.balance, Decimal::ZERO);
        assert_eq!(metrics.exposure, 4);
        // balance > 0 guard: never a division by zero.
        assert_eq!(metrics.exposure_percent, Decimal::ZERO);
        assert_eq!(metrics.risk_level, RiskLevel::Low);
    }
}
