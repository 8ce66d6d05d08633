use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{OrderAction, OrderType};

/// One account record as returned by the platform's account listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub active: bool,
    /// Demo accounts report a balance inline on the account record. The
    /// authoritative number comes from the cash balance endpoint.
    #[serde(default)]
    pub cash_balance: Option<Decimal>,
}

/// The cash balance record for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashBalance {
    pub cash_balance: Decimal,
    #[serde(default, rename = "openPnL")]
    pub open_pnl: Option<Decimal>,
    #[serde(default)]
    pub total_margin: Option<Decimal>,
    #[serde(default, rename = "weekRealizedPnL")]
    pub week_realized_pnl: Option<Decimal>,
}

/// An open position as reported by the platform. Passed through mostly
/// opaque; only `net_pos` and `net_price` are interpreted downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: i64,
    pub account_id: i64,
    pub contract_id: i64,
    /// Net contracts held; negative for short positions.
    pub net_pos: i64,
    #[serde(default)]
    pub net_price: Option<Decimal>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub bought: Option<i64>,
    #[serde(default)]
    pub sold: Option<i64>,
}

/// A working or historical order as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub account_id: i64,
    #[serde(default)]
    pub contract_id: Option<i64>,
    pub action: OrderAction,
    #[serde(default)]
    pub ord_status: Option<String>,
    #[serde(default)]
    pub qty: Option<u32>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The caller-supplied description of an order to place. The submitting
/// session attaches its own account id before sending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSpec {
    pub action: OrderAction,
    pub symbol: String,
    pub order_qty: u32,
    pub order_type: OrderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

/// The platform's response to an order placement. A populated
/// `failure_text` means the order was rejected even though the HTTP call
/// itself succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    #[serde(default)]
    pub order_id: Option<i64>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub failure_text: Option<String>,
}

/// Point-in-time snapshot of one account.
///
/// Each section is fetched independently; a failed sub-query leaves its
/// section empty rather than failing the snapshot as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub account_name: String,
    pub account_id: Option<i64>,
    pub account_info: Option<AccountInfo>,
    pub positions: Vec<Position>,
    pub orders: Vec<Order>,
    pub balance: Option<CashBalance>,
}

impl AccountSummary {
    /// The account's cash balance, or zero when the balance sub-query
    /// failed or has not been fetched.
    pub fn cash_balance(&self) -> Decimal {
        self.balance
            .as_ref()
            .map(|b| b.cash_balance)
            .unwrap_or(Decimal::ZERO)
    }
}
