use crate::{error::AppError, AppState};
use analytics::{generate_summary_report, SummaryReport};
use axum::{extract::State, Json};
use core_types::{AccountSummary, OrderConfirmation, OrderSpec};
use manager::{AccountOrders, AccountPositions, Outcome};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    status: &'static str,
    version: &'static str,
    connected: bool,
    accounts: usize,
}

/// # GET /api/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let manager = state.manager.read().await;
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        connected: manager.session_count() > 0,
        accounts: manager.session_count(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResult {
    account_name: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    success: bool,
    total: usize,
    connected: usize,
    failed: usize,
    results: Vec<ConnectResult>,
}

/// # POST /api/connect
/// Authenticates every configured account. Individual failures land in
/// the results array; only a wholesale failure fails the request.
pub async fn connect(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConnectResponse>, AppError> {
    let mut manager = state.manager.write().await;

    if manager.config_count() == 0 {
        return Err(AppError::NoAccountsConfigured);
    }

    let report = manager.connect_all().await;

    if report.connected == 0 {
        return Err(AppError::ConnectionFailed(report.total));
    }

    let results = report
        .outcomes
        .iter()
        .map(|outcome| ConnectResult {
            account_name: outcome.account_name.clone(),
            success: outcome.is_success(),
            error: outcome.error().map(str::to_string),
        })
        .collect();

    Ok(Json(ConnectResponse {
        success: true,
        total: report.total,
        connected: report.connected,
        failed: report.failed,
        results,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    accounts: Vec<AccountSummary>,
    total_balance: Decimal,
}

/// # GET /api/summary
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SummaryResponse>, AppError> {
    let manager = state.manager.read().await;
    let accounts = manager.get_all_accounts_summary().await;
    let total_balance = accounts.iter().map(|s| s.cash_balance()).sum();

    Ok(Json(SummaryResponse {
        accounts,
        total_balance,
    }))
}

/// # GET /api/positions
pub async fn get_positions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AccountPositions>>, AppError> {
    let manager = state.manager.read().await;
    Ok(Json(manager.get_all_positions().await))
}

/// # GET /api/orders
pub async fn get_orders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AccountOrders>>, AppError> {
    let manager = state.manager.read().await;
    Ok(Json(manager.get_all_orders().await))
}

/// # GET /api/report
/// The cross-account rollup, computed from fresh summaries.
pub async fn get_report(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SummaryReport>, AppError> {
    let manager = state.manager.read().await;
    let summaries = manager.get_all_accounts_summary().await;
    Ok(Json(generate_summary_report(&summaries)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    /// Target a single account by name; omit to fan out to all of them.
    #[serde(default)]
    account: Option<String>,
    order: OrderSpec,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResult {
    account_name: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResponse {
    success: bool,
    results: Vec<TradeResult>,
}

/// # POST /api/trade
/// Places an order on one account or on all of them. Per-account trade
/// failures are entries in the results array, not a request failure.
pub async fn place_trade(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TradeRequest>,
) -> Result<Json<TradeResponse>, AppError> {
    let manager = state.manager.read().await;

    if manager.session_count() == 0 {
        return Err(AppError::NotConnected);
    }

    let results: Vec<TradeResult> = match &request.account {
        Some(account) => {
            let confirmation = manager.place_order(account, &request.order).await?;
            vec![TradeResult {
                account_name: account.clone(),
                success: true,
                order_id: confirmation.order_id,
                error: None,
            }]
        }
        None => manager
            .place_order_on_all(&request.order)
            .await
            .into_iter()
            .map(outcome_to_result)
            .collect(),
    };

    let success = results.iter().any(|r| r.success);
    Ok(Json(TradeResponse { success, results }))
}

fn outcome_to_result(outcome: Outcome<OrderConfirmation>) -> TradeResult {
    let Outcome {
        account_name,
        result,
    } = outcome;

    match result {
        Ok(confirmation) => TradeResult {
            account_name,
            success: true,
            order_id: confirmation.order_id,
            error: None,
        },
        Err(error) => TradeResult {
            account_name,
            success: false,
            order_id: None,
            error: Some(error),
        },
    }
}
