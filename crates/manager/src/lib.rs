//! # Multi-Account Manager Crate
//!
//! This crate is the heart of the system: it owns the registry of account
//! sessions and the fan-out machinery that runs one operation against all
//! of them concurrently while keeping per-account success and failure
//! attribution intact.
//!
//! ## Architectural Principles
//!
//! - **Fan-out as a named primitive:** every bulk operation is a thin
//!   wrapper around `execute_on_all`, which itself rests on the
//!   `settle_all` combinator. The combinator is a barrier with
//!   partial-failure semantics — one offline account must never block
//!   status reporting or order placement on the others.
//! - **Failure attribution over convenience:** batch paths report through
//!   `Outcome<T>` rather than short-circuiting, so a caller always sees
//!   exactly one record per live session. Only single-target lookups
//!   (`place_order` on a named account) fail hard.
//! - **Static registry discipline:** connecting and disconnecting take
//!   `&mut self` while batches take `&self`, so the compiler rejects the
//!   one access pattern this design leaves undefined — mutating the
//!   session map while a batch over it is in flight.
//!
//! ## Public API
//!
//! - `MultiAccountManager`: the registry plus every cross-account operation.
//! - `Outcome` / `settle_all`: the tagged-result fan-out primitive.
//! - `ManagerError`: the specific error types returned from this crate.

use api_client::error::ApiError;
use api_client::{AccountApi, TradovateClient};
use configuration::{AccountConfig, Settings};
use core_types::{AccountInfo, AccountSummary, Order, OrderConfirmation, OrderSpec, Position};
use rust_decimal::Decimal;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing;

pub mod error;
pub mod fanout;

// Re-export the key components to provide a clean, public-facing API.
pub use error::ManagerError;
pub use fanout::{settle_all, Outcome};

/// One live, authenticated session keyed by account name.
struct SessionEntry {
    name: String,
    api: Arc<dyn AccountApi>,
}

/// Aggregate result of a bulk connect: the per-account outcomes plus the
/// counts the CLI and web layer print.
#[derive(Debug)]
pub struct ConnectionReport {
    pub total: usize,
    pub connected: usize,
    pub failed: usize,
    pub outcomes: Vec<Outcome<AccountInfo>>,
}

/// Positions grouped under the account that holds them. Accounts with no
/// open positions are omitted from the grouping entirely.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPositions {
    pub account_name: String,
    pub positions: Vec<Position>,
}

/// Orders grouped under the account that owns them. Accounts with no
/// orders are omitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOrders {
    pub account_name: String,
    pub orders: Vec<Order>,
}

/// Owns the account configurations and the live-session registry, and
/// mediates every cross-account operation.
///
/// Registration is append-only and duplicate names are allowed: a second
/// session connecting under an existing name replaces the first in place,
/// so the last successful connect wins.
pub struct MultiAccountManager {
    demo: bool,
    operation_timeout: Option<Duration>,
    configs: Vec<AccountConfig>,
    sessions: Vec<SessionEntry>,
}

impl MultiAccountManager {
    pub fn new(settings: &Settings) -> Self {
        Self {
            demo: settings.demo,
            operation_timeout: settings.operation_timeout_secs.map(Duration::from_secs),
            configs: Vec::new(),
            sessions: Vec::new(),
        }
    }

    /// Registers one account configuration. The credential fields are
    /// validated here, before any network activity; a bad config aborts
    /// its own registration and nothing else.
    pub fn register(&mut self, config: AccountConfig) -> Result<(), ManagerError> {
        config.validate()?;
        tracing::info!(account = %config.account_name, "registered account configuration");
        self.configs.push(config);
        Ok(())
    }

    /// Registers a batch of account configurations.
    pub fn register_many(&mut self, configs: Vec<AccountConfig>) -> Result<(), ManagerError> {
        for config in configs {
            self.register(config)?;
        }
        Ok(())
    }

    /// Authenticates every registered account concurrently. Failures are
    /// recorded per account and never cancel or delay the other attempts;
    /// only the accounts that authenticated end up in the live registry.
    pub async fn connect_all(&mut self) -> ConnectionReport {
        let demo = self.demo;
        self.connect_all_with(|config| {
            Arc::new(TradovateClient::new(config.clone(), demo)) as Arc<dyn AccountApi>
        })
        .await
    }

    /// Bulk connect with an explicit session factory. Production uses the
    /// platform client; tests inject mocks here.
    pub async fn connect_all_with<F>(&mut self, build: F) -> ConnectionReport
    where
        F: Fn(&AccountConfig) -> Arc<dyn AccountApi>,
    {
        tracing::info!(total = self.configs.len(), "connecting all accounts");

        let pending: Vec<(String, Arc<dyn AccountApi>)> = self
            .configs
            .iter()
            .map(|config| (config.account_name.clone(), build(config)))
            .collect();

        let tasks: Vec<_> = pending
            .iter()
            .map(|(name, api)| {
                let api = api.clone();
                (
                    name.clone(),
                    Self::bounded(self.operation_timeout, async move {
                        api.authenticate().await.map_err(|e| e.to_string())
                    }),
                )
            })
            .collect();

        let outcomes = fanout::settle_all(tasks).await;

        for ((name, api), outcome) in pending.into_iter().zip(&outcomes) {
            if outcome.is_success() {
                self.insert_session(name, api);
            } else if let Some(error) = outcome.error() {
                tracing::error!(account = %name, error, "failed to connect account");
            }
        }

        let connected = outcomes.iter().filter(|o| o.is_success()).count();
        let report = ConnectionReport {
            total: outcomes.len(),
            connected,
            failed: outcomes.len() - connected,
            outcomes,
        };

        tracing::info!(
            total = report.total,
            connected = report.connected,
            failed = report.failed,
            "connection summary"
        );

        report
    }

    /// Looks up a live session by account name.
    pub fn get(&self, account_name: &str) -> Option<Arc<dyn AccountApi>> {
        self.sessions
            .iter()
            .find(|entry| entry.name == account_name)
            .map(|entry| entry.api.clone())
    }

    /// The names of all live sessions, in connect order.
    pub fn names(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.name.clone()).collect()
    }

    /// The number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The number of registered account configurations.
    pub fn config_count(&self) -> usize {
        self.configs.len()
    }

    /// Discards every live session. Streaming connections owned by the
    /// sessions end with them. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if !self.sessions.is_empty() {
            tracing::info!(sessions = self.sessions.len(), "disconnecting all accounts");
        }
        self.sessions.clear();
    }

    /// Runs `operation` against every live session concurrently and
    /// returns one outcome per session, in registry order.
    ///
    /// This is the fan-out primitive all bulk operations build on: the
    /// batch acts as a barrier — it resolves only after every session has
    /// settled — and a failure on one account never aborts the rest. With
    /// a configured operation timeout, a stalled account settles as a
    /// timeout failure instead of holding the batch open.
    pub async fn execute_on_all<T, F, Fut>(&self, operation: F) -> Vec<Outcome<T>>
    where
        F: Fn(Arc<dyn AccountApi>) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let tasks: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| {
                let fut = operation(entry.api.clone());
                (
                    entry.name.clone(),
                    Self::bounded(self.operation_timeout, async move {
                        fut.await.map_err(|e| e.to_string())
                    }),
                )
            })
            .collect();

        fanout::settle_all(tasks).await
    }

    /// Fetches every account's summary and returns the ones that
    /// succeeded. Failed accounts are logged and dropped here; callers
    /// that need per-account failure visibility use `execute_on_all`
    /// directly instead of this convenience view.
    pub async fn get_all_accounts_summary(&self) -> Vec<AccountSummary> {
        let outcomes = self
            .execute_on_all(|api| async move { Ok::<_, ApiError>(api.account_summary().await) })
            .await;

        outcomes
            .into_iter()
            .filter_map(|outcome| {
                let Outcome {
                    account_name,
                    result,
                } = outcome;
                match result {
                    Ok(summary) => Some(summary),
                    Err(error) => {
                        tracing::warn!(account = %account_name, error, "dropping failed summary");
                        None
                    }
                }
            })
            .collect()
    }

    /// Total cash across all live accounts. An account whose balance is
    /// unavailable contributes zero rather than poisoning the sum.
    pub async fn get_total_balance(&self) -> Decimal {
        let summaries = self.get_all_accounts_summary().await;
        summaries.iter().map(|summary| summary.cash_balance()).sum()
    }

    /// All open positions across accounts, grouped by account. Accounts
    /// that are flat (or failed to answer) are omitted.
    pub async fn get_all_positions(&self) -> Vec<AccountPositions> {
        let outcomes = self
            .execute_on_all(|api| async move { api.positions().await })
            .await;

        outcomes
            .into_iter()
            .filter_map(|outcome| {
                let Outcome {
                    account_name,
                    result,
                } = outcome;
                match result {
                    Ok(positions) if !positions.is_empty() => Some(AccountPositions {
                        account_name,
                        positions,
                    }),
                    Ok(_) => None,
                    Err(error) => {
                        tracing::warn!(account = %account_name, error, "dropping failed position fetch");
                        None
                    }
                }
            })
            .collect()
    }

    /// All orders across accounts, grouped by account. Accounts with no
    /// orders (or a failed fetch) are omitted.
    pub async fn get_all_orders(&self) -> Vec<AccountOrders> {
        let outcomes = self
            .execute_on_all(|api| async move { api.orders().await })
            .await;

        outcomes
            .into_iter()
            .filter_map(|outcome| {
                let Outcome {
                    account_name,
                    result,
                } = outcome;
                match result {
                    Ok(orders) if !orders.is_empty() => Some(AccountOrders {
                        account_name,
                        orders,
                    }),
                    Ok(_) => None,
                    Err(error) => {
                        tracing::warn!(account = %account_name, error, "dropping failed order fetch");
                        None
                    }
                }
            })
            .collect()
    }

    /// Places an order on one named account. Unlike the batch paths this
    /// fails hard on an unknown name — there is no batch to preserve.
    pub async fn place_order(
        &self,
        account_name: &str,
        spec: &OrderSpec,
    ) -> Result<OrderConfirmation, ManagerError> {
        let api = self
            .get(account_name)
            .ok_or_else(|| ManagerError::AccountNotFound(account_name.to_string()))?;

        Ok(api.place_order(spec).await?)
    }

    /// Cancels a working order on one named account.
    pub async fn cancel_order(
        &self,
        account_name: &str,
        order_id: i64,
    ) -> Result<(), ManagerError> {
        let api = self
            .get(account_name)
            .ok_or_else(|| ManagerError::AccountNotFound(account_name.to_string()))?;

        Ok(api.cancel_order(order_id).await?)
    }

    /// Places the same order on every live account.
    pub async fn place_order_on_all(&self, spec: &OrderSpec) -> Vec<Outcome<OrderConfirmation>> {
        tracing::info!(symbol = %spec.symbol, action = %spec.action, "placing order on all accounts");
        let spec = spec.clone();
        self.execute_on_all(move |api| {
            let spec = spec.clone();
            async move { api.place_order(&spec).await }
        })
        .await
    }

    /// Renews every session's token; sessions whose tokens are still
    /// valid report success without re-authenticating.
    pub async fn renew_all_tokens(&self) -> Vec<Outcome<()>> {
        self.execute_on_all(|api| async move { api.renew_token().await })
            .await
    }

    /// Inserts a session under its account name, replacing an existing
    /// entry in place so a shadowed name keeps its registry position.
    fn insert_session(&mut self, name: String, api: Arc<dyn AccountApi>) {
        match self.sessions.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.api = api,
            None => self.sessions.push(SessionEntry { name, api }),
        }
    }

    /// Applies the configured per-operation deadline, reporting an elapsed
    /// timer as an ordinary per-account failure.
    async fn bounded<T, Fut>(limit: Option<Duration>, fut: Fut) -> Result<T, String>
    where
        Fut: Future<Output = Result<T, String>>,
    {
        match limit {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(format!("operation timed out after {}s", limit.as_secs())),
            },
            None => fut.await,
        }
    }
}
