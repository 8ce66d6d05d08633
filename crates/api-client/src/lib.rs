use crate::error::ApiError;
use crate::responses::{AccessTokenRequest, AccessTokenResponse, ApiErrorResponse, CommandConfirmation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use configuration::AccountConfig;
use core_types::{
    AccountInfo, AccountSummary, CashBalance, Order, OrderConfirmation, OrderSpec, Position,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing;

pub mod error;
pub mod market_data;
pub mod responses;
pub mod retry;

// --- Public API ---
pub use market_data::{MarketDataStream, QuoteEvent};
pub use responses::Contract;
pub use retry::retry_with_backoff;

const DEMO_URL: &str = "https://demo.tradovateapi.com/v1";
const LIVE_URL: &str = "https://live.tradovateapi.com/v1";
const DEMO_WS_URL: &str = "wss://demo.tradovateapi.com/v1/websocket";
const LIVE_WS_URL: &str = "wss://live.tradovateapi.com/v1/websocket";

/// The account-scoped operations the multi-account core drives.
/// This trait is the contract between the registry and a live session,
/// allowing the platform client to be swapped for a mock in tests.
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// The local label this session was registered under.
    fn account_name(&self) -> &str;

    /// Runs the full credential exchange and captures the account identity.
    /// Replaces any previous token bundle wholesale.
    async fn authenticate(&self) -> Result<AccountInfo, ApiError>;

    /// Fetches the primary account record for this login.
    async fn account_info(&self) -> Result<AccountInfo, ApiError>;

    /// Fetches all open positions.
    async fn positions(&self) -> Result<Vec<Position>, ApiError>;

    /// Fetches all orders visible to this session.
    async fn orders(&self) -> Result<Vec<Order>, ApiError>;

    /// Fetches the cash balance record for the authenticated account.
    async fn balance(&self) -> Result<CashBalance, ApiError>;

    /// Submits an order for this session's account.
    async fn place_order(&self, spec: &OrderSpec) -> Result<OrderConfirmation, ApiError>;

    /// Cancels a working order by platform order id.
    async fn cancel_order(&self, order_id: i64) -> Result<(), ApiError>;

    /// The platform account id captured during authentication.
    async fn account_id(&self) -> Option<i64>;

    /// Whether the session token has passed its expiry timestamp. A session
    /// that never authenticated counts as expired.
    async fn is_expired(&self) -> bool;

    /// Re-authenticates only when the current token has expired; otherwise
    /// this is a no-op.
    async fn renew_token(&self) -> Result<(), ApiError>;

    /// Fetches identity, positions, orders and balance concurrently,
    /// degrading each failed sub-query to an empty section instead of
    /// failing the snapshot as a whole.
    async fn account_summary(&self) -> AccountSummary {
        let (info, positions, orders, balance) = tokio::join!(
            self.account_info(),
            self.positions(),
            self.orders(),
            self.balance(),
        );

        let name = self.account_name();
        AccountSummary {
            account_name: name.to_string(),
            account_id: self.account_id().await,
            account_info: degrade(name, "account info", info),
            positions: degrade(name, "positions", positions).unwrap_or_default(),
            orders: degrade(name, "orders", orders).unwrap_or_default(),
            balance: degrade(name, "balance", balance),
        }
    }
}

/// Logs a failed summary sub-query and maps it to an empty section.
fn degrade<T>(account: &str, section: &str, result: Result<T, ApiError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(account, section, error = %err, "summary sub-query failed, degrading to empty");
            None
        }
    }
}

/// The token bundle and identity for one authenticated session. Replaced
/// as a unit on every (re-)authentication so readers never observe a
/// half-renewed session.
#[derive(Debug, Clone)]
struct SessionState {
    access_token: String,
    md_access_token: Option<String>,
    user_id: Option<i64>,
    expiration_time: DateTime<Utc>,
    account_id: i64,
}

/// A concrete implementation of `AccountApi` for the Tradovate REST API.
pub struct TradovateClient {
    config: AccountConfig,
    base_url: String,
    ws_url: String,
    http: reqwest::Client,
    session: RwLock<Option<SessionState>>,
}

impl TradovateClient {
    pub fn new(config: AccountConfig, demo: bool) -> Self {
        let (base_url, ws_url) = if demo {
            (DEMO_URL, DEMO_WS_URL)
        } else {
            (LIVE_URL, LIVE_WS_URL)
        };
        Self::with_base_url(config, base_url, ws_url)
    }

    /// Builds a client against an explicit endpoint pair. Tests point this
    /// at a local mock server.
    pub fn with_base_url(
        config: AccountConfig,
        base_url: impl Into<String>,
        ws_url: impl Into<String>,
    ) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Self {
            config,
            base_url: base_url.into(),
            ws_url: ws_url.into(),
            http: reqwest::Client::builder()
                .default_headers(headers)
                .build()
                .expect("Failed to build reqwest client"),
            session: RwLock::new(None),
        }
    }

    /// The bearer token of the current session, if any.
    async fn access_token(&self) -> Result<String, ApiError> {
        let session = self.session.read().await;
        session
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or(ApiError::NotAuthenticated)
    }

    async fn get_authed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .query(query)
            .bearer_auth(token)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn post_authed<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .json(body)
            .bearer_auth(token)
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Turns an HTTP response into a typed payload, mapping non-2xx bodies
    /// into the platform error text when one is present.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            let message = serde_json::from_str::<ApiErrorResponse>(&text)
                .ok()
                .and_then(|e| e.error_text)
                .unwrap_or(text);
            Err(ApiError::Platform(status.as_u16(), message))
        }
    }

    /// Fetches the account list with an explicit token, so `authenticate`
    /// can complete the whole round-trip before publishing the session.
    async fn fetch_account_list(&self, token: &str) -> Result<AccountInfo, ApiError> {
        let url = format!("{}/account/list", self.base_url);
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let accounts: Vec<AccountInfo> = Self::decode(response).await?;
        accounts.into_iter().next().ok_or(ApiError::NoAccounts)
    }

    /// Looks up the tradable contract closest to the given symbol text.
    pub async fn find_contract(&self, symbol: &str) -> Result<Contract, ApiError> {
        let contracts: Vec<Contract> = self
            .get_authed("/contract/suggest", &[("text", symbol.to_string())])
            .await?;

        contracts
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ContractNotFound(symbol.to_string()))
    }

    /// Opens the market-data streaming capability for this session.
    ///
    /// Requires a completed authentication; the stream authorizes itself
    /// with the session's market-data token. Sessions without an md token
    /// (some live logins) cannot stream.
    pub async fn market_data(&self) -> Result<MarketDataStream, ApiError> {
        let session = self.session.read().await;
        let state = session.as_ref().ok_or(ApiError::NotAuthenticated)?;
        let md_token = state
            .md_access_token
            .clone()
            .ok_or(ApiError::MarketDataUnavailable)?;

        Ok(MarketDataStream::new(self.ws_url.clone(), md_token))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceOrderRequest {
    account_id: i64,
    #[serde(flatten)]
    spec: OrderSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelOrderRequest {
    order_id: i64,
}

#[async_trait]
impl AccountApi for TradovateClient {
    fn account_name(&self) -> &str {
        &self.config.account_name
    }

    async fn authenticate(&self) -> Result<AccountInfo, ApiError> {
        tracing::info!(account = %self.config.account_name, "authenticating");

        let request = AccessTokenRequest {
            name: &self.config.username,
            password: &self.config.password,
            app_id: &self.config.app_id,
            app_version: &self.config.app_version,
            cid: self.config.cid,
            sec: &self.config.sec,
        };

        let url = format!("{}/auth/accesstokenrequest", self.base_url);
        let response = self.http.post(&url).json(&request).send().await?;
        let granted: AccessTokenResponse = Self::decode(response).await?;

        // Resolve the account identity with the fresh token before the
        // session is published, so the swap below is the only state change.
        let info = self.fetch_account_list(&granted.access_token).await?;

        {
            let mut session = self.session.write().await;
            *session = Some(SessionState {
                access_token: granted.access_token,
                md_access_token: granted.md_access_token,
                user_id: granted.user_id,
                expiration_time: granted.expiration_time,
                account_id: info.id,
            });
        }

        tracing::info!(
            account = %self.config.account_name,
            account_id = info.id,
            user_id = ?granted.user_id,
            "authentication successful"
        );

        Ok(info)
    }

    async fn account_info(&self) -> Result<AccountInfo, ApiError> {
        let accounts: Vec<AccountInfo> = self.get_authed("/account/list", &[]).await?;
        accounts.into_iter().next().ok_or(ApiError::NoAccounts)
    }

    async fn positions(&self) -> Result<Vec<Position>, ApiError> {
        self.get_authed("/position/list", &[]).await
    }

    async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        self.get_authed("/order/list", &[]).await
    }

    async fn balance(&self) -> Result<CashBalance, ApiError> {
        let account_id = self.account_id().await.ok_or(ApiError::NotAuthenticated)?;
        self.get_authed(
            "/cashBalance/getcashbalance",
            &[("accountId", account_id.to_string())],
        )
        .await
    }

    async fn place_order(&self, spec: &OrderSpec) -> Result<OrderConfirmation, ApiError> {
        let account_id = self.account_id().await.ok_or(ApiError::NotAuthenticated)?;

        let request = PlaceOrderRequest {
            account_id,
            spec: spec.clone(),
        };

        let confirmation: OrderConfirmation =
            self.post_authed("/order/placeorder", &request).await?;

        // A 200 with a failure text is still a rejection.
        if let Some(reason) = confirmation
            .failure_text
            .clone()
            .or_else(|| confirmation.failure_reason.clone())
        {
            return Err(ApiError::OrderRejected(reason));
        }

        tracing::info!(
            account = %self.config.account_name,
            order_id = ?confirmation.order_id,
            symbol = %spec.symbol,
            "order placed"
        );

        Ok(confirmation)
    }

    async fn cancel_order(&self, order_id: i64) -> Result<(), ApiError> {
        let confirmation: CommandConfirmation = self
            .post_authed("/order/cancelorder", &CancelOrderRequest { order_id })
            .await?;

        if let Some(reason) = confirmation.failure_text {
            return Err(ApiError::OrderRejected(reason));
        }

        tracing::info!(account = %self.config.account_name, order_id, "order cancelled");
        Ok(())
    }

    async fn account_id(&self) -> Option<i64> {
        let session = self.session.read().await;
        session.as_ref().map(|s| s.account_id)
    }

    async fn is_expired(&self) -> bool {
        let session = self.session.read().await;
        match session.as_ref() {
            Some(state) => Utc::now() >= state.expiration_time,
            None => true,
        }
    }

    async fn renew_token(&self) -> Result<(), ApiError> {
        if !self.is_expired().await {
            tracing::debug!(account = %self.config.account_name, "token still valid");
            return Ok(());
        }

        tracing::info!(account = %self.config.account_name, "token expired, re-authenticating");
        self.authenticate().await.map(|_| ())
    }
}
