use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The credential payload sent to `/auth/accesstokenrequest`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenRequest<'a> {
    pub name: &'a str,
    pub password: &'a str,
    pub app_id: &'a str,
    pub app_version: &'a str,
    pub cid: i64,
    pub sec: &'a str,
}

/// The token bundle granted by a successful authentication.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub md_access_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub expiration_time: DateTime<Utc>,
    #[serde(default)]
    pub user_status: Option<String>,
    #[serde(default)]
    pub has_live: Option<bool>,
}

/// The error body the platform attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub error_text: Option<String>,
}

/// A tradable contract record from `/contract/suggest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub contract_maturity_id: Option<i64>,
}

/// Acknowledgement for order commands that answer with a command id
/// rather than an order record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandConfirmation {
    #[serde(default)]
    pub command_id: Option<i64>,
    #[serde(default)]
    pub failure_text: Option<String>,
}
