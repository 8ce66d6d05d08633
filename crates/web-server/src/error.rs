use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use manager::ManagerError;
use serde_json::json;
use thiserror::Error;
use tracing;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Manager error: {0}")]
    Manager(#[from] ManagerError),
    #[error("Not connected")]
    NotConnected,
    #[error("No accounts configured")]
    NoAccountsConfigured,
    #[error("All {0} account connections failed")]
    ConnectionFailed(usize),
}

/// Converts our custom `AppError` into an HTTP response.
///
/// Lookup misses are the caller's fault (404), a missing connect step is a
/// bad request, and platform-side failures surface as gateway errors.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Manager(ManagerError::AccountNotFound(name)) => (
                StatusCode::NOT_FOUND,
                format!("Account '{name}' not found"),
            ),
            AppError::Manager(ManagerError::Config(config_err)) => {
                tracing::error!(error = ?config_err, "Configuration error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A server configuration error occurred".to_string(),
                )
            }
            AppError::Manager(manager_err) => {
                tracing::error!(error = ?manager_err, "Manager error.");
                (
                    StatusCode::BAD_GATEWAY,
                    "The trading platform rejected the request".to_string(),
                )
            }
            AppError::NotConnected => (
                StatusCode::BAD_REQUEST,
                "Not connected. Please connect first.".to_string(),
            ),
            AppError::NoAccountsConfigured => (
                StatusCode::NOT_FOUND,
                "No accounts configured".to_string(),
            ),
            AppError::ConnectionFailed(total) => (
                StatusCode::BAD_GATEWAY,
                format!("All {total} account connections failed"),
            ),
        };

        let body = Json(json!({ "success": false, "error": error_message }));
        (status, body).into_response()
    }
}
