use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to reach the trading platform: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The platform returned an error ({0}): {1}")]
    Platform(u16, String),

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Session is not authenticated")]
    NotAuthenticated,

    #[error("The platform returned no accounts for this login")]
    NoAccounts,

    #[error("Order rejected by the platform: {0}")]
    OrderRejected(String),

    #[error("No market-data token was granted for this session")]
    MarketDataUnavailable,

    #[error("Contract not found for symbol: {0}")]
    ContractNotFound(String),
}
