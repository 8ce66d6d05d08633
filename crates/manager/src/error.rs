use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Account '{0}' not found")]
    AccountNotFound(String),

    #[error("Configuration error: {0}")]
    Config(#[from] configuration::error::ConfigError),

    #[error("API error: {0}")]
    Api(#[from] api_client::error::ApiError),
}
