use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from file: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Account '{account}' is missing required credential field '{field}'")]
    MissingField { account: String, field: String },
}
