use crate::error::ConfigError;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub settings: Settings,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// Process-wide settings shared by every account.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Connect against the demo environment instead of live.
    #[serde(default = "default_demo")]
    pub demo: bool,
    /// Optional per-operation deadline for fan-out batches, in seconds.
    /// When unset, a stalled account can hold a batch open indefinitely.
    #[serde(default)]
    pub operation_timeout_secs: Option<u64>,
}

fn default_demo() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            demo: true,
            operation_timeout_secs: None,
        }
    }
}

/// Static identity and credentials for one brokerage account. Immutable
/// once loaded; the registry owns these for the life of the process.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// The local label used to key the session map. Not sent to the
    /// platform.
    pub account_name: String,
    pub username: String,
    pub password: String,
    pub app_id: String,
    pub app_version: String,
    /// The API client id issued with the application key.
    pub cid: i64,
    /// The API secret issued with the application key.
    pub sec: String,
}

impl AccountConfig {
    /// Checks that every credential field required for authentication is
    /// present. Called before any connect attempt; a failure here aborts
    /// that account's registration outright.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("account_name", &self.account_name),
            ("username", &self.username),
            ("password", &self.password),
            ("app_id", &self.app_id),
            ("app_version", &self.app_version),
            ("sec", &self.sec),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    account: self.account_name.clone(),
                    field: name.to_string(),
                });
            }
        }

        if self.cid <= 0 {
            return Err(ConfigError::MissingField {
                account: self.account_name.clone(),
                field: "cid".to_string(),
            });
        }

        Ok(())
    }
}
