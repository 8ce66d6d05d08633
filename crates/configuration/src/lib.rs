use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{AccountConfig, Config, Settings};

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. It reads the
/// configuration file, deserializes it into our strongly-typed `Config`
/// struct, and validates every account entry before anything touches the
/// network. A missing credential field is fatal here, not at connect time.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(config::File::with_name("config.toml"))
}

/// Loads configuration from an arbitrary `config` source. Split out so
/// tests can feed in TOML strings instead of files on disk.
pub fn load_config_from<S>(source: S) -> Result<Config, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let builder = config::Config::builder().add_source(source).build()?;

    let config = builder.try_deserialize::<Config>()?;

    for account in &config.accounts {
        account.validate()?;
    }

    Ok(config)
}
