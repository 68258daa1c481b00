use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Cookie signing secret. Must be at least 64 bytes.
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSettings {
    pub secret_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub stripe: StripeSettings,
}

impl Settings {
    /// Loads `appsettings.toml` and layers `STOREFRONT__`-prefixed
    /// environment variables on top, e.g. `STOREFRONT__STRIPE__SECRET_KEY`.
    pub fn load() -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name("appsettings").required(false))
            .add_source(
                Environment::with_prefix("STOREFRONT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        if settings.session.secret.len() < 64 {
            return Err(ConfigError::Message(
                "session.secret must be at least 64 bytes".into(),
            ));
        }
        if settings.stripe.secret_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "stripe.secret_key must be set (use STOREFRONT__STRIPE__SECRET_KEY)".into(),
            ));
        }

        Ok(settings)
    }
}

fn default_pool_size() -> u32 {
    10
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_currency() -> String {
    "gbp".to_string()
}
