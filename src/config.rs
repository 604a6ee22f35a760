use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub json_logs: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    pub url: String,
    pub session_ttl_secs: u64,
    pub menu_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSettings {
    pub secret_key: String,
    pub api_base: String,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusinessSettings {
    pub delivery_fee_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub stripe: StripeSettings,
    pub business: BusinessSettings,
}

impl Settings {
    /// Layers built-in defaults, `config/default.toml`, `config/local.toml` and
    /// `EATS__SECTION__KEY` variables. `PG_DATABASE_URL` and `REDIS_DATABASE_URI`
    /// win over everything else.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.cors_origin", "http://localhost:3000")?
            .set_default("server.json_logs", false)?
            .set_default("database.url", "postgres://localhost/mashallah_eats")?
            .set_default("database.pool_size", 5)?
            .set_default("redis.url", "redis://127.0.0.1/")?
            .set_default("redis.session_ttl_secs", 86_400)?
            .set_default("redis.menu_ttl_secs", 300)?
            .set_default("stripe.secret_key", "")?
            .set_default("stripe.api_base", "https://api.stripe.com/v1")?
            .set_default("stripe.currency", "usd")?
            .set_default("business.delivery_fee_cents", 299)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("EATS").separator("__"))
            .set_override_option("database.url", env::var("PG_DATABASE_URL").ok())?
            .set_override_option("redis.url", env::var("REDIS_DATABASE_URI").ok())?
            .set_override_option("stripe.secret_key", env::var("STRIPE_SECRET_KEY").ok())?
            .build()?;

        settings.try_deserialize()
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_with_defaults() {
        let settings = Settings::load().unwrap();
        assert!(settings.server.port > 0);
        assert!(settings.business.delivery_fee_cents >= 0);
        assert!(!settings.stripe.api_base.is_empty());
    }
}
