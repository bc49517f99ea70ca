//! # configs
//!
//! Layered settings: built-in defaults, then an optional `marketplace.toml`,
//! then `MARKETPLACE__SECTION__KEY` environment variables. A `.env` file in
//! the working directory is loaded first, when present.

use std::time::Duration;

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const ENV_PREFIX: &str = "MARKETPLACE";
pub const DEFAULT_CONFIG_FILE: &str = "marketplace";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    pub chat: ChatSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Bearer token sent with every request, if set.
    #[serde(default, deserialize_with = "secret")]
    pub token: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
    pub poll_interval_secs: u64,
    pub reconcile_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// An `EnvFilter` directive, e.g. `info` or `services=debug,info`.
    pub level: String,
    pub json: bool,
}

fn secret<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SecretString>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.filter(|s| !s.is_empty()).map(SecretString::from))
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ChatSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn reconcile_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_delay_ms)
    }
}

impl Settings {
    /// Loads `.env`, then layers defaults, `{file}.toml` (optional) and env.
    pub fn load(file: Option<&str>) -> Result<Self, SettingsError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
        }
        let config = Self::builder(file.unwrap_or(DEFAULT_CONFIG_FILE))?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Self::from_config(config)
    }

    fn builder(file: &str) -> Result<config::ConfigBuilder<config::builder::DefaultState>, SettingsError> {
        Ok(Config::builder()
            .set_default("api.base_url", "http://localhost:3000")?
            .set_default("api.timeout_secs", 30_i64)?
            .set_default("chat.poll_interval_secs", 30_i64)?
            .set_default("chat.reconcile_delay_ms", 500_i64)?
            .set_default("log.level", "info")?
            .set_default("log.json", false)?
            .add_source(File::with_name(file).required(false)))
    }

    fn from_config(config: Config) -> Result<Self, SettingsError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.api.base_url.trim().is_empty() {
            return Err(SettingsError::Invalid("api.base_url must be set".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(SettingsError::Invalid("api.timeout_secs must be positive".into()));
        }
        if self.chat.poll_interval_secs == 0 {
            return Err(SettingsError::Invalid("chat.poll_interval_secs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn from_overrides(overrides: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let mut builder = Settings::builder("does-not-exist")?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        Settings::from_config(builder.build()?)
    }

    #[test]
    fn defaults_match_chat_timings() {
        let settings = from_overrides(&[]).unwrap();
        assert_eq!(settings.chat.poll_interval(), Duration::from_secs(30));
        assert_eq!(settings.chat.reconcile_delay(), Duration::from_millis(500));
        assert_eq!(settings.api.base_url, "http://localhost:3000");
        assert!(settings.api.token.is_none());
        assert!(!settings.log.json);
    }

    #[test]
    fn token_is_kept_secret() {
        let settings = from_overrides(&[("api.token", "s3cr3t")]).unwrap();
        let token = settings.api.token.as_ref().unwrap();
        assert_eq!(token.expose_secret(), "s3cr3t");
        assert!(!format!("{settings:?}").contains("s3cr3t"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = from_overrides(&[("chat.poll_interval_secs", "0")]).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }
}
