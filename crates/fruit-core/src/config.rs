//! ============================================================================
//! Bot Configuration - Environment-driven settings
//! ============================================================================

use anyhow::{anyhow, Result};
use chrono::Duration;
use std::str::FromStr;

use crate::access::OperatorAllowList;
use crate::browser::DEFAULT_SESSION_TTL_MINUTES;
use crate::cooldown::DEFAULT_DRAW_COOLDOWN_HOURS;
use crate::store::StoreBackend;

pub const DEFAULT_CATALOG_PATH: &str = "Fruits.json";
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for the bot
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot API token; the runner refuses to start without it
    pub telegram_token: Option<String>,
    pub catalog_path: String,
    pub store_backend: StoreBackend,
    /// `None` means the backend's default location
    pub store_path: Option<String>,
    pub operators: OperatorAllowList,
    pub draw_cooldown: Duration,
    pub session_ttl: Duration,
    pub poll_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            catalog_path: DEFAULT_CATALOG_PATH.to_string(),
            store_backend: StoreBackend::Json,
            store_path: None,
            operators: OperatorAllowList::default(),
            draw_cooldown: Duration::hours(DEFAULT_DRAW_COOLDOWN_HOURS),
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
        }
    }
}

impl BotConfig {
    /// Read from process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.telegram_token = get("TELEGRAM_TOKEN");
        if let Some(path) = get("FRUIT_CATALOG_PATH") {
            config.catalog_path = path;
        }
        if let Some(backend) = get("FRUIT_STORE_BACKEND") {
            config.store_backend = backend.parse()?;
        }
        config.store_path = get("FRUIT_STORE_PATH");
        if let Some(ids) = get("FRUIT_OPERATOR_IDS") {
            config.operators = OperatorAllowList::parse(&ids)?;
        }
        if let Some(hours) = get("FRUIT_DRAW_COOLDOWN_HOURS") {
            config.draw_cooldown = Duration::hours(parse_positive("FRUIT_DRAW_COOLDOWN_HOURS", &hours)?);
        }
        if let Some(minutes) = get("FRUIT_SESSION_TTL_MINUTES") {
            config.session_ttl = Duration::minutes(parse_positive("FRUIT_SESSION_TTL_MINUTES", &minutes)?);
        }
        if let Some(secs) = get("FRUIT_POLL_TIMEOUT_SECS") {
            config.poll_timeout_secs = parse_positive("FRUIT_POLL_TIMEOUT_SECS", &secs)?;
        }

        Ok(config)
    }

    pub fn require_token(&self) -> Result<&str> {
        self.telegram_token
            .as_deref()
            .ok_or_else(|| anyhow!("TELEGRAM_TOKEN is not set"))
    }
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let value = raw
        .parse::<T>()
        .map_err(|e| anyhow!("Invalid {} '{}': {}", key, raw, e))?;
    if value <= T::default() {
        return Err(anyhow!("{} must be greater than zero, got '{}'", key, raw));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<BotConfig> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.catalog_path, "Fruits.json");
        assert_eq!(config.store_backend, StoreBackend::Json);
        assert_eq!(config.store_path, None);
        assert!(config.operators.is_operator(6097752198));
        assert_eq!(config.draw_cooldown, Duration::hours(4));
        assert_eq!(config.session_ttl, Duration::minutes(30));
        assert_eq!(config.poll_timeout_secs, 30);
        assert!(config.require_token().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("FRUIT_CATALOG_PATH", "/data/fruits.json"),
            ("FRUIT_STORE_BACKEND", "redb"),
            ("FRUIT_STORE_PATH", "/data/ledger.redb"),
            ("FRUIT_OPERATOR_IDS", "7, 8"),
            ("FRUIT_DRAW_COOLDOWN_HOURS", "1"),
            ("FRUIT_SESSION_TTL_MINUTES", "5"),
            ("FRUIT_POLL_TIMEOUT_SECS", "10"),
        ])
        .unwrap();

        assert_eq!(config.require_token().unwrap(), "123:abc");
        assert_eq!(config.catalog_path, "/data/fruits.json");
        assert_eq!(config.store_backend, StoreBackend::Redb);
        assert_eq!(config.store_path.as_deref(), Some("/data/ledger.redb"));
        assert_eq!(config.operators.ids().collect::<Vec<_>>(), vec![7, 8]);
        assert!(!config.operators.is_operator(6097752198));
        assert_eq!(config.draw_cooldown, Duration::hours(1));
        assert_eq!(config.session_ttl, Duration::minutes(5));
        assert_eq!(config.poll_timeout_secs, 10);
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = config_from(&[("FRUIT_STORE_PATH", "  "), ("TELEGRAM_TOKEN", "")]).unwrap();
        assert_eq!(config.store_path, None);
        assert_eq!(config.telegram_token, None);
    }

    #[test]
    fn test_malformed_values_rejected() {
        assert!(config_from(&[("FRUIT_STORE_BACKEND", "sqlite")]).is_err());
        assert!(config_from(&[("FRUIT_OPERATOR_IDS", "admin")]).is_err());
        assert!(config_from(&[("FRUIT_DRAW_COOLDOWN_HOURS", "four")]).is_err());
        assert!(config_from(&[("FRUIT_DRAW_COOLDOWN_HOURS", "0")]).is_err());
        assert!(config_from(&[("FRUIT_POLL_TIMEOUT_SECS", "-1")]).is_err());
    }
}
