//! Engine configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. The vault key has no default: without it the engine must not
//! start.
//!
//! | Variable                    | Default       |
//! |-----------------------------|---------------|
//! | `RESALE_DATABASE_PATH`      | `./resale.db` |
//! | `RESALE_MAX_CONNECTIONS`    | `5`           |
//! | `RESALE_ORDER_PREFIX`       | `PH`          |
//! | `RESALE_ORDER_ID_ATTEMPTS`  | `3`           |
//! | `RESALE_STORAGE_TIMEOUT_MS` | `5000`        |
//! | `RESALE_VAULT_KEY`          | required      |

use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use resale_core::validation::validate_order_prefix;
use resale_core::{DEFAULT_ORDER_ID_ATTEMPTS, DEFAULT_ORDER_PREFIX};

pub const ENV_DATABASE_PATH: &str = "RESALE_DATABASE_PATH";
pub const ENV_MAX_CONNECTIONS: &str = "RESALE_MAX_CONNECTIONS";
pub const ENV_ORDER_PREFIX: &str = "RESALE_ORDER_PREFIX";
pub const ENV_ORDER_ID_ATTEMPTS: &str = "RESALE_ORDER_ID_ATTEMPTS";
pub const ENV_STORAGE_TIMEOUT_MS: &str = "RESALE_STORAGE_TIMEOUT_MS";
pub const ENV_VAULT_KEY: &str = "RESALE_VAULT_KEY";

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Prefix for generated order ids
    pub order_prefix: String,

    /// Attempts at inserting a purchase before giving up with a conflict
    pub max_order_id_attempts: u32,

    /// Upper bound on every storage call
    pub storage_timeout: Duration,

    /// Base64 of the 32-byte vault key
    pub vault_key: SecretString,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = EngineConfig {
            database_path: lookup(ENV_DATABASE_PATH)
                .unwrap_or_else(|| "./resale.db".to_string())
                .into(),

            max_connections: parse_or(&lookup, ENV_MAX_CONNECTIONS, 5)?,

            order_prefix: lookup(ENV_ORDER_PREFIX)
                .unwrap_or_else(|| DEFAULT_ORDER_PREFIX.to_string()),

            max_order_id_attempts: parse_or(&lookup, ENV_ORDER_ID_ATTEMPTS, DEFAULT_ORDER_ID_ATTEMPTS)?,

            storage_timeout: Duration::from_millis(parse_or(&lookup, ENV_STORAGE_TIMEOUT_MS, 5000)?),

            vault_key: lookup(ENV_VAULT_KEY)
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::new)
                .ok_or_else(|| ConfigError::MissingRequired(ENV_VAULT_KEY.to_string()))?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(ENV_MAX_CONNECTIONS.to_string()));
        }

        if config.max_order_id_attempts == 0 {
            return Err(ConfigError::InvalidValue(ENV_ORDER_ID_ATTEMPTS.to_string()));
        }

        if validate_order_prefix(&config.order_prefix).is_err() {
            return Err(ConfigError::InvalidValue(ENV_ORDER_PREFIX.to_string()));
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const KEY: &str = "BwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwc=";

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[(ENV_VAULT_KEY, KEY)])).unwrap();

        assert_eq!(config.database_path, PathBuf::from("./resale.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.order_prefix, "PH");
        assert_eq!(config.max_order_id_attempts, 3);
        assert_eq!(config.storage_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            (ENV_VAULT_KEY, KEY),
            (ENV_DATABASE_PATH, "/var/lib/resale/ledger.db"),
            (ENV_ORDER_PREFIX, "SUB"),
            (ENV_ORDER_ID_ATTEMPTS, "5"),
            (ENV_STORAGE_TIMEOUT_MS, "250"),
        ]))
        .unwrap();

        assert_eq!(config.order_prefix, "SUB");
        assert_eq!(config.max_order_id_attempts, 5);
        assert_eq!(config.storage_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_missing_vault_key() {
        let result = EngineConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::MissingRequired(name)) if name == ENV_VAULT_KEY));

        let result = EngineConfig::from_lookup(lookup_from(&[(ENV_VAULT_KEY, "  ")]));
        assert!(matches!(result, Err(ConfigError::MissingRequired(_))));
    }

    #[test]
    fn test_invalid_values() {
        let result = EngineConfig::from_lookup(lookup_from(&[
            (ENV_VAULT_KEY, KEY),
            (ENV_STORAGE_TIMEOUT_MS, "soon"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(name)) if name == ENV_STORAGE_TIMEOUT_MS));

        let result = EngineConfig::from_lookup(lookup_from(&[
            (ENV_VAULT_KEY, KEY),
            (ENV_ORDER_ID_ATTEMPTS, "0"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));

        let result = EngineConfig::from_lookup(lookup_from(&[
            (ENV_VAULT_KEY, KEY),
            (ENV_ORDER_PREFIX, "P-H"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }
}
