use std::time::Duration;

use crate::error::{EngineError, Result};

pub const DEFAULT_DELAY_MS: u64 = 1500;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Settings for the simulated external recommendation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub delay: Duration,
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl EngineConfig {
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let delay_ms = parse_var(&lookup, "RECOMMENDATION_DELAY_MS", DEFAULT_DELAY_MS)?;
        let timeout_ms = parse_var(&lookup, "RECOMMENDATION_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        if timeout_ms == 0 {
            return Err(EngineError::Config(
                "RECOMMENDATION_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }
        let max_connections =
            parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|value| !value.trim().is_empty()),
            max_connections: max_connections.max(1),
            engine: EngineConfig {
                delay: Duration::from_millis(delay_ms),
                timeout: Duration::from_millis(timeout_ms),
            },
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            EngineError::Config("DATABASE_URL must be set to a Postgres instance".to_string())
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| EngineError::Config(format!("{key} has an invalid value '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/ays"),
            ("RECOMMENDATION_DELAY_MS", "0"),
            ("RECOMMENDATION_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.engine.delay, Duration::ZERO);
        assert_eq!(config.engine.timeout, Duration::from_millis(250));
        assert_eq!(config.require_database_url().unwrap(), "postgres://localhost/ays");
    }

    #[test]
    fn rejects_malformed_values() {
        let err = AppConfig::from_lookup(lookup_from(&[("RECOMMENDATION_DELAY_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("RECOMMENDATION_DELAY_MS"));
        assert!(
            AppConfig::from_lookup(lookup_from(&[("RECOMMENDATION_TIMEOUT_MS", "0")])).is_err()
        );
    }
}
