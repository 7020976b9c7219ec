//! Runtime configuration from environment (a `.env` file is honored by the server binary).

use crate::error::ConfigError;
use regex::Regex;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/school";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SCHEMA: &str = "school";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Which `DocumentStore` implementation backs the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local store; data is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    /// PostgreSQL schema holding one table per collection.
    pub schema: String,
    pub body_limit: usize,
    pub backend: StoreBackend,
}

impl AppConfig {
    /// Load from process environment; unset variables fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let bind_addr = parse_var("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR)?;
        let max_connections = parse_var(
            "DB_MAX_CONNECTIONS",
            get("DB_MAX_CONNECTIONS"),
            &DEFAULT_MAX_CONNECTIONS.to_string(),
        )?;
        let body_limit = parse_var("BODY_LIMIT_BYTES", get("BODY_LIMIT_BYTES"), &DEFAULT_BODY_LIMIT.to_string())?;
        let schema = get("SCHOOL_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.into());
        validate_schema_name(&schema)?;
        let backend = match get("STORE_BACKEND") {
            Some(v) => v.parse()?,
            None => StoreBackend::Postgres,
        };

        Ok(AppConfig {
            database_url,
            bind_addr,
            max_connections,
            schema,
            body_limit,
            backend,
        })
    }
}

fn parse_var<T>(key: &'static str, value: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = value.unwrap_or_else(|| {
        tracing::debug!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
        key,
        message: e.to_string(),
    })
}

/// Schema names are interpolated into DDL, so only plain identifiers are accepted.
pub fn validate_schema_name(name: &str) -> Result<(), ConfigError> {
    let re = Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").map_err(|e| ConfigError::InvalidSchema(e.to_string()))?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidSchema(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.bind_addr.port(), 3000);
        assert_eq!(cfg.schema, "school");
        assert_eq!(cfg.backend, StoreBackend::Postgres);
        assert_eq!(cfg.body_limit, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn reads_overrides() {
        let cfg = load(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("DB_MAX_CONNECTIONS", "12"),
            ("STORE_BACKEND", "memory"),
            ("SCHOOL_SCHEMA", "academics"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.max_connections, 12);
        assert_eq!(cfg.backend, StoreBackend::Memory);
        assert_eq!(cfg.schema, "academics");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("DB_MAX_CONNECTIONS", "many")]),
            Err(ConfigError::InvalidVar { key: "DB_MAX_CONNECTIONS", .. })
        ));
        assert!(matches!(load(&[("SCHOOL_SCHEMA", "drop table;")]), Err(ConfigError::InvalidSchema(_))));
        assert!(matches!(load(&[("STORE_BACKEND", "mongo")]), Err(ConfigError::UnknownBackend(_))));
    }
}
