// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::warn;

const DEFAULT_DATABASE_URL: &str = "sqlite://database/taskmatrix.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Settings for the SQLite store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Insert the illustrative tasks when the database is seeded for the first time.
    pub seed_sample_tasks: bool,
}

impl DatabaseConfig {
    /// A private in-memory database. A single connection keeps every query
    /// on the same database for the lifetime of the pool.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            seed_sample_tasks: false,
        }
    }
}

impl DatabaseConfig {
    /// True for `sqlite::memory:` style URLs. Such a database lives only as long
    /// as a connection to it stays open.
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            seed_sample_tasks: true,
        }
    }
}

/// Server configuration, read from `TASKMATRIX_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut database = DatabaseConfig {
            url: lookup("TASKMATRIX_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_connections: parse_or(
                "TASKMATRIX_MAX_CONNECTIONS",
                &lookup,
                DEFAULT_MAX_CONNECTIONS,
            )?,
            seed_sample_tasks: parse_or("TASKMATRIX_SEED_SAMPLE_TASKS", &lookup, true)?,
        };
        anyhow::ensure!(
            database.max_connections > 0,
            "TASKMATRIX_MAX_CONNECTIONS must be at least 1"
        );
        if database.is_in_memory() && database.max_connections > 1 {
            warn!(
                "In-memory database {} is limited to a single connection (requested {}).",
                database.url, database.max_connections
            );
            database.max_connections = 1;
        }

        let bind_addr =
            lookup("TASKMATRIX_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("Invalid TASKMATRIX_BIND_ADDR: {bind_addr}"))?;

        Ok(Self { database, bind_addr })
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database, DatabaseConfig::default());
        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse().unwrap());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("TASKMATRIX_DATABASE_URL", "sqlite://tmp/test.db"),
            ("TASKMATRIX_MAX_CONNECTIONS", "2"),
            ("TASKMATRIX_SEED_SAMPLE_TASKS", "false"),
            ("TASKMATRIX_BIND_ADDR", "127.0.0.1:8080"),
        ]))
        .unwrap();

        assert_eq!(config.database.url, "sqlite://tmp/test.db");
        assert_eq!(config.database.max_connections, 2);
        assert!(!config.database.seed_sample_tasks);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn test_in_memory_url_uses_a_single_connection() {
        let config = Config::from_lookup(lookup_from(&[
            ("TASKMATRIX_DATABASE_URL", "sqlite::memory:"),
            ("TASKMATRIX_MAX_CONNECTIONS", "8"),
        ]))
        .unwrap();
        assert!(config.database.is_in_memory());
        assert_eq!(config.database.max_connections, 1);

        let defaulted = Config::from_lookup(lookup_from(&[(
            "TASKMATRIX_DATABASE_URL",
            "sqlite::memory:",
        )]))
        .unwrap();
        assert_eq!(defaulted.database.max_connections, 1);

        assert!(!DatabaseConfig::default().is_in_memory());
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = Config::from_lookup(lookup_from(&[("TASKMATRIX_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("TASKMATRIX_MAX_CONNECTIONS"));

        assert!(Config::from_lookup(lookup_from(&[("TASKMATRIX_MAX_CONNECTIONS", "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("TASKMATRIX_BIND_ADDR", "nowhere")])).is_err());
    }
}
