//! Database configuration.
//!
//! Settings come either from the environment (after loading `.env` with
//! `dotenvy`) or from a TOML file:
//!
//! ```toml
//! [database]
//! url = "postgres://${PGUSER}@localhost/jobly"
//! pool_max_size = 8
//!
//! [sql_log]
//! level = "info"
//! max_sql_length = 500
//! ```
//!
//! `${VAR}` references inside the file are expanded from the environment.

use crate::error::{JoblyError, JoblyResult};
use crate::trace::SqlLogConfig;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

const DEFAULT_POOL_MAX_SIZE: usize = 16;
const DEFAULT_MAX_SQL_LENGTH: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub database: DatabaseSection,
    #[serde(default)]
    pub sql_log: SqlLogSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqlLogSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_max_sql_length")]
    pub max_sql_length: usize,
}

impl Default for SqlLogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_sql_length: default_max_sql_length(),
        }
    }
}

fn default_pool_max_size() -> usize {
    DEFAULT_POOL_MAX_SIZE
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_max_sql_length() -> usize {
    DEFAULT_MAX_SQL_LENGTH
}

impl DbConfig {
    /// Read settings from the environment, loading `.env` first if present.
    ///
    /// - `DATABASE_URL` (required)
    /// - `JOBLY_POOL_MAX_SIZE` (default 16)
    /// - `JOBLY_SQL_LOG` tracing level for SQL events (default `debug`)
    /// - `JOBLY_SQL_MAX_LENGTH` (default 200)
    pub fn from_env() -> JoblyResult<Self> {
        dotenvy::dotenv().ok();

        let url = std::env::var("DATABASE_URL")
            .map_err(|_| JoblyError::Config("DATABASE_URL is not set".to_string()))?;

        let config = Self {
            database: DatabaseSection {
                url,
                pool_max_size: env_parse("JOBLY_POOL_MAX_SIZE")?
                    .unwrap_or(DEFAULT_POOL_MAX_SIZE),
            },
            sql_log: SqlLogSection {
                level: std::env::var("JOBLY_SQL_LOG").unwrap_or_else(|_| default_log_level()),
                max_sql_length: env_parse("JOBLY_SQL_MAX_LENGTH")?
                    .unwrap_or(DEFAULT_MAX_SQL_LENGTH),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> JoblyResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            JoblyError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(raw: &str) -> JoblyResult<Self> {
        let mut config: Self = toml::from_str(raw)
            .map_err(|e| JoblyError::Config(format!("failed to parse config: {e}")))?;
        config.database.url = expand_env_vars(&config.database.url)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> JoblyResult<()> {
        if self.database.url.trim().is_empty() {
            return Err(JoblyError::Config("database.url is empty".to_string()));
        }
        if self.database.pool_max_size == 0 {
            return Err(JoblyError::Config(
                "database.pool_max_size must be at least 1".to_string(),
            ));
        }
        self.sql_log_config()?;
        Ok(())
    }

    /// The SQL logging settings for [`crate::TracedClient`].
    pub fn sql_log_config(&self) -> JoblyResult<SqlLogConfig> {
        let level = tracing::Level::from_str(&self.sql_log.level).map_err(|_| {
            JoblyError::Config(format!("invalid sql_log.level '{}'", self.sql_log.level))
        })?;
        Ok(SqlLogConfig::new()
            .level(level)
            .max_sql_length(self.sql_log.max_sql_length))
    }

    /// Build a connection pool from these settings.
    #[cfg(feature = "pool")]
    pub fn create_pool(&self) -> JoblyResult<deadpool_postgres::Pool> {
        crate::pool::create_pool_with_config(&self.database.url, self.database.pool_max_size)
    }
}

fn env_parse<T: FromStr>(key: &str) -> JoblyResult<Option<T>> {
    match std::env::var(key) {
        Ok(v) => v
            .parse()
            .map(Some)
            .map_err(|_| JoblyError::Config(format!("invalid value for {key}: '{v}'"))),
        Err(_) => Ok(None),
    }
}

fn expand_env_vars(input: &str) -> JoblyResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                return Err(JoblyError::Config(format!(
                    "unterminated env var reference: ${{{key}}}"
                )));
            }
            if key.is_empty() {
                return Err(JoblyError::Config(
                    "invalid env var reference: ${}".to_string(),
                ));
            }

            let v = std::env::var(&key).map_err(|_| {
                JoblyError::Config(format!("missing env var for config expansion: {key}"))
            })?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}
