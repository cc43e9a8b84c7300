//! SQL logging via `tracing`.
//!
//! [`TracedClient`] wraps any [`GenericClient`] and emits one event per
//! statement on the `jobly.sql` target. Model operations pass a tag such as
//! `job.update` so the events can be told apart.

use crate::client::GenericClient;
use crate::error::JoblyResult;
use std::time::Instant;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use tracing::Level;

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            Level::TRACE => tracing::trace!($($field)*),
        }
    };
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// How statements are logged.
#[derive(Debug, Clone)]
pub struct SqlLogConfig {
    /// Tracing event level for successful statements. Failures always log at WARN.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogConfig {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl SqlLogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

/// A client wrapper that logs every statement it runs.
///
/// ```ignore
/// let conn = pool.get().await?;
/// let traced = TracedClient::new(&conn);
/// let job = Job::get(&traced, 1).await?;
/// ```
pub struct TracedClient<C> {
    client: C,
    config: SqlLogConfig,
}

impl<C: GenericClient> TracedClient<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            config: SqlLogConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SqlLogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SqlLogConfig {
        &self.config
    }

    /// Get a reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.client
    }

    /// Get the inner client, consuming this wrapper.
    pub fn into_inner(self) -> C {
        self.client
    }

    fn log<T>(
        &self,
        tag: &str,
        sql: &str,
        params: usize,
        started: Instant,
        result: &JoblyResult<T>,
        rows: impl FnOnce(&T) -> u64,
    ) {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let sql = self.config.truncate_sql(sql);
        match result {
            Ok(value) => {
                let rows = rows(value);
                emit_at_level!(
                    self.config.level,
                    target: "jobly.sql",
                    tag,
                    params,
                    rows,
                    elapsed_ms,
                    "{}", sql
                )
            }
            Err(error) => tracing::warn!(
                target: "jobly.sql",
                tag,
                params,
                elapsed_ms,
                %error,
                "{}", sql
            ),
        }
    }
}

impl<C: GenericClient> GenericClient for TracedClient<C> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> JoblyResult<Vec<Row>> {
        self.query_tagged("-", sql, params).await
    }

    async fn query_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> JoblyResult<Vec<Row>> {
        let started = Instant::now();
        let result = self.client.query_tagged(tag, sql, params).await;
        self.log(tag, sql, params.len(), started, &result, |rows| rows.len() as u64);
        result
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> JoblyResult<u64> {
        self.execute_tagged("-", sql, params).await
    }

    async fn execute_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> JoblyResult<u64> {
        let started = Instant::now();
        let result = self.client.execute_tagged(tag, sql, params).await;
        self.log(tag, sql, params.len(), started, &result, |affected| *affected);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql_bytes("héllo", 2), "h");
    }

    #[test]
    fn truncation_is_configurable() {
        let sql = "SELECT id, title, salary, equity FROM jobs";
        assert_eq!(SqlLogConfig::new().max_sql_length(6).truncate_sql(sql), "SELECT...");
        assert_eq!(SqlLogConfig::new().no_truncate().truncate_sql(sql), sql);
    }
}
