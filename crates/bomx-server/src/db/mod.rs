//! Relational source access
//!
//! Opens one dedicated connection to the relational source per job
//! invocation, with bounded retries on establishment, and exposes the two
//! query strategies the artifact catalog uses: literal SQL text and named
//! set-returning procedures parameterized by version. Query failures are
//! terminal for the invocation; only connection establishment is retried.

use std::fmt::Display;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SourceDbConfig;

pub mod retry;
pub mod row;

pub use retry::RetryPolicy;
pub use row::{SqlRow, SqlValue};

/// Relational source errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Could not establish a connection within the retry budget. Terminal;
    /// no outer layer retries it.
    #[error("could not connect to the relational source after {attempts} attempts: {message}")]
    Connect { attempts: u32, message: String },

    /// A query or procedure call failed. Never retried.
    #[error("source query failed: {0}")]
    Query(String),
}

/// Opens connections to the relational source.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn SourceConnection>, SourceError>;
}

/// One exclusively-owned connection, opened and closed within a single
/// invocation's lifetime.
#[async_trait]
pub trait SourceConnection: Send {
    /// Run literal SQL text and collect the full result set.
    async fn fetch_query(&mut self, sql: &str) -> Result<Vec<SqlRow>, SourceError>;

    /// Call a named set-returning procedure with the version parameter.
    async fn fetch_procedure(&mut self, name: &str, version: &str)
        -> Result<Vec<SqlRow>, SourceError>;

    /// Best-effort close. Failures are logged, never propagated, so that
    /// closing cannot mask the invocation's primary result.
    async fn close(&mut self);
}

/// Run the open-and-verify step through the retry policy.
///
/// `open` receives the 1-based attempt number and must leave no dangling
/// handle behind when it fails. Exhausting the budget yields a terminal
/// [`SourceError::Connect`] carrying the last failure.
pub async fn connect_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut open: F,
) -> Result<T, SourceError>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match open(attempt).await {
            Ok(conn) => return Ok(conn),
            Err(err) => match policy.next_delay(attempt) {
                Some(delay) => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "source connection attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(SourceError::Connect {
                        attempts: attempt,
                        message: err.to_string(),
                    });
                }
            },
        }
    }
}

/// sqlx-backed connector against the Postgres relational source.
pub struct SqlSourceConnector {
    config: SourceDbConfig,
    policy: RetryPolicy,
}

impl SqlSourceConnector {
    pub fn new(config: SourceDbConfig) -> Self {
        let policy = RetryPolicy::new(
            config.max_attempts,
            Duration::from_secs(config.retry_step_secs),
        );
        Self { config, policy }
    }

    /// Open and verify one connection. The statement timeout bounds every
    /// query issued on the connection server-side.
    async fn try_open(&self) -> Result<PgConnection, sqlx::Error> {
        let options = PgConnectOptions::from_str(&self.config.url)?.options([(
            "statement_timeout",
            format!("{}s", self.config.query_timeout_secs),
        )]);

        let mut conn = tokio::time::timeout(
            Duration::from_secs(self.config.connect_timeout_secs),
            PgConnection::connect_with(&options),
        )
        .await
        .map_err(|_| sqlx::Error::PoolTimedOut)??;

        if let Err(e) = conn.ping().await {
            // drop the half-open handle before reporting the failure
            let _ = conn.close().await;
            return Err(e);
        }

        Ok(conn)
    }
}

#[async_trait]
impl SourceConnector for SqlSourceConnector {
    async fn connect(&self) -> Result<Box<dyn SourceConnection>, SourceError> {
        let conn = connect_with_retry(&self.policy, |attempt| {
            debug!(attempt, "connecting to relational source");
            self.try_open()
        })
        .await?;

        info!("relational source connection established");
        Ok(Box::new(PgSourceConnection { conn: Some(conn) }))
    }
}

/// A live Postgres connection wrapped for the executor.
pub struct PgSourceConnection {
    conn: Option<PgConnection>,
}

impl PgSourceConnection {
    fn conn(&mut self) -> Result<&mut PgConnection, SourceError> {
        self.conn
            .as_mut()
            .ok_or_else(|| SourceError::Query("connection already closed".to_string()))
    }
}

#[async_trait]
impl SourceConnection for PgSourceConnection {
    async fn fetch_query(&mut self, sql: &str) -> Result<Vec<SqlRow>, SourceError> {
        let conn = self.conn()?;
        let rows = sqlx::query(sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| SourceError::Query(e.to_string()))?;
        Ok(rows.iter().map(SqlRow::from_pg_row).collect())
    }

    async fn fetch_procedure(
        &mut self,
        name: &str,
        version: &str,
    ) -> Result<Vec<SqlRow>, SourceError> {
        let conn = self.conn()?;
        // procedure names come from the static catalog, never from callers
        let sql = format!("SELECT * FROM {}($1)", name);
        let rows = sqlx::query(&sql)
            .bind(version)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| SourceError::Query(e.to_string()))?;
        Ok(rows.iter().map(SqlRow::from_pg_row).collect())
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                warn!(error = %e, "failed to close source connection");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_connect_with_retry_stops_at_budget() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), SourceError> = connect_with_retry(&policy, move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("connection refused")
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        match result {
            Err(SourceError::Connect { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert!(message.contains("connection refused"));
            }
            other => panic!("expected terminal connect error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_with_retry_recovers_mid_budget() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = connect_with_retry(&policy, move |attempt| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err("transient")
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
