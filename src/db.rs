use std::env::var;
use std::time::Duration;

use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedBoxFuture;
use diesel_async::{AsyncConnection, AsyncPgConnection, SimpleAsyncConnection};
use log::debug;

use crate::error::{DbError, Result};
use crate::services;
use crate::services::views::{self, MaterializedView};

pub type PgPool = Pool<AsyncPgConnection>;
pub type PooledConnection = Object<AsyncPgConnection>;

const DEFAULT_MAX_CONNECTIONS: usize = 10;
const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: usize,
    /// Upper bound for a single [`Database::with_tx`] call
    pub tx_timeout: Duration,
    /// Upper bound for one materialized view swap
    pub refresh_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            tx_timeout: DEFAULT_TX_TIMEOUT,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    /// Reads `DATABASE_URI` and the optional pool tuning variables.
    ///
    /// `.env` files are loaded by the binaries, not here.
    pub fn from_env() -> Result<Self> {
        let uri = var("DATABASE_URI")
            .map_err(|_| DbError::InvalidInput("DATABASE_URI must be set".to_string()))?;
        let mut config = Self::new(uri);
        if let Some(max) = parse_env::<usize>("DATABASE_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(secs) = parse_env::<u64>("DATABASE_TX_TIMEOUT_SECS")? {
            config.tx_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("DATABASE_REFRESH_TIMEOUT_SECS")? {
            config.refresh_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DbError::InvalidInput(format!("{name} has an invalid value `{raw}`"))),
        Err(_) => Ok(None),
    }
}

/// Owns the connection pool and hands out connections and transactions.
///
/// Single statement operations take any `&mut AsyncPgConnection`, pass them a pooled connection
/// from [`Database::conn`]. Multi statement operations must be given the connection of an open
/// transaction, usually the one passed into a [`Database::with_tx`] callback.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    config: DatabaseConfig,
}

impl Database {
    /// Builds the pool and checks out one connection to fail early on a bad uri
    pub async fn connect(config: DatabaseConfig) -> Result<Self> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.uri.clone());
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .build()
            .map_err(|e| DbError::Transport(e.to_string()))?;
        drop(pool.get().await?);
        Ok(Self { pool, config })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub async fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get().await?)
    }

    /// Runs `callback` inside a transaction which is committed when it returns `Ok` and rolled
    /// back otherwise.
    ///
    /// ```ignore
    /// db.with_tx(|tx| async move { panel_db::create_with_tx(tx, &panel).await }.scope_boxed())
    /// ```
    pub async fn with_tx<'a, R, F>(&self, callback: F) -> Result<R>
    where
        F: for<'r> FnOnce(&'r mut AsyncPgConnection) -> ScopedBoxFuture<'a, 'r, Result<R>>
            + Send
            + 'a,
        R: Send + 'a,
    {
        self.with_tx_timeout(self.config.tx_timeout, callback).await
    }

    /// Same as [`Database::with_tx`] with an explicit deadline. Dropping the transaction on
    /// expiry discards the connection, which aborts the statement and rolls back.
    pub async fn with_tx_timeout<'a, R, F>(&self, timeout: Duration, callback: F) -> Result<R>
    where
        F: for<'r> FnOnce(&'r mut AsyncPgConnection) -> ScopedBoxFuture<'a, 'r, Result<R>>
            + Send
            + 'a,
        R: Send + 'a,
    {
        let mut conn = self.conn().await?;
        let transaction = AsyncConnection::transaction::<R, DbError, _>(&mut *conn, callback);
        match tokio::time::timeout(timeout, transaction).await {
            Ok(res) => res,
            Err(_) => {
                debug!("Transaction exceeded {timeout:?}, rolling back");
                Err(DbError::Timeout(timeout))
            }
        }
    }

    /// Applies every table's DDL in foreign key order, then creates the materialized views
    pub async fn create_schema(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        for ddl in services::SCHEMAS.iter().flat_map(|area| area.iter()) {
            conn.batch_execute(ddl).await?;
        }
        for view in self.views() {
            conn.batch_execute(&view.schema()).await?;
        }
        Ok(())
    }

    /// Every materialized view managed here, in the order the refresher should rebuild them
    pub fn views(&self) -> impl Iterator<Item = &'static dyn MaterializedView> {
        views::ALL.iter().copied()
    }

    /// Rebuilds `view` with the atomic swap protocol under [`DatabaseConfig::refresh_timeout`]
    pub async fn refresh_view(&self, view: &'static dyn MaterializedView) -> Result<()> {
        let mut conn = self.conn().await?;
        let timeout = self.config.refresh_timeout;
        match tokio::time::timeout(timeout, views::refresh(&mut conn, view)).await {
            Ok(res) => res,
            Err(_) => Err(DbError::Timeout(timeout)),
        }
    }
}
