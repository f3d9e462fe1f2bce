//! Pooled SQLite provider.
//!
//! Reference [`ConnectionProvider`] implementation over Diesel + r2d2. Busy
//! classification covers the two transient cases SQLite actually produces:
//! a pool checkout timing out (connection limit reached) and a statement
//! failing with `database is locked`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use diesel::sqlite::SqliteConnection;
use diesel::RunQueryDsl;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::provider::{AsyncConnectionProvider, ConnectionProvider};

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;
pub type SqlitePooledConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Errors produced by the SQLite provider, covering both acquisition and
/// statement execution. This is the error type the wrapper classifies.
#[derive(Error, Debug)]
pub enum SqliteError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("query failed: {0}")]
    Query(#[from] DieselError),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Build a pool over the given database path with the usual connection
/// PRAGMAs applied on every checkout.
pub fn create_pool(db_path: &str, max_size: u32) -> Result<Arc<SqlitePool>, SqliteError> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    let pool = Pool::builder()
        .max_size(max_size)
        .connection_timeout(Duration::from_secs(30))
        .connection_customizer(Box::new(SqliteCustomizer))
        .build(manager)?;
    Ok(Arc::new(pool))
}

#[derive(Debug)]
struct SqliteCustomizer;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqliteCustomizer {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<(), diesel::r2d2::Error> {
        diesel::sql_query(
            "PRAGMA foreign_keys = ON;\n             PRAGMA busy_timeout = 30000;\n             PRAGMA synchronous = NORMAL;",
        )
        .execute(conn)
        .map_err(diesel::r2d2::Error::QueryError)?;
        Ok(())
    }
}

/// Shared, clonable provider handing out pooled connections.
#[derive(Clone)]
pub struct SqliteProvider {
    pool: Arc<SqlitePool>,
}

impl SqliteProvider {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ConnectionProvider for SqliteProvider {
    type Connection = SqlitePooledConnection;
    type Error = SqliteError;

    fn create(&self) -> Result<SqlitePooledConnection, SqliteError> {
        Ok(self.pool.get()?)
    }

    fn is_transiently_busy(&self, error: &SqliteError) -> bool {
        match error {
            // Checkout timed out: every pooled connection is in use.
            SqliteError::Pool(_) => true,
            SqliteError::Query(DieselError::DatabaseError(_, info)) => {
                let message = info.message();
                message.contains("database is locked")
                    || message.contains("database table is locked")
            }
            _ => false,
        }
    }
}

#[async_trait]
impl AsyncConnectionProvider for SqliteProvider {
    async fn create_async(
        &self,
        _token: &CancellationToken,
    ) -> Result<SqlitePooledConnection, SqliteError> {
        // Diesel checkouts are blocking; keep them off the async workers. The
        // retry loop races this future against the token.
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || pool.get().map_err(SqliteError::Pool)).await?
    }
}
