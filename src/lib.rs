//! Transient-error resilience for pooled database connections.
//!
//! Databases fail in two very different ways: transiently (busy, timed out,
//! over the connection limit — gone after a short wait) and persistently
//! (bad SQL, broken schema, violated constraint). This crate wraps a
//! connection-scoped action so that transient failures are retried with a
//! fresh connection per attempt, while everything else is wrapped once and
//! surfaced immediately.
//!
//! # Architecture
//!
//! ```text
//! caller action
//!       │
//!       ▼
//! resilience (4 wrapper shapes: sync/async × value/void)
//!       │
//!       ▼
//! retry (one bounded loop, constant delay, explicit Decision)
//!       │
//!       ▼
//! provider trait ──── sqlite (Diesel + r2d2 reference provider)
//! ```
//!
//! The retry policy is deliberately flat: a bounded attempt count (default
//! 10) and a constant wait (default 100 ms), both overridable per call. No
//! backoff growth, no jitter, no circuit breaking.
//!
//! # Example
//!
//! ```no_run
//! use db_resilience::{create_pool, HandleTransientErrors, RetryPolicy, SqliteError, SqliteProvider};
//! use diesel::RunQueryDsl;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("app.db", 8)?;
//! let provider = SqliteProvider::new(pool);
//!
//! let rows = provider.handle_transient_errors(RetryPolicy::default(), |conn| {
//!     diesel::sql_query("UPDATE accounts SET active = 1")
//!         .execute(conn)
//!         .map_err(SqliteError::from)
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod provider;
pub mod resilience;
pub mod retry;
pub mod sqlite;

pub use errors::{ResilienceError, Result};
pub use provider::{AsyncConnectionProvider, ConnectionProvider};
pub use resilience::{HandleTransientErrors, HandleTransientErrorsAsync};
pub use retry::{retry_async, retry_sync, Decision, RetryPolicy, DEFAULT_TRY_COUNT, DEFAULT_WAIT};
pub use sqlite::{create_pool, SqliteError, SqlitePool, SqlitePooledConnection, SqliteProvider};
