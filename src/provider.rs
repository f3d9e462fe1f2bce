//! Connection provider traits.
//!
//! A provider is the narrow interface this crate requires from whatever owns
//! the actual connections (a pool, a factory, a test double): acquire a fresh
//! connection, and classify a caught error as transiently busy or not.
//! Release is `Drop` — pooled connections return to their pool when the
//! per-attempt scope ends.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Synchronous connection acquisition plus busy classification.
pub trait ConnectionProvider {
    type Connection;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Acquire a fresh connection. Called once per attempt; connections are
    /// never reused across attempts.
    fn create(&self) -> Result<Self::Connection, Self::Error>;

    /// Classify a caught error: `true` means the database is temporarily
    /// unavailable (busy, timed out, over the connection limit) and the
    /// attempt is worth retrying after a short wait.
    fn is_transiently_busy(&self, error: &Self::Error) -> bool;
}

/// Asynchronous acquisition for providers that can also be used from async
/// contexts. Shares the connection type, error type, and classifier with
/// [`ConnectionProvider`].
#[async_trait]
pub trait AsyncConnectionProvider: ConnectionProvider {
    /// Acquire a fresh connection without blocking the calling task. The
    /// token is advisory: implementations should observe it where they can,
    /// and the retry loop additionally races every acquisition against it.
    async fn create_async(
        &self,
        token: &CancellationToken,
    ) -> Result<Self::Connection, Self::Error>;
}
