//! Transient-resilience wrappers around connection-scoped actions.
//!
//! The Rust analogue of extension methods on the connection factory: blanket
//! extension traits give every provider four entry points (sync/async ×
//! value/void), all thin adapters over the one retry loop in [`crate::retry`].
//!
//! Each attempt acquires a fresh connection, runs the action, and releases the
//! connection by scope before the failure is classified. The classifier turns
//! the provider's busy verdict into an explicit [`Decision`]: busy → retry,
//! anything else → wrapped as [`ResilienceError::Persistence`] and raised
//! without further attempts.

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::{ResilienceError, Result};
use crate::provider::{AsyncConnectionProvider, ConnectionProvider};
use crate::retry::{retry_async, retry_sync, Decision, RetryPolicy};

/// Busy → retry; everything else → fatal, wrapped once. Acquisition errors
/// take the same path as action errors: a pool-checkout timeout is exactly
/// the "connection limit reached" transient case.
fn classify_busy<P>(provider: &P, err: P::Error) -> Decision<P::Error>
where
    P: ConnectionProvider + ?Sized,
{
    if provider.is_transiently_busy(&err) {
        Decision::Retry(err)
    } else {
        Decision::Fatal(ResilienceError::Persistence { source: err })
    }
}

/// Synchronous wrapper shapes. Blanket-implemented for every
/// [`ConnectionProvider`].
pub trait HandleTransientErrors: ConnectionProvider {
    /// Run `action` against a freshly acquired connection, retrying the whole
    /// acquire-and-execute cycle per `policy` while the provider classifies
    /// the failure as transiently busy. The inter-attempt wait blocks the
    /// calling thread.
    fn handle_transient_errors<T, F>(&self, policy: RetryPolicy, action: F) -> Result<T, Self::Error>
    where
        F: FnMut(&mut Self::Connection) -> std::result::Result<T, Self::Error>,
    {
        let mut action = action;
        retry_sync(
            &policy,
            || {
                let mut conn = self.create()?;
                action(&mut conn)
            },
            |err| classify_busy(self, err),
        )
    }

    /// Void shape of [`Self::handle_transient_errors`]; same policy handling.
    fn handle_transient_errors_unit<F>(
        &self,
        policy: RetryPolicy,
        action: F,
    ) -> Result<(), Self::Error>
    where
        F: FnMut(&mut Self::Connection) -> std::result::Result<(), Self::Error>,
    {
        self.handle_transient_errors(policy, action)
    }
}

impl<P: ConnectionProvider> HandleTransientErrors for P {}

/// Asynchronous, cancellable wrapper shapes. Blanket-implemented for every
/// [`AsyncConnectionProvider`] usable across threads.
///
/// The action receives the connection by value (it is dropped, and thereby
/// released, when the action's future ends on any path) along with a clone of
/// the cancellation token to observe cooperatively. A token fired during
/// acquisition, the action, or the inter-attempt wait aborts the remaining
/// attempts with [`ResilienceError::Cancelled`].
#[async_trait]
pub trait HandleTransientErrorsAsync: AsyncConnectionProvider {
    async fn handle_transient_errors_async<T, F, Fut>(
        &self,
        token: CancellationToken,
        policy: RetryPolicy,
        action: F,
    ) -> Result<T, Self::Error>
    where
        T: Send,
        F: Fn(Self::Connection, CancellationToken) -> Fut + Send + Sync,
        Fut: Future<Output = std::result::Result<T, Self::Error>> + Send;

    /// Void shape; takes the same per-call policy as the other three shapes.
    async fn handle_transient_errors_unit_async<F, Fut>(
        &self,
        token: CancellationToken,
        policy: RetryPolicy,
        action: F,
    ) -> Result<(), Self::Error>
    where
        F: Fn(Self::Connection, CancellationToken) -> Fut + Send + Sync,
        Fut: Future<Output = std::result::Result<(), Self::Error>> + Send;
}

#[async_trait]
impl<P> HandleTransientErrorsAsync for P
where
    P: AsyncConnectionProvider + Sync,
    P::Connection: Send,
{
    async fn handle_transient_errors_async<T, F, Fut>(
        &self,
        token: CancellationToken,
        policy: RetryPolicy,
        action: F,
    ) -> Result<T, Self::Error>
    where
        T: Send,
        F: Fn(Self::Connection, CancellationToken) -> Fut + Send + Sync,
        Fut: Future<Output = std::result::Result<T, Self::Error>> + Send,
    {
        let action = &action;
        let token_ref = &token;
        retry_async(
            &policy,
            token_ref,
            move || {
                let token = token_ref.clone();
                async move {
                    let conn = self.create_async(&token).await?;
                    action(conn, token).await
                }
            },
            |err| classify_busy(self, err),
        )
        .await
    }

    async fn handle_transient_errors_unit_async<F, Fut>(
        &self,
        token: CancellationToken,
        policy: RetryPolicy,
        action: F,
    ) -> Result<(), Self::Error>
    where
        F: Fn(Self::Connection, CancellationToken) -> Fut + Send + Sync,
        Fut: Future<Output = std::result::Result<(), Self::Error>> + Send,
    {
        self.handle_transient_errors_async(token, policy, action)
            .await
    }
}
