//! Error types surfaced by the resilience layer.
//!
//! Callers never see a raw provider error directly: every failure leaves the
//! retry loop as one of the [`ResilienceError`] variants, with the original
//! provider error preserved as the `source`.

use thiserror::Error;

/// Result alias for wrapper and executor calls, generic over the provider's
/// error type.
pub type Result<T, E> = std::result::Result<T, ResilienceError<E>>;

/// Terminal outcome of a retried database operation.
#[derive(Error, Debug)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// The error was not classified as transient. Raised on the first
    /// occurrence, without retrying.
    #[error("persistence operation failed: {source}")]
    Persistence {
        #[source]
        source: E,
    },

    /// Every attempt failed with a transient error. Carries the error from
    /// the last attempt.
    #[error("database still busy after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    /// The cancellation token fired during acquisition, the action, or the
    /// inter-attempt wait. Async shapes only.
    #[error("operation cancelled")]
    Cancelled,
}

impl<E> ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// True when the failure came from cancellation rather than the database.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResilienceError::Cancelled)
    }

    /// Number of attempts consumed, for the exhaustion case.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ResilienceError::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// The underlying provider error, when there is one.
    pub fn into_inner(self) -> Option<E> {
        match self {
            ResilienceError::Persistence { source } => Some(source),
            ResilienceError::RetriesExhausted { source, .. } => Some(source),
            ResilienceError::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Error, Debug)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_persistence_preserves_source() {
        let err: ResilienceError<Boom> = ResilienceError::Persistence { source: Boom };
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_cancelled());
        assert!(err.attempts().is_none());
        assert!(err.into_inner().is_some());
    }

    #[test]
    fn test_exhausted_reports_attempts() {
        let err: ResilienceError<Boom> = ResilienceError::RetriesExhausted {
            attempts: 10,
            source: Boom,
        };
        assert_eq!(err.attempts(), Some(10));
        assert_eq!(err.to_string(), "database still busy after 10 attempts: boom");
    }

    #[test]
    fn test_cancelled_has_no_inner() {
        let err: ResilienceError<Boom> = ResilienceError::Cancelled;
        assert!(err.is_cancelled());
        assert!(err.into_inner().is_none());
    }
}
