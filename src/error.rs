//! Tracker error types

use thiserror::Error;

/// Errors surfaced by the account balance tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Stop-polling was called without a token.
    #[error("polling token required")]
    MissingPollingToken,

    /// The token matches no outstanding subscription (unknown, already
    /// redeemed, or cleared by a stop-all).
    #[error("polling token not found")]
    UnknownPollingToken,

    /// Network registry lookup failed; passed through unchanged.
    #[error(transparent)]
    Registry(anyhow::Error),

    /// An RPC call failed during a refresh cycle. Not retried here; retry
    /// and backoff belong to the caller or the provider.
    #[error("upstream rpc failure: {0:#}")]
    Upstream(anyhow::Error),
}
