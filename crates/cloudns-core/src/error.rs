//! Error types for cloudns
//!
//! This module defines all error types used throughout the crate, and the
//! retryable/fatal classification the [`RetryPolicy`](crate::RetryPolicy) relies on.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for cloudns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Gateway operation an error occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Reading the current record set
    ListAddresses,
    /// Submitting a change request
    SubmitChange,
    /// Polling a submitted change for completion
    PollStatus,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ListAddresses => "list addresses",
            Operation::SubmitChange => "submit change",
            Operation::PollStatus => "poll change status",
        };
        f.write_str(name)
    }
}

/// Core error type for cloudns
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing credentials, zone, project)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input (domain, addresses)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport errors talking to the provider (connect, timeout, 5xx)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The provider rejected a change because the record moved underneath it
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// A submitted change did not commit within the propagation timeout
    #[error("Change {change_id} still pending after {waited:?}")]
    PropagationTimeout {
        /// Provider change identifier
        change_id: String,
        /// How long the reconciler waited
        waited: Duration,
    },

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// An error annotated with the domain and gateway operation it came from
    #[error("{operation} failed for {domain}: {source}")]
    Reconcile {
        /// Domain being reconciled
        domain: String,
        /// Gateway operation that failed
        operation: Operation,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Attach domain and operation context to an error
    pub fn reconcile(domain: impl Into<String>, operation: Operation, source: Error) -> Self {
        Self::Reconcile {
            domain: domain.into(),
            operation,
            source: Box::new(source),
        }
    }

    /// Whether the [`RetryPolicy`](crate::RetryPolicy) may re-run the failed attempt
    ///
    /// Transport, authentication, conflict and rate-limit failures are
    /// retryable. Anything that happened after a change was accepted
    /// (polling, timeout, cancellation) is not: re-running the attempt
    /// would submit the change a second time.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_)
            | Error::Authentication(_)
            | Error::RateLimited(_)
            | Error::Conflict(_) => true,
            Error::Reconcile {
                operation: Operation::PollStatus,
                ..
            } => false,
            Error::Reconcile { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Whether this error was caused by configuration or caller input
    pub fn is_config(&self) -> bool {
        match self {
            Error::Config(_) | Error::InvalidInput(_) => true,
            Error::Reconcile { source, .. } => source.is_config(),
            _ => false,
        }
    }
}
