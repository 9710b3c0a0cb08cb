//! Caller-facing record engine
//!
//! The RecordEngine is responsible for:
//! - Validating operator input into a [`DomainTarget`]
//! - Running reconciliation attempts under the [`RetryPolicy`]
//! - Exposing a cancellation handle for the whole run
//!
//! ## Architecture
//!
//! ```text
//!   add / remove
//!        │
//!        ▼
//! ┌──────────────┐     retryable error     ┌──────────────┐
//! │ RecordEngine │ ──────────────────────▶ │ RetryPolicy  │
//! └──────────────┘ ◀────── re-run ──────── └──────────────┘
//!        │
//!        ▼
//! ┌──────────────┐   list / submit / poll  ┌──────────────┐
//! │  Reconciler  │ ──────────────────────▶ │  DnsGateway  │
//! └──────────────┘                         └──────────────┘
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{ProviderConfig, RetryConfig};
use crate::error::Result;
use crate::reconciler::{ChangeOutcome, DomainTarget, Intent, Reconciler};
use crate::retry::RetryPolicy;
use crate::traits::DnsGateway;

/// Adds and removes addresses on one domain's address record
///
/// ## Lifecycle
///
/// 1. Create with [`RecordEngine::new()`]
/// 2. Optionally grab [`RecordEngine::cancellation_token()`] to stop early
/// 3. Call [`RecordEngine::add()`] or [`RecordEngine::remove()`]
pub struct RecordEngine {
    reconciler: Reconciler,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl RecordEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `gateway`: DNS gateway implementation
    /// - `provider`: Provider configuration (TTL, record type, timing)
    /// - `retry`: Retry configuration
    pub fn new(
        gateway: Arc<dyn DnsGateway>,
        provider: &ProviderConfig,
        retry: &RetryConfig,
    ) -> Result<Self> {
        provider.validate()?;
        retry.validate()?;

        Ok(Self {
            reconciler: Reconciler::new(gateway, provider),
            retry: RetryPolicy::from_config(retry),
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops the engine before it submits a change, between
    /// attempts, or while it waits for a change to commit
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Bind `addresses` to `domain`, keeping the addresses already bound
    pub async fn add<I, S>(&self, domain: &str, addresses: I) -> Result<ChangeOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target = DomainTarget::new(domain, addresses, Intent::Add)?;
        self.apply(&target).await
    }

    /// Unbind `addresses` from `domain`, keeping the rest
    pub async fn remove<I, S>(&self, domain: &str, addresses: I) -> Result<ChangeOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target = DomainTarget::new(domain, addresses, Intent::Remove)?;
        self.apply(&target).await
    }

    /// Reconcile a prepared target, retrying transient failures
    ///
    /// Failures are returned to the caller, not logged here.
    pub async fn apply(&self, target: &DomainTarget) -> Result<ChangeOutcome> {
        info!(
            "{:?} {} on {} via {}",
            target.intent(),
            target.delta(),
            target.domain(),
            self.reconciler.gateway().provider_name()
        );

        self.retry
            .run_until_cancelled(&self.cancel, || {
                self.reconciler.apply(target, &self.cancel)
            })
            .await
    }
}
