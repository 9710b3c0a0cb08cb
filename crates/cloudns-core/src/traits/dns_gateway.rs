// # DNS Gateway Trait
//
// Defines the interface the reconciler uses to talk to a DNS provider.
//
// ## Implementations
//
// - Google Cloud DNS: `cloudns-provider-googledns` crate
//
// ## Usage
//
// ```rust,ignore
// use cloudns_core::{ChangeRequest, DnsGateway};
//
// async fn replace(gateway: &dyn DnsGateway) -> cloudns_core::Result<()> {
//     let current = gateway.list_addresses("example.com").await?;
//     let change = ChangeRequest::new("example.com", ["1.2.3.4"].into_iter().collect(), current, 120);
//     let receipt = gateway.submit_change(&change).await?;
//     println!("submitted {}", receipt.id);
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address_set::AddressSet;

/// Provider-reported state of a submitted change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// Accepted but not yet authoritative
    Pending,
    /// Committed
    Done,
}

impl ChangeStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, ChangeStatus::Done)
    }
}

/// A set of additions and deletions applied atomically to one record set
///
/// Built fresh for every reconciliation attempt and never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    domain: String,
    additions: AddressSet,
    deletions: AddressSet,
    ttl: u32,
}

impl ChangeRequest {
    pub fn new(
        domain: impl Into<String>,
        additions: AddressSet,
        deletions: AddressSet,
        ttl: u32,
    ) -> Self {
        Self {
            domain: domain.into(),
            additions,
            deletions,
            ttl,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn additions(&self) -> &AddressSet {
        &self.additions
    }

    pub fn deletions(&self) -> &AddressSet {
        &self.deletions
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }
}

/// What the provider returns when it accepts a change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReceipt {
    /// Opaque provider change identifier
    pub id: String,
    /// Status at submission time
    pub status: ChangeStatus,
}

impl ChangeReceipt {
    pub fn new(id: impl Into<String>, status: ChangeStatus) -> Self {
        Self {
            id: id.into(),
            status,
        }
    }
}

/// Trait for DNS provider backends
///
/// A gateway owns all remote record state. It performs one provider request
/// per call and returns errors to the caller; retry, polling and change
/// planning belong to the [`Reconciler`](crate::Reconciler) and
/// [`RetryPolicy`](crate::RetryPolicy).
///
/// # Errors
///
/// Implementations should classify failures with the matching
/// [`Error`](crate::Error) variant so the retry policy can tell transient
/// failures (`Http`, `Authentication`, `RateLimited`, `Conflict`) from fatal
/// ones (`Config`, `Provider`).
#[async_trait]
pub trait DnsGateway: Send + Sync {
    /// List the addresses currently bound to `domain`
    ///
    /// A domain without a record set yields an empty [`AddressSet`], not an
    /// error.
    async fn list_addresses(&self, domain: &str) -> Result<AddressSet, crate::Error>;

    /// Submit a change and return its identifier and initial status
    ///
    /// Empty `additions` or `deletions` must be accepted.
    async fn submit_change(&self, change: &ChangeRequest) -> Result<ChangeReceipt, crate::Error>;

    /// Fetch the current status of a previously submitted change
    async fn change_status(&self, change_id: &str) -> Result<ChangeStatus, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing gateways from configuration
pub trait DnsGatewayFactory: Send + Sync {
    /// Create a gateway from the provider configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<std::sync::Arc<dyn DnsGateway>, crate::Error>;
}
