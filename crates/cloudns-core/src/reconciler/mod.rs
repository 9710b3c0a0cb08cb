//! Record reconciliation
//!
//! The [`Reconciler`] turns operator intent into one provider change:
//!
//! 1. Read the current record set from the gateway (missing set = empty)
//! 2. Plan the change with [`merge`] / [`diff`]
//! 3. Submit it
//! 4. Poll the change until the provider reports it done
//!
//! Each call to [`Reconciler::apply`] is one attempt. Retrying attempts is
//! the job of [`RetryPolicy`](crate::RetryPolicy).

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::address_set::{AddressSet, diff, merge};
use crate::config::{ProviderConfig, RecordType};
use crate::error::{Error, Operation, Result};
use crate::traits::{ChangeReceipt, ChangeRequest, DnsGateway};

/// What the operator wants done to the record set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Bind the given addresses in addition to the current ones
    Add,
    /// Unbind the given addresses, keeping the rest
    Remove,
}

/// One invocation's domain, address delta and intent
///
/// Validated on construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainTarget {
    domain: String,
    delta: AddressSet,
    intent: Intent,
}

impl DomainTarget {
    /// Build a target, validating the domain name and every address
    ///
    /// A trailing dot on the domain is accepted and stripped; gateways add
    /// whatever suffix their wire format needs.
    pub fn new<I, S>(domain: &str, addresses: I, intent: Intent) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let domain = domain.strip_suffix('.').unwrap_or(domain);
        validate_domain_name(domain)?;

        let delta: AddressSet = addresses.into_iter().collect();
        if delta.is_empty() {
            return Err(Error::invalid_input(format!(
                "No addresses given for {}",
                domain
            )));
        }
        for address in &delta {
            address.parse::<IpAddr>().map_err(|_| {
                Error::invalid_input(format!("Not an IP address: '{}'", address))
            })?;
        }

        Ok(Self {
            domain: domain.to_string(),
            delta,
            intent,
        })
    }

    pub fn add<I, S>(domain: &str, addresses: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(domain, addresses, Intent::Add)
    }

    pub fn remove<I, S>(domain: &str, addresses: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(domain, addresses, Intent::Remove)
    }

    /// Check every address belongs in a record of `record_type`
    pub fn ensure_record_type(&self, record_type: RecordType) -> Result<()> {
        for address in &self.delta {
            // Parsed successfully in `new`
            let accepted = address
                .parse::<IpAddr>()
                .map(|ip| record_type.accepts(&ip))
                .unwrap_or(false);
            if !accepted {
                return Err(Error::invalid_input(format!(
                    "Address {} cannot be stored in a {} record",
                    address,
                    record_type.as_str()
                )));
            }
        }
        Ok(())
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn delta(&self) -> &AddressSet {
        &self.delta
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }
}

/// Result of a committed reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOutcome {
    /// Provider change identifier
    pub change_id: String,
    /// Addresses bound to the domain once the change committed
    pub records: AddressSet,
}

/// Compute the change that moves `current` to the state `target` asks for
///
/// The whole current set is always deleted and the full desired set added
/// back, so the provider applies the transition atomically. On add, addresses
/// already bound keep their position and new ones follow. An add that is
/// already satisfied still produces a well-formed change.
pub fn plan_change(target: &DomainTarget, current: &AddressSet, ttl: u32) -> ChangeRequest {
    let additions = match target.intent {
        Intent::Add => merge(current, &target.delta),
        Intent::Remove => diff(current, &target.delta),
    };
    ChangeRequest::new(target.domain.clone(), additions, current.clone(), ttl)
}

/// Applies a [`DomainTarget`] through a [`DnsGateway`]
pub struct Reconciler {
    gateway: Arc<dyn DnsGateway>,
    ttl: u32,
    record_type: RecordType,
    polling_interval: Duration,
    propagation_timeout: Duration,
}

impl Reconciler {
    pub fn new(gateway: Arc<dyn DnsGateway>, config: &ProviderConfig) -> Self {
        Self {
            gateway,
            ttl: config.ttl,
            record_type: config.record_type,
            polling_interval: config.polling_interval(),
            propagation_timeout: config.propagation_timeout(),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn DnsGateway> {
        &self.gateway
    }

    /// Run one reconciliation attempt
    ///
    /// Fetch and submit failures are returned immediately with
    /// [`Operation::ListAddresses`] / [`Operation::SubmitChange`] context.
    /// Once a change is accepted, any failure while waiting for it
    /// (status error, timeout, cancellation) carries
    /// [`Operation::PollStatus`] and is never retried.
    ///
    /// Cancellation is honoured up to the moment the change is submitted.
    /// A change the provider reports done at submission is returned as
    /// committed even if `cancel` fired while it was in flight.
    pub async fn apply(
        &self,
        target: &DomainTarget,
        cancel: &CancellationToken,
    ) -> Result<ChangeOutcome> {
        target.ensure_record_type(self.record_type)?;
        let domain = target.domain();

        let current = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            listed = self.gateway.list_addresses(domain) => listed,
        }
        .map_err(|e| Error::reconcile(domain, Operation::ListAddresses, e))?;
        debug!("Current records for {}: {}", domain, current);

        let change = plan_change(target, &current, self.ttl);
        info!(
            "Up to date records after changes: {}",
            change.additions()
        );

        if cancel.is_cancelled() {
            return Err(Error::reconcile(
                domain,
                Operation::SubmitChange,
                Error::Cancelled,
            ));
        }

        let receipt = self
            .gateway
            .submit_change(&change)
            .await
            .map_err(|e| Error::reconcile(domain, Operation::SubmitChange, e))?;
        debug!(
            "Change {} submitted to {} ({:?})",
            receipt.id,
            self.gateway.provider_name(),
            receipt.status
        );

        self.wait_for_commit(domain, &receipt, cancel)
            .await
            .map_err(|e| Error::reconcile(domain, Operation::PollStatus, e))?;

        info!("Change {} for {} committed", receipt.id, domain);
        Ok(ChangeOutcome {
            change_id: receipt.id,
            records: change.additions().clone(),
        })
    }

    /// Poll a submitted change until it is done
    ///
    /// Bounded by the propagation timeout and aborted when `cancel` fires.
    async fn wait_for_commit(
        &self,
        domain: &str,
        receipt: &ChangeReceipt,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if receipt.status.is_done() {
            return Ok(());
        }

        let poll = async {
            let mut status = receipt.status;
            while !status.is_done() {
                tokio::time::sleep(self.polling_interval).await;
                status = self.gateway.change_status(&receipt.id).await?;
                debug!("Change {} for {} is {:?}", receipt.id, domain, status);
            }
            Ok::<(), Error>(())
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout(self.propagation_timeout, poll) => match result {
                Ok(polled) => polled,
                Err(_) => Err(Error::PropagationTimeout {
                    change_id: receipt.id.clone(),
                    waited: self.propagation_timeout,
                }),
            },
        }
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, label characters.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::invalid_input("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::invalid_input(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(Error::invalid_input(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::invalid_input(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        // Underscore shows up in service labels
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::invalid_input(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::invalid_input(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
