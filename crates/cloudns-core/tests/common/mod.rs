//! Test doubles and common utilities for reconciliation contract tests
//!
//! The [`MockGateway`] plays the provider: it holds one record set per
//! domain, applies accepted changes to it, and can be scripted to fail
//! specific operations a set number of times.

#![allow(dead_code)]

use cloudns_core::error::{Error, Result};
use cloudns_core::traits::{ChangeReceipt, ChangeRequest, ChangeStatus, DnsGateway};
use cloudns_core::{AddressSet, ProviderConfig, RetryConfig};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// A scripted in-memory DnsGateway that tracks calls
pub struct MockGateway {
    /// Remote record sets by domain
    records: Mutex<HashMap<String, AddressSet>>,
    /// Errors returned by the next list_addresses() calls
    list_failures: Mutex<VecDeque<Error>>,
    /// Errors returned by the next submit_change() calls
    submit_failures: Mutex<VecDeque<Error>>,
    /// Scripted change_status() responses; Done once exhausted
    status_script: Mutex<VecDeque<Result<ChangeStatus>>>,
    /// Status reported at submission time
    initial_status: ChangeStatus,
    /// Report Pending forever
    never_commits: bool,
    /// Cancelled while a change is being submitted
    cancel_on_submit: Option<CancellationToken>,
    /// Accepted change requests, in order
    submitted: Mutex<Vec<ChangeRequest>>,
    list_call_count: AtomicUsize,
    submit_call_count: AtomicUsize,
    status_call_count: AtomicUsize,
}

impl MockGateway {
    /// A gateway with no record set for any domain
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            list_failures: Mutex::new(VecDeque::new()),
            submit_failures: Mutex::new(VecDeque::new()),
            status_script: Mutex::new(VecDeque::new()),
            initial_status: ChangeStatus::Pending,
            never_commits: false,
            cancel_on_submit: None,
            submitted: Mutex::new(Vec::new()),
            list_call_count: AtomicUsize::new(0),
            submit_call_count: AtomicUsize::new(0),
            status_call_count: AtomicUsize::new(0),
        }
    }

    /// Start with these addresses bound to `domain`
    pub fn with_records(self, domain: &str, addresses: &[&str]) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(domain.to_string(), addresses.iter().copied().collect());
        self
    }

    /// Report changes as done right at submission
    pub fn committing_immediately(mut self) -> Self {
        self.initial_status = ChangeStatus::Done;
        self
    }

    /// Report Pending for the next `polls` status checks
    pub fn pending_for(self, polls: usize) -> Self {
        {
            let mut script = self.status_script.lock().unwrap();
            for _ in 0..polls {
                script.push_back(Ok(ChangeStatus::Pending));
            }
        }
        self
    }

    /// Fail the next status check with `error`
    pub fn failing_status_with(self, error: Error) -> Self {
        self.status_script.lock().unwrap().push_back(Err(error));
        self
    }

    /// Never report a change as done
    pub fn never_committing(mut self) -> Self {
        self.never_commits = true;
        self
    }

    /// Cancel `token` while the change is in flight, as a Ctrl-C would
    pub fn cancelling_on_submit(mut self, token: CancellationToken) -> Self {
        self.cancel_on_submit = Some(token);
        self
    }

    /// Fail the next list_addresses() call with `error`
    pub fn failing_list_with(self, error: Error) -> Self {
        self.list_failures.lock().unwrap().push_back(error);
        self
    }

    /// Fail the next submit_change() call with `error`
    pub fn failing_submit_with(self, error: Error) -> Self {
        self.submit_failures.lock().unwrap().push_back(error);
        self
    }

    pub fn records(&self, domain: &str) -> AddressSet {
        self.records
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .unwrap_or_default()
    }

    pub fn submitted(&self) -> Vec<ChangeRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    pub fn submit_call_count(&self) -> usize {
        self.submit_call_count.load(Ordering::SeqCst)
    }

    pub fn status_call_count(&self) -> usize {
        self.status_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DnsGateway for MockGateway {
    async fn list_addresses(&self, domain: &str) -> Result<AddressSet> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.list_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.records(domain))
    }

    async fn submit_change(&self, change: &ChangeRequest) -> Result<ChangeReceipt> {
        let n = self.submit_call_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(error) = self.submit_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        if let Some(token) = &self.cancel_on_submit {
            token.cancel();
        }

        let mut records = self.records.lock().unwrap();
        let current = records.entry(change.domain().to_string()).or_default();
        if change.deletions() != &*current {
            return Err(Error::conflict("deletions do not match the current record set"));
        }
        *current = change.additions().clone();
        self.submitted.lock().unwrap().push(change.clone());

        Ok(ChangeReceipt::new(format!("change-{}", n), self.initial_status))
    }

    async fn change_status(&self, _change_id: &str) -> Result<ChangeStatus> {
        self.status_call_count.fetch_add(1, Ordering::SeqCst);
        if self.never_commits {
            return Ok(ChangeStatus::Pending);
        }
        self.status_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ChangeStatus::Done))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Provider configuration used by the contract tests
pub fn test_provider_config() -> ProviderConfig {
    let mut config = ProviderConfig::new("test-zone").with_kind("mock");
    config.propagation_timeout_secs = 30;
    config.polling_interval_ms = 1000;
    config
}

/// Retry configuration with `max_attempts` and a 2s delay
pub fn test_retry_config(max_attempts: usize) -> RetryConfig {
    RetryConfig {
        max_attempts,
        retry_delay_ms: 2000,
    }
}

pub fn set(addresses: &[&str]) -> AddressSet {
    addresses.iter().copied().collect()
}

/// In-memory log sink for a test-local tracing subscriber
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
