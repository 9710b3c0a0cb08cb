// # Google Cloud DNS Gateway
//
// This crate provides the Google Cloud DNS implementation of `DnsGateway`.
//
// - ✅ One API request per gateway call (retry and polling are owned by cloudns-core)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Status codes mapped to retryable / fatal error variants
// - ✅ Dry-run mode for safe testing
// - ✅ Service-account (JWT bearer) and static access-token credentials
//
// ## Security Requirements
//
// - Private keys and access tokens NEVER appear in logs
// - Factory fails fast when no credentials are configured
//
// ## API Reference
//
// - Cloud DNS API v1: https://cloud.google.com/dns/docs/reference/v1
// - List record sets: GET `/projects/:project/managedZones/:zone/rrsets?name=...&type=...`
// - Create change: POST `/projects/:project/managedZones/:zone/changes`
// - Get change: GET `/projects/:project/managedZones/:zone/changes/:id`

mod api;
pub mod auth;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cloudns_core::config::{ProviderConfig, RecordType};
use cloudns_core::traits::{ChangeReceipt, ChangeRequest, ChangeStatus, DnsGateway, DnsGatewayFactory};
use cloudns_core::{AddressSet, Error, GatewayRegistry, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::api::{Change, ChangeBody, RecordSetList, ResourceRecordSet};
use crate::auth::TokenSource;
pub use crate::auth::{Credentials, ServiceAccountKey};

/// Cloud DNS API base URL
pub const GOOGLE_DNS_API_BASE: &str = "https://dns.googleapis.com/dns/v1";

/// Environment variable holding a pre-issued OAuth2 access token
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER_NAME: &str = "googledns";

/// Google Cloud DNS gateway
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the gateway will:
/// - Perform record set lookups
/// - Log the change it would submit
/// - **NOT** submit the change, reporting a synthetic `dry-run` change as done
pub struct GoogleDnsGateway {
    project: String,
    zone: String,
    record_type: RecordType,
    tokens: TokenSource,
    client: reqwest::Client,
    base_url: String,
    dry_run: bool,
    /// TTL of each record set as last listed, keyed by FQDN
    listed_ttls: Mutex<HashMap<String, u32>>,
}

// Custom Debug implementation that hides credentials
impl std::fmt::Debug for GoogleDnsGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDnsGateway")
            .field("project", &self.project)
            .field("zone", &self.zone)
            .field("record_type", &self.record_type)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl GoogleDnsGateway {
    /// Create a gateway for one managed zone
    ///
    /// # Parameters
    ///
    /// - `project`: Google Cloud project id
    /// - `zone`: Managed zone name (not the DNS name)
    /// - `record_type`: Address record type to manage
    /// - `credentials`: How to authenticate
    /// - `dry_run`: If true, read records but skip change submission
    pub fn new(
        project: impl Into<String>,
        zone: impl Into<String>,
        record_type: RecordType,
        credentials: Credentials,
        dry_run: bool,
    ) -> Result<Self> {
        let project = project.into();
        let zone = zone.into();
        if project.is_empty() {
            return Err(Error::config("googlecloud: project is required"));
        }
        if zone.is_empty() {
            return Err(Error::config("googlecloud: managed zone is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            project,
            zone,
            record_type,
            tokens: TokenSource::new(credentials, client.clone()),
            client,
            base_url: GOOGLE_DNS_API_BASE.to_string(),
            dry_run,
            listed_ttls: Mutex::new(HashMap::new()),
        })
    }

    /// Point the gateway at a different API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn zone_url(&self) -> String {
        format!(
            "{}/projects/{}/managedZones/{}",
            self.base_url, self.project, self.zone
        )
    }

    fn record_set(&self, domain: &str, addresses: &AddressSet, ttl: u32) -> ResourceRecordSet {
        ResourceRecordSet {
            name: fqdn(domain),
            record_type: self.record_type.as_str().to_string(),
            ttl,
            rrdatas: addresses.as_slice().to_vec(),
        }
    }

    /// TTL deletions of `name` must carry to match the live record set
    ///
    /// Cloud DNS only deletes an exact match, so the TTL seen by the last
    /// listing wins over the configured one.
    fn deletion_ttl(&self, name: &str, configured: u32) -> u32 {
        self.listed_ttls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .copied()
            .unwrap_or(configured)
    }

    /// Authenticate, send and decode one API request
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<T> {
        let token = self.tokens.token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(self.status_error(status, action, &error_text));
        }

        response.json().await.map_err(|e| {
            Error::provider(PROVIDER_NAME, format!("Failed to parse {} response: {}", action, e))
        })
    }

    /// Map a non-success status to the matching error variant
    fn status_error(&self, status: StatusCode, action: &str, error_text: &str) -> Error {
        match status.as_u16() {
            401 | 403 => Error::auth(format!(
                "Invalid credentials or insufficient permissions on project {}. Status: {}",
                self.project, status
            )),
            404 => Error::config(format!(
                "{}: managed zone {} not found in project {}: {}",
                action, self.zone, self.project, error_text
            )),
            409 | 412 => Error::conflict(format!(
                "{}: record set changed concurrently. Status: {}",
                action, status
            )),
            429 => Error::rate_limited(format!(
                "Rate limit exceeded. Please retry later. Status: {}",
                status
            )),
            500..=599 => Error::http(format!(
                "Cloud DNS server error (transient): {} - {}",
                status, error_text
            )),
            _ => Error::provider(
                PROVIDER_NAME,
                format!("{} failed: {} - {}", action, status, error_text),
            ),
        }
    }
}

#[async_trait]
impl DnsGateway for GoogleDnsGateway {
    /// List the addresses of the domain's record set
    ///
    /// ```http
    /// GET /projects/:project/managedZones/:zone/rrsets?name=example.com.&type=A
    /// ```
    async fn list_addresses(&self, domain: &str) -> Result<AddressSet> {
        let name = fqdn(domain);
        tracing::debug!("Listing {} records for {}", self.record_type.as_str(), name);

        let request = self
            .client
            .get(format!("{}/rrsets", self.zone_url()))
            .query(&[("name", name.as_str()), ("type", self.record_type.as_str())]);
        let list: RecordSetList = self.send(request, "list record sets").await?;

        let mut listed_ttls = self
            .listed_ttls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match list.rrsets.as_slice() {
            [rrset] => {
                listed_ttls.insert(name, rrset.ttl);
                Ok(rrset.rrdatas.iter().map(String::as_str).collect())
            }
            _ => {
                listed_ttls.remove(&name);
                Ok(AddressSet::new())
            }
        }
    }

    /// Submit additions and deletions as one change
    ///
    /// An empty change is not sent and reports done. Deletions carry the TTL
    /// of the record set as last listed.
    ///
    /// ```http
    /// POST /projects/:project/managedZones/:zone/changes
    /// { "additions": [...], "deletions": [...] }
    /// ```
    async fn submit_change(&self, change: &ChangeRequest) -> Result<ChangeReceipt> {
        if change.additions().is_empty() && change.deletions().is_empty() {
            tracing::info!("No record set for {}, nothing to change", change.domain());
            return Ok(ChangeReceipt::new("no-op", ChangeStatus::Done));
        }

        let mut body = ChangeBody {
            additions: Vec::new(),
            deletions: Vec::new(),
        };
        if !change.additions().is_empty() {
            body.additions
                .push(self.record_set(change.domain(), change.additions(), change.ttl()));
        }
        if !change.deletions().is_empty() {
            let ttl = self.deletion_ttl(&fqdn(change.domain()), change.ttl());
            body.deletions
                .push(self.record_set(change.domain(), change.deletions(), ttl));
        }

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {}/changes with payload: {}",
                self.zone_url(),
                serde_json::to_string(&body)?
            );
            return Ok(ChangeReceipt::new("dry-run", ChangeStatus::Done));
        }

        tracing::info!(
            "Submitting change for {}: +{} -{}",
            change.domain(),
            change.additions(),
            change.deletions()
        );

        let request = self
            .client
            .post(format!("{}/changes", self.zone_url()))
            .json(&body);
        let created: Change = self.send(request, "create change").await?;

        Ok(ChangeReceipt::new(
            created.id,
            parse_status(&created.status)?,
        ))
    }

    /// Fetch the status of a change
    ///
    /// ```http
    /// GET /projects/:project/managedZones/:zone/changes/:id
    /// ```
    async fn change_status(&self, change_id: &str) -> Result<ChangeStatus> {
        let request = self
            .client
            .get(format!("{}/changes/{}", self.zone_url(), change_id));
        let change: Change = self.send(request, "get change").await?;
        parse_status(&change.status)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Domain name with the trailing dot Cloud DNS expects
fn fqdn(domain: &str) -> String {
    if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{}.", domain)
    }
}

fn parse_status(status: &str) -> Result<ChangeStatus> {
    match status {
        "pending" => Ok(ChangeStatus::Pending),
        "done" => Ok(ChangeStatus::Done),
        other => Err(Error::provider(
            PROVIDER_NAME,
            format!("Unknown change status '{}'", other),
        )),
    }
}

/// Factory for creating Google Cloud DNS gateways
///
/// Credentials come from `config.credentials_file` when set, otherwise from
/// the [`ACCESS_TOKEN_ENV`] environment variable. The project defaults to
/// the service account's project.
pub struct GoogleDnsFactory;

impl DnsGatewayFactory for GoogleDnsFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn DnsGateway>> {
        let (credentials, key_project) = match &config.credentials_file {
            Some(path) => {
                let key = ServiceAccountKey::from_file(path)?;
                let project = key.project_id().to_string();
                (Credentials::ServiceAccount(key), Some(project))
            }
            None => match std::env::var(ACCESS_TOKEN_ENV) {
                Ok(token) if !token.is_empty() => (Credentials::AccessToken(token), None),
                _ => return Err(Error::config("googlecloud: Service Account file missing")),
            },
        };

        let project = config
            .project
            .clone()
            .or(key_project)
            .ok_or_else(|| Error::config("googlecloud: project is required"))?;

        if config.dry_run {
            tracing::warn!("Google Cloud DNS gateway running in DRY-RUN mode - no changes will be made");
        }

        let gateway = GoogleDnsGateway::new(
            project,
            config.zone.clone(),
            config.record_type,
            credentials,
            config.dry_run,
        )?;
        Ok(Arc::new(gateway))
    }
}

/// Register the Google Cloud DNS gateway with a registry
///
/// # Example
///
/// ```rust
/// use cloudns_core::GatewayRegistry;
///
/// let registry = GatewayRegistry::new();
/// cloudns_provider_googledns::register(&registry);
/// assert!(registry.contains("googledns"));
/// ```
pub fn register(registry: &GatewayRegistry) {
    registry.register(PROVIDER_NAME, Box::new(GoogleDnsFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn gateway() -> GoogleDnsGateway {
        GoogleDnsGateway::new(
            "my-project",
            "my-zone",
            RecordType::A,
            Credentials::AccessToken("ya29.secret_token".to_string()),
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_fqdn() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("pending").unwrap(), ChangeStatus::Pending);
        assert_eq!(parse_status("done").unwrap(), ChangeStatus::Done);
        assert!(parse_status("exploded").is_err());
    }

    #[test]
    fn test_status_mapping() {
        let gw = gateway();
        assert!(matches!(
            gw.status_error(StatusCode::FORBIDDEN, "list", ""),
            Error::Authentication(_)
        ));
        assert!(matches!(
            gw.status_error(StatusCode::NOT_FOUND, "list", ""),
            Error::Config(_)
        ));
        assert!(matches!(
            gw.status_error(StatusCode::PRECONDITION_FAILED, "create change", ""),
            Error::Conflict(_)
        ));
        assert!(matches!(
            gw.status_error(StatusCode::TOO_MANY_REQUESTS, "list", ""),
            Error::RateLimited(_)
        ));
        assert!(matches!(
            gw.status_error(StatusCode::BAD_GATEWAY, "list", ""),
            Error::Http(_)
        ));
        assert!(!gw.status_error(StatusCode::BAD_REQUEST, "list", "").is_retryable());
    }

    #[test]
    fn test_change_body_omits_empty_lists() {
        let gw = gateway();
        let addresses: AddressSet = ["1.1.1.1"].into_iter().collect();
        let body = ChangeBody {
            additions: vec![gw.record_set("example.com", &addresses, 120)],
            deletions: Vec::new(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "additions": [{
                    "name": "example.com.",
                    "type": "A",
                    "ttl": 120,
                    "rrdatas": ["1.1.1.1"]
                }]
            })
        );
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let debug_str = format!("{:?}", gateway());
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("GoogleDnsGateway"));
        assert!(debug_str.contains("my-zone"));
    }

    #[test]
    fn test_new_requires_project_and_zone() {
        let token = || Credentials::AccessToken("t".to_string());
        assert!(GoogleDnsGateway::new("", "zone", RecordType::A, token(), false).is_err());
        assert!(GoogleDnsGateway::new("project", "", RecordType::A, token(), false).is_err());
    }

    #[test]
    fn test_factory_uses_key_project() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"project_id": "key-project", "client_email": "a@b.c", "private_key": "k"}"#,
        )
        .unwrap();

        let config = ProviderConfig::new("my-zone").with_credentials_file(file.path());
        let gateway = GoogleDnsFactory.create(&config).unwrap();
        assert_eq!(gateway.provider_name(), "googledns");

        let overridden = config.with_project("other-project");
        assert!(GoogleDnsFactory.create(&overridden).is_ok());
    }

    #[test]
    fn test_factory_rejects_unreadable_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProviderConfig::new("my-zone").with_credentials_file(dir.path().join("nope.json"));
        let err = GoogleDnsFactory.create(&config).err().unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn test_register() {
        let registry = GatewayRegistry::new();
        register(&registry);
        assert!(registry.contains("googledns"));
    }
}
