//! Google service-account credentials
//!
//! Access tokens come from the OAuth2 JWT-bearer grant: an RS256 assertion
//! signed with the service account's private key is exchanged at the key's
//! `token_uri`. Tokens are reused until shortly before they expire.
//!
//! ⚠️ Private keys and access tokens NEVER appear in logs or Debug output.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use cloudns_core::{Error, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// OAuth2 scope granting read/write access to Cloud DNS
pub const CLOUD_DNS_SCOPE: &str = "https://www.googleapis.com/auth/ndev.clouddns.readwrite";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// Service-account JSON key file contents
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    project_id: Option<String>,
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<REDACTED>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Load a key from a service-account JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        if path.as_os_str().is_empty() {
            return Err(Error::config("googlecloud: Service Account file missing"));
        }
        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "googlecloud: unable to read Service Account file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&data)
    }

    /// Parse a key from service-account JSON
    ///
    /// The key must name its project.
    pub fn from_json(data: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(data).map_err(|e| {
            Error::config(format!(
                "googlecloud: invalid Google Cloud Service Account file: {}",
                e
            ))
        })?;
        if key.project_id.as_deref().is_none_or(str::is_empty) {
            return Err(Error::config(
                "googlecloud: project ID not found in Google Cloud Service Account file",
            ));
        }
        Ok(key)
    }

    pub fn project_id(&self) -> &str {
        self.project_id.as_deref().unwrap_or_default()
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// How the gateway authenticates
#[derive(Clone)]
pub enum Credentials {
    /// Exchange a signed assertion for short-lived tokens
    ServiceAccount(ServiceAccountKey),
    /// Use a bearer token obtained elsewhere
    AccessToken(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ServiceAccount(key) => {
                f.debug_tuple("ServiceAccount").field(key).finish()
            }
            Credentials::AccessToken(_) => f.debug_tuple("AccessToken").field(&"<REDACTED>").finish(),
        }
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Supplies bearer tokens for API requests
pub(crate) struct TokenSource {
    credentials: Credentials,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub(crate) fn new(credentials: Credentials, client: reqwest::Client) -> Self {
        Self {
            credentials,
            client,
            cached: Mutex::new(None),
        }
    }

    /// Current bearer token, fetching a new one when needed
    pub(crate) async fn token(&self) -> Result<String> {
        let key = match &self.credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::ServiceAccount(key) => key,
        };

        let mut cached = self.cached.lock().await;
        let refresh_after = Utc::now() + Duration::seconds(REFRESH_MARGIN_SECS);
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > refresh_after) {
            return Ok(token.value.clone());
        }

        let fresh = self.exchange(key).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn exchange(&self, key: &ServiceAccountKey) -> Result<CachedToken> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: CLOUD_DNS_SCOPE,
            aud: &key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = key.private_key_id.clone();

        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            Error::config(format!("googlecloud: unable to acquire config: {}", e))
        })?;
        let assertion = encode(&header, &claims, &signing_key).map_err(|e| {
            Error::config(format!("googlecloud: unable to sign token request: {}", e))
        })?;

        tracing::debug!(
            "Requesting access token for {} from {}",
            key.client_email,
            key.token_uri
        );

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| Error::http(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(match status.as_u16() {
                400 | 401 | 403 => Error::auth(format!(
                    "Token exchange rejected for {}: {} - {}",
                    key.client_email, status, error_text
                )),
                429 => Error::rate_limited(format!("Token endpoint: {}", status)),
                _ => Error::http(format!(
                    "Token endpoint error: {} - {}",
                    status, error_text
                )),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Failed to parse token response: {}", e)))?;

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}
