//! Configuration types for cloudns
//!
//! Configuration is built once at startup and handed to constructors by
//! reference. Nothing here is mutated after validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Registered gateway name (e.g. "googledns")
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Provider project identifier
    ///
    /// Optional when the credentials file carries one.
    #[serde(default)]
    pub project: Option<String>,

    /// Managed zone holding the record
    pub zone: String,

    /// Path to the provider credentials file
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,

    /// TTL applied to every record set submitted
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Address record type to manage
    #[serde(default)]
    pub record_type: RecordType,

    /// Upper bound on waiting for a submitted change to commit (in seconds)
    #[serde(default = "default_propagation_timeout_secs")]
    pub propagation_timeout_secs: u64,

    /// Delay between change status checks (in milliseconds)
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,

    /// Read the current state but log the change instead of submitting it
    #[serde(default)]
    pub dry_run: bool,
}

impl ProviderConfig {
    /// Create a configuration for a zone with defaults for everything else
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            kind: default_kind(),
            project: None,
            zone: zone.into(),
            credentials_file: None,
            ttl: default_ttl(),
            record_type: RecordType::default(),
            propagation_timeout_secs: default_propagation_timeout_secs(),
            polling_interval_ms: default_polling_interval_ms(),
            dry_run: false,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn propagation_timeout(&self) -> Duration {
        Duration::from_secs(self.propagation_timeout_secs)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.kind.is_empty() {
            return Err(crate::Error::config("Provider kind cannot be empty"));
        }
        if self.zone.is_empty() {
            return Err(crate::Error::config(
                "DNS zone is required (set DNS_ZONE or --zone)",
            ));
        }
        if matches!(self.project.as_deref(), Some("")) {
            return Err(crate::Error::config("Project cannot be empty when set"));
        }
        if self.ttl == 0 {
            return Err(crate::Error::config("TTL must be > 0"));
        }
        if self.propagation_timeout_secs == 0 {
            return Err(crate::Error::config("Propagation timeout must be > 0"));
        }
        if self.polling_interval_ms == 0 {
            return Err(crate::Error::config("Polling interval must be > 0"));
        }
        if self.polling_interval() > self.propagation_timeout() {
            return Err(crate::Error::config(format!(
                "Polling interval ({:?}) cannot exceed propagation timeout ({:?})",
                self.polling_interval(),
                self.propagation_timeout()
            )));
        }
        Ok(())
    }
}

/// Address record type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address record
    #[default]
    A,
    /// IPv6 address record
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Whether an address belongs in a record of this type
    pub fn accepts(&self, ip: &std::net::IpAddr) -> bool {
        matches!(
            (self, ip),
            (RecordType::A, std::net::IpAddr::V4(_)) | (RecordType::Aaaa, std::net::IpAddr::V6(_))
        )
    }
}

impl std::str::FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(crate::Error::config(format!(
                "Unsupported record type '{}'. Supported types: A, AAAA",
                other
            ))),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Fixed delay between attempts (in milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl RetryConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Validate the retry configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(crate::Error::config(format!(
                "Retry attempts must be between 1 and 10. Got: {}",
                self.max_attempts
            )));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_kind() -> String {
    "googledns".to_string()
}

fn default_ttl() -> u32 {
    120
}

fn default_propagation_timeout_secs() -> u64 {
    180
}

fn default_polling_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::new("my-zone");
        assert_eq!(config.kind, "googledns");
        assert_eq!(config.ttl, 120);
        assert_eq!(config.record_type, RecordType::A);
        assert_eq!(config.propagation_timeout(), Duration::from_secs(180));
        assert_eq!(config.polling_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());

        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.retry_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"zone":"my-zone","record_type":"AAAA"}"#).unwrap();
        assert_eq!(config.zone, "my-zone");
        assert_eq!(config.record_type, RecordType::Aaaa);
        assert_eq!(config.ttl, 120);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_missing_zone_is_rejected() {
        let err = ProviderConfig::new("").validate().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_timing_is_validated() {
        let mut config = ProviderConfig::new("zone");
        config.polling_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ProviderConfig::new("zone");
        config.propagation_timeout_secs = 1;
        config.polling_interval_ms = 5000;
        assert!(config.validate().is_err());

        assert!(ProviderConfig::new("zone").with_ttl(0).validate().is_err());
    }

    #[test]
    fn test_retry_bounds() {
        let mut retry = RetryConfig::default();
        retry.max_attempts = 0;
        assert!(retry.validate().is_err());
        retry.max_attempts = 11;
        assert!(retry.validate().is_err());
        retry.max_attempts = 1;
        assert!(retry.validate().is_ok());
    }

    #[test]
    fn test_record_type_accepts_matching_family() {
        let v4: std::net::IpAddr = "1.1.1.1".parse().unwrap();
        let v6: std::net::IpAddr = "::1".parse().unwrap();
        assert!(RecordType::A.accepts(&v4));
        assert!(!RecordType::A.accepts(&v6));
        assert!(RecordType::Aaaa.accepts(&v6));
        assert_eq!("aaaa".parse::<RecordType>().unwrap(), RecordType::Aaaa);
        assert!("MX".parse::<RecordType>().is_err());
    }
}
