// # cloudns - address record manager
//
// Thin integration layer over cloudns-core:
// 1. Parse flags (each backed by an environment variable)
// 2. Initialize logging and a single-threaded runtime
// 3. Register gateways and build the configured one
// 4. Run one add or remove through the RecordEngine
//
// ## Configuration
//
// - `SA_FILE`: Service account JSON key file
// - `DNS_ZONE`: Managed zone holding the record
// - `DNS_PROJECT`: Project id (defaults to the key file's project)
// - `DNS_TTL`: Record TTL in seconds
// - `DNS_RECORD_TYPE`: A or AAAA
// - `CLOUDNS_RETRIES`: Total attempts per invocation
// - `CLOUDNS_DRY_RUN`: Log the change instead of submitting it
// - `CLOUDNS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export SA_FILE=/etc/cloudns/service-account.json
// export DNS_ZONE=example-zone
//
// cloudns add -d www.example.com -i 203.0.113.10,203.0.113.11
// cloudns remove -d www.example.com -i 203.0.113.10
// ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use cloudns_core::{GatewayRegistry, ProviderConfig, RecordEngine, RecordType, RetryConfig};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Change committed
/// - 1: Configuration or input error
/// - 2: Runtime error (provider failure, timeout, cancellation)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloudnsExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<CloudnsExitCode> for ExitCode {
    fn from(code: CloudnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep a DNS address record's IP set in sync by adding or removing addresses
#[derive(Parser, Debug)]
#[command(name = "cloudns", version, about, long_about = None)]
struct Cli {
    /// Service account JSON key file
    #[arg(long, env = "SA_FILE", global = true)]
    sa_file: Option<PathBuf>,

    /// Managed zone holding the record
    #[arg(long, env = "DNS_ZONE", global = true)]
    zone: Option<String>,

    /// Project id (defaults to the service account's project)
    #[arg(long, env = "DNS_PROJECT", global = true)]
    project: Option<String>,

    /// DNS provider backend
    #[arg(long, env = "DNS_PROVIDER", default_value = "googledns", global = true)]
    provider: String,

    /// TTL applied to the record set
    #[arg(long, env = "DNS_TTL", default_value_t = 120, global = true)]
    ttl: u32,

    /// Address record type (A or AAAA)
    #[arg(long, env = "DNS_RECORD_TYPE", default_value = "A", global = true)]
    record_type: String,

    /// Total attempts when the provider fails transiently
    #[arg(long, env = "CLOUDNS_RETRIES", default_value_t = 3, global = true)]
    retries: usize,

    /// Seconds to wait for a change to commit
    #[arg(long, env = "CLOUDNS_PROPAGATION_TIMEOUT", default_value_t = 180, global = true)]
    propagation_timeout: u64,

    /// Log the change instead of submitting it
    #[arg(long, env = "CLOUDNS_DRY_RUN", global = true)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CLOUDNS_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add given IPs to the domain
    Add(RecordArgs),
    /// Remove given IPs from the domain
    Remove(RecordArgs),
}

#[derive(Args, Debug)]
struct RecordArgs {
    /// Domain whose address record is changed
    #[arg(short, long)]
    domain: String,

    /// IP address list
    #[arg(short = 'i', long = "ip", value_delimiter = ',', required = true, num_args = 1..)]
    ips: Vec<IpAddr>,
}

impl RecordArgs {
    fn addresses(&self) -> Vec<String> {
        self.ips.iter().map(IpAddr::to_string).collect()
    }
}

impl Cli {
    /// Build the immutable provider and retry configuration
    fn configs(&self) -> Result<(ProviderConfig, RetryConfig)> {
        let zone = self
            .zone
            .clone()
            .filter(|z| !z.is_empty())
            .context("DNS zone is required. Set it via: export DNS_ZONE=your-zone or --zone")?;

        let record_type: RecordType = self.record_type.parse()?;

        let mut provider = ProviderConfig::new(zone)
            .with_kind(self.provider.clone())
            .with_ttl(self.ttl)
            .with_record_type(record_type)
            .with_dry_run(self.dry_run);
        provider.propagation_timeout_secs = self.propagation_timeout;
        if let Some(project) = &self.project {
            provider = provider.with_project(project.clone());
        }
        if let Some(path) = &self.sa_file {
            provider = provider.with_credentials_file(path.clone());
        }
        provider.validate()?;

        let retry = RetryConfig {
            max_attempts: self.retries,
            ..RetryConfig::default()
        };
        retry.validate()?;

        Ok((provider, retry))
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => anyhow::bail!(
            "Log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            other
        ),
    }
}

/// Exit code for a command line clap could not parse
///
/// Help and version requests succeed; every other usage error is an input
/// error.
fn usage_exit_code(err: &clap::Error) -> CloudnsExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => CloudnsExitCode::Success,
        _ => CloudnsExitCode::ConfigError,
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return usage_exit_code(&e).into();
        }
    };

    let log_level = match parse_log_level(&cli.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return CloudnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CloudnsExitCode::ConfigError.into();
    }

    let (provider, retry) = match cli.configs() {
        Ok(configs) => configs,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return CloudnsExitCode::ConfigError.into();
        }
    };

    // One domain, one change: no need for worker threads
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CloudnsExitCode::RuntimeError.into();
        }
    };

    runtime.block_on(run(cli.command, provider, retry)).into()
}

/// Build the gateway and engine, then run the requested command
async fn run(command: Command, provider: ProviderConfig, retry: RetryConfig) -> CloudnsExitCode {
    let registry = GatewayRegistry::new();

    #[cfg(feature = "googledns")]
    cloudns_provider_googledns::register(&registry);

    let gateway = match registry.create(&provider) {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("{}", e);
            return CloudnsExitCode::ConfigError;
        }
    };
    info!(
        "Using {} gateway for zone {}",
        gateway.provider_name(),
        provider.zone
    );

    let engine = match RecordEngine::new(gateway, &provider, &retry) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{}", e);
            return CloudnsExitCode::ConfigError;
        }
    };

    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the pending change");
            cancel.cancel();
        }
    });

    let result = match &command {
        Command::Add(args) => {
            println!("Adding IPs {:?} to {}", args.addresses(), args.domain);
            engine.add(&args.domain, args.addresses()).await
        }
        Command::Remove(args) => {
            println!("Removing IPs {:?} from {}", args.addresses(), args.domain);
            engine.remove(&args.domain, args.addresses()).await
        }
    };

    match result {
        Ok(outcome) => {
            println!("Up to date records after changes: {}", outcome.records);
            info!("Change {} committed", outcome.change_id);
            CloudnsExitCode::Success
        }
        Err(e) if e.is_config() => {
            eprintln!("{}", e);
            CloudnsExitCode::ConfigError
        }
        Err(e) => {
            eprintln!("{}", e);
            CloudnsExitCode::RuntimeError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_parses_comma_separated_ips() {
        let cli = Cli::try_parse_from([
            "cloudns", "--zone", "my-zone", "add", "-d", "example.com", "-i", "1.1.1.1,2.2.2.2",
        ])
        .unwrap();

        match cli.command {
            Command::Add(args) => {
                assert_eq!(args.domain, "example.com");
                assert_eq!(args.addresses(), vec!["1.1.1.1", "2.2.2.2"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_remove_uses_its_own_flags() {
        let cli = Cli::try_parse_from([
            "cloudns", "remove", "--domain", "b.example.com", "--ip", "9.9.9.9",
        ])
        .unwrap();

        match cli.command {
            Command::Remove(args) => {
                assert_eq!(args.domain, "b.example.com");
                assert_eq!(args.addresses(), vec!["9.9.9.9"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_ip_is_rejected_by_parser() {
        let result =
            Cli::try_parse_from(["cloudns", "add", "-d", "example.com", "-i", "not-an-ip"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_ip_flag_is_required() {
        assert!(Cli::try_parse_from(["cloudns", "add", "-d", "example.com"]).is_err());
    }

    #[test]
    fn test_usage_errors_exit_with_config_error() {
        let invalid_ip = [
            "cloudns", "add", "-d", "example.com", "-i", "not-an-ip",
        ];
        let missing_ip = ["cloudns", "add", "-d", "example.com"];
        let missing_domain = ["cloudns", "remove", "-i", "1.1.1.1"];
        let no_command = ["cloudns"];

        for args in [&invalid_ip[..], &missing_ip[..], &missing_domain[..], &no_command[..]] {
            let err = Cli::try_parse_from(args).unwrap_err();
            assert_eq!(usage_exit_code(&err), CloudnsExitCode::ConfigError, "{args:?}");
            assert_eq!(usage_exit_code(&err) as u8, 1);
        }
    }

    #[test]
    fn test_help_and_version_exit_successfully() {
        for flag in ["--help", "--version"] {
            let err = Cli::try_parse_from(["cloudns", flag]).unwrap_err();
            assert_eq!(usage_exit_code(&err), CloudnsExitCode::Success, "{flag}");
        }
    }

    #[test]
    fn test_configs_from_flags() {
        let cli = Cli::try_parse_from([
            "cloudns",
            "--zone",
            "my-zone",
            "--project",
            "my-project",
            "--ttl",
            "300",
            "--record-type",
            "aaaa",
            "--retries",
            "5",
            "add",
            "-d",
            "example.com",
            "-i",
            "2001:db8::1",
        ])
        .unwrap();

        let (provider, retry) = cli.configs().unwrap();
        assert_eq!(provider.zone, "my-zone");
        assert_eq!(provider.project.as_deref(), Some("my-project"));
        assert_eq!(provider.ttl, 300);
        assert_eq!(provider.record_type, RecordType::Aaaa);
        assert_eq!(retry.max_attempts, 5);
    }

    #[test]
    fn test_invalid_retry_count_is_config_error() {
        let cli = Cli::try_parse_from([
            "cloudns", "--zone", "z", "--retries", "0", "add", "-d", "example.com", "-i", "1.1.1.1",
        ])
        .unwrap();
        assert!(cli.configs().is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), Level::DEBUG);
        assert!(parse_log_level("loud").is_err());
    }
}
