//! unauth-check - replay captured traffic without credentials
//!
//! Runs the unauthenticated request check outside a proxy, against HAR
//! archives or raw request/response files.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use unauth_check::app::{Config, ReportFormat};
use unauth_check::error;
use unauth_check::host::{Exchange, LocalHost};
use unauth_check::reporting::{ReportMetadata, ScanReport};
use unauth_check::scanner::{register_extension, FindingFilter, Severity};
use unauth_check::traffic;

/// Replay captured requests without credentials and report endpoints that still answer 200
#[derive(Parser, Debug)]
#[command(name = "unauth-check")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "UNAUTH_CHECK_CONFIG", global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "UNAUTH_CHECK_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log file path (enables file logging)
    #[arg(long, env = "UNAUTH_CHECK_LOG_FILE", global = true)]
    log_file: Option<String>,

    /// Enable JSON structured logging
    #[arg(long, env = "UNAUTH_CHECK_LOG_JSON", global = true)]
    log_json: bool,

    /// Report format (defaults to the configured one)
    #[arg(short, long, value_enum, global = true)]
    format: Option<ReportFormat>,

    /// Only report findings at or above this severity
    #[arg(long, global = true)]
    min_severity: Option<String>,

    /// Only report findings whose URL contains this text
    #[arg(long, global = true)]
    url_contains: Option<String>,

    /// Additional header to strip before replaying (repeatable)
    #[arg(long = "strip", global = true)]
    strip: Vec<String>,

    /// Generate default configuration and exit
    #[arg(long)]
    generate_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan every entry of a HAR archive
    Har {
        /// HAR file
        file: PathBuf,
    },

    /// Scan one exchange stored as raw request and response files
    Raw {
        /// File holding the raw request
        #[arg(long)]
        request: PathBuf,

        /// File holding the raw response
        #[arg(long)]
        response: PathBuf,

        /// URL of the service the request was sent to
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "unauth-check failed");
            eprintln!("Error: {:#}", e);
            if let Some(hint) = error::hint(&e) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.generate_config {
        return generate_default_config();
    }

    init_logging(&cli)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting unauth-check");

    let config = load_config(&cli)?;

    if cli.validate_config {
        tracing::info!("Configuration is valid");
        println!("Configuration is valid");
        return Ok(());
    }

    let Some(command) = &cli.command else {
        anyhow::bail!("No traffic source given. Use `unauth-check har <file>` or `unauth-check raw`.");
    };

    let (source, exchanges) = load_traffic(command)?;
    run_scan(&cli, &config, source, exchanges).await
}

/// Initialize the logging system
fn init_logging(cli: &Cli) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if let Some(log_path) = &cli.log_file {
        let path = std::path::Path::new(log_path);
        let file_appender = match (path.parent(), path.file_name()) {
            (Some(dir), Some(name)) if !dir.as_os_str().is_empty() => {
                RollingFileAppender::new(Rotation::DAILY, dir, name)
            }
            _ => {
                let log_dir = Config::data_dir()
                    .map(|d| d.join("logs"))
                    .unwrap_or_else(|_| PathBuf::from("."));
                std::fs::create_dir_all(&log_dir).ok();
                RollingFileAppender::new(Rotation::DAILY, log_dir, log_path)
            }
        };

        if cli.log_json {
            let file_layer = fmt::layer()
                .json()
                .with_writer(file_appender)
                .with_ansi(false);

            subscriber.with(file_layer).init();
        } else {
            let file_layer = fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false);

            subscriber.with(file_layer).init();
        }
    } else if cli.log_json {
        // Reports go to stdout, logs to stderr
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

/// Load configuration with CLI overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    for header in &cli.strip {
        if !config
            .check
            .strip_headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(header))
        {
            config.check.strip_headers.push(header.clone());
        }
    }

    if let Some(format) = cli.format {
        config.general.report_format = format;
    }

    config.validate()?;

    Ok(config)
}

/// Generate default configuration file
fn generate_default_config() -> Result<()> {
    let config = Config::default();
    let toml = toml::to_string_pretty(&config)
        .context("Failed to serialize configuration")?;

    println!("{}", toml);
    Ok(())
}

fn load_traffic(command: &Command) -> Result<(String, Vec<Exchange>)> {
    match command {
        Command::Har { file } => {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read HAR file {}", file.display()))?;
            let exchanges = traffic::har::import(&content)?;
            Ok((file.display().to_string(), exchanges))
        }
        Command::Raw { request, response, url } => {
            let exchange = traffic::raw::load(request, response, url)?;
            Ok((url.clone(), vec![exchange]))
        }
    }
}

async fn run_scan(cli: &Cli, config: &Config, source: String, exchanges: Vec<Exchange>) -> Result<()> {
    let min_severity = match &cli.min_severity {
        Some(s) => Some(
            Severity::parse(s).with_context(|| format!("Unknown severity '{}'", s))?,
        ),
        None => None,
    };

    let host = LocalHost::new(&config.scanner)?;
    register_extension(host.clone(), &config.check);
    tracing::info!(
        extension = %host.extension_name().unwrap_or_default(),
        checks = ?host.check_names(),
        "Extension registered"
    );

    let start_time = Utc::now();
    let summary = host.scan_all(exchanges).await;
    let end_time = Utc::now();

    let filter = FindingFilter {
        min_severity,
        url_contains: cli.url_contains.clone(),
    };
    let findings = host
        .issues()
        .findings()
        .into_iter()
        .filter(|f| filter.matches(f))
        .collect();

    let metadata = ReportMetadata {
        title: config.general.report_title.clone(),
        source,
        start_time,
        end_time,
        ..Default::default()
    };

    let report = ScanReport::new(findings, &summary, metadata);
    println!("{}", report.render(config.general.report_format)?);

    Ok(())
}
