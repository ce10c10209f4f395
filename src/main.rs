//! DNSBL audit CLI.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zentinel_dnsbl_audit::config::{NetworksFormat, ReportFormat};
use zentinel_dnsbl_audit::networks::load_networks;
use zentinel_dnsbl_audit::report::write_report;
use zentinel_dnsbl_audit::{Auditor, Config, HickoryResolver};

#[derive(Parser, Debug)]
#[command(name = "zentinel-dnsbl-audit")]
#[command(about = "Audit IPv4 networks against a DNS blocklist and report listed hosts and blocks")]
#[command(version)]
struct Args {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Network list, overrides the configured path
    #[arg(short, long)]
    networks: Option<PathBuf>,

    /// Network list format, overrides the configured format
    #[arg(long, value_enum)]
    networks_format: Option<NetworksFormat>,

    /// Report path, overrides the configured path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format, overrides the configured format
    #[arg(short, long, value_enum)]
    format: Option<ReportFormat>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: String,

    /// Print example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("{}", Config::example());
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            Config::load(path)?
        }
        None => Config::default(),
    };

    if let Some(path) = args.networks {
        config.networks.path = path;
    }
    if let Some(format) = args.networks_format {
        config.networks.format = format;
    }
    if let Some(path) = args.output {
        config.report.path = path;
    }
    if let Some(format) = args.format {
        config.report.format = format;
    }

    config.validate()?;

    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }

    let networks = load_networks(&config.networks.path, config.networks.format)?;

    let resolver = Arc::new(HickoryResolver::new(
        &config.resolver,
        config.settings.timeout(),
    ));
    let auditor = Auditor::new(&config, resolver);

    info!(
        zone = %config.settings.zone,
        networks = networks.len(),
        delay_ms = config.settings.query_delay_ms,
        "Starting DNSBL audit"
    );

    let report = auditor.run(&networks).await;

    write_report(&config.report.path, config.report.format, &report.rows)?;

    Ok(())
}
