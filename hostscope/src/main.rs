use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use hostscope_core::{CacheCoordinator, CliConfig, Config};
use std::{path::PathBuf, process, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let matches = Command::new("hostscope")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Host telemetry server - OS identity and resource stats over HTTP")
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("ADDR")
                .help("Address to bind"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .value_name("N")
                .env("SERVER_PORT")
                .help("Port to listen on")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("platform")
                .long("platform")
                .value_name("ID")
                .help("Collect as if running on this platform (linux, windows, macos)"),
        )
        .arg(
            Arg::new("cache-errors-independently")
                .long("cache-errors-independently")
                .help("Expire cached error snapshots after their own short lifetime")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .value_name("FILTER")
                .help("tracing filter, e.g. info or hostscope_core=debug"),
        )
        .get_matches();

    let cli_config = CliConfig {
        host: matches.get_one::<String>("host").cloned(),
        port: matches.get_one::<u16>("port").copied(),
        platform: matches.get_one::<String>("platform").cloned(),
        cache_errors_independently: matches.get_flag("cache-errors-independently"),
        log_filter: matches.get_one::<String>("log").cloned(),
    };

    let config = Config::load(Some(&cli_config), matches.get_one::<PathBuf>("config"))?;
    init_logging(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    runtime.block_on(async {
        let coordinator = Arc::new(CacheCoordinator::from_config(&config));
        info!(
            platform = %coordinator.platform(),
            soft_ttl_secs = config.stats_soft_ttl_secs,
            hard_ttl_secs = config.stats_hard_ttl_secs,
            "starting hostscope"
        );
        hostscope_http::serve(&config, coordinator).await.map_err(|e| {
            error!(error = %e, "server failed");
            e
        })
    })
}

/// `RUST_LOG` wins over the configured filter
fn init_logging(config: &Config) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .with_context(|| format!("invalid log filter {:?}", config.log_filter))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {}", e))
}
