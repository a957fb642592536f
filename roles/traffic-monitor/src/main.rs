use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use traffic_monitor::{
    api,
    args::{Args, Command},
    config::MonitorConfig,
    console::{render_service_hint, render_sys_stats, ConsoleReporter},
    shutdown, MonitorReporter, ReportStore,
};
use traffic_stats::{StatsPoller, TransportErrorKind};
use v2ray_stats_client::StatsClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup tracing with optional file output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt().with_env_filter(env_filter);

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .map_err(|e| format!("Failed to open log file {}: {}", log_file.display(), e))?;
        fmt_layer
            .with_ansi(false)
            .with_writer(std::sync::Arc::new(file))
            .init();
    } else {
        fmt_layer.with_writer(std::io::stderr).init();
    }

    let config = args.load_config()?;
    let client = StatsClient::connect_lazy(&config.client_config())?;

    match args.command() {
        Command::Watch => watch(config, client).await,
        Command::Dump { pattern, reset } => {
            let pattern = pattern.unwrap_or_else(|| config.query.pattern.clone());
            dump(client, &pattern, reset || config.query.reset).await
        }
        Command::Sys => sys(client).await,
    }
}

async fn watch(
    config: MonitorConfig,
    client: StatsClient,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting traffic monitor");
    info!("Stats API: {} ({})", client.address(), client.service_name());
    info!(
        "Monitoring inbounds {:?}, outbounds {:?}",
        config.monitor.inbounds, config.monitor.outbounds
    );
    if config.monitor.all_inbounds || config.monitor.all_outbounds {
        info!(
            "Reporting all tags: inbounds={} outbounds={}",
            config.monitor.all_inbounds, config.monitor.all_outbounds
        );
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown::cancel_on_interrupt(
        tokio::signal::ctrl_c(),
        cancel.clone(),
    ));

    let store = match &config.http.listen_address {
        Some(address) => {
            let store = Arc::new(ReportStore::new());
            let address = address.clone();
            let http_store = store.clone();
            let threshold = config.http.staleness_threshold_secs;
            let http_cancel = cancel.clone();
            tokio::spawn(async move {
                if let Err(e) =
                    api::run_http_server(address, http_store, threshold, http_cancel).await
                {
                    error!("HTTP server error: {}", e);
                }
            });
            Some(store)
        }
        None => None,
    };

    let reporter = MonitorReporter::new(ConsoleReporter::new(std::io::stdout()), store);
    let mut poller = StatsPoller::new(
        client,
        reporter,
        config.monitored_set(),
        config.poll_config(),
    );
    let stats = poller.run(&cancel).await;

    if stats.successes == 0 && stats.attempts > 0 {
        warn!("No successful poll during this run");
    }
    Ok(())
}

async fn dump(
    mut client: StatsClient,
    pattern: &str,
    reset: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stats = match client.query_stats(pattern, reset).await {
        Ok(stats) => stats,
        Err(e) => {
            if e.transport_kind() == Some(TransportErrorKind::UnknownMethod) {
                eprint!("{}", render_service_hint());
            }
            return Err(e.into());
        }
    };
    stats.sort_by(|a, b| a.name.cmp(&b.name));
    for stat in &stats {
        println!("{}: {}", stat.name, stat.value);
    }
    info!("{} counters", stats.len());
    Ok(())
}

async fn sys(mut client: StatsClient) -> Result<(), Box<dyn std::error::Error>> {
    let stats = match client.sys_stats().await {
        Ok(stats) => stats,
        Err(e) => {
            if e.transport_kind() == Some(TransportErrorKind::UnknownMethod) {
                eprint!("{}", render_service_hint());
            }
            return Err(e.into());
        }
    };
    print!("{}", render_sys_stats(&stats));
    Ok(())
}
