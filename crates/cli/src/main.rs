mod cli;
mod ffmpeg;
mod metrics;

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aspiratv_core::config::write_default_config;
use aspiratv_core::{
    load_config, validate_config, DownloadTarget, ProviderRegistry, SanitizedConfig,
    ScanContext, ScanOrchestrator, ScanReport, SeenStore, SqliteSeenStore,
};

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Initialize logging
    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config_path();

    if cli.write_config {
        write_default_config(&config_path)
            .with_context(|| format!("Failed to write starter config to {:?}", config_path))?;
        info!("Starter configuration written to {:?}", config_path);
        return Ok(());
    }

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    debug!(
        "Configuration: {}",
        serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default()
    );

    let debug_mode = cli.debug || config.debug;

    match ffmpeg::locate(config.ffmpeg.path.as_deref()).await {
        Ok(found) => info!("Using ffmpeg {} at {:?}", found.version, found.path),
        Err(e) => warn!("ffmpeg unavailable, downloads will fail: {}", e),
    }

    // Providers
    let registry = ProviderRegistry::builtin();
    registry
        .configure(&config.providers)
        .context("Invalid provider settings")?;
    registry.set_debug(debug_mode);
    validate_config(&config, &registry).context("Configuration validation failed")?;

    let active = config.active_providers();
    if active.is_empty() {
        warn!("No enabled provider is referenced by the watch list, nothing to scan");
    } else {
        info!("Active providers: {}", active.join(", "));
    }

    // Seen store
    let seen: Option<Arc<dyn SeenStore>> = match &config.cache {
        Some(cache) => {
            let store: Arc<dyn SeenStore> = Arc::new(
                SqliteSeenStore::new(&cache.path)
                    .with_context(|| format!("Failed to open seen store {:?}", cache.path))?,
            );
            info!("Seen store initialized at {:?}", cache.path);
            Some(store)
        }
        None => None,
    };
    let seen_keys = match &seen {
        Some(store) => store.keys().context("Failed to read seen store")?,
        None => Vec::new(),
    };

    let orchestrator = ScanOrchestrator::new(
        Arc::new(registry),
        config.watch_list.clone(),
        config.destinations.clone(),
        config.scan.clone(),
    )
    .with_active_providers(active)
    .with_seen(seen_keys);

    // Ctrl+C / SIGTERM cancel the scan; providers get the grace period to stop.
    let ctx = ScanContext::new();
    let interrupt = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            warn!("Interrupted, cancelling scan");
            ctx.cancel();
        })
    };

    let report = orchestrator.run(&ctx).await.context("Scan failed")?;

    let emitted = if cli.dry_run {
        print_accepted(&report)?
    } else {
        let (targets, failures) = orchestrator.resolve_all(&ctx, &report).await;
        for (accepted, e) in &failures {
            warn!("Skipping {}: {}", accepted.show, e);
        }
        let emitted = print_targets(&targets)?;

        if let Some(store) = &seen {
            record_seen(store.as_ref(), &report, &targets);
        }
        emitted
    };

    interrupt.abort();

    let outcome = if report.cancelled {
        "cancelled"
    } else if report.provider_errors.is_empty() {
        "success"
    } else {
        "partial"
    };
    metrics::RUNS_TOTAL.with_label_values(&[outcome]).inc();
    metrics::TARGETS_EMITTED.set(emitted as i64);

    for (provider, e) in &report.provider_errors {
        warn!("Provider {} failed: {}", provider, e);
    }
    info!(
        "Run {}: {} accepted, {} duplicates, {} unmatched, {} emitted in {} ms",
        outcome,
        report.accepted.len(),
        report.duplicates,
        report.unmatched,
        emitted,
        report.duration_ms
    );

    if let Some(path) = &cli.metrics_file {
        std::fs::write(path, metrics::encode_metrics())
            .with_context(|| format!("Failed to write metrics to {:?}", path))?;
    }

    Ok(())
}

/// Print accepted shows as JSON lines.
fn print_accepted(report: &ScanReport) -> Result<usize> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for accepted in &report.accepted {
        writeln!(out, "{}", serde_json::to_string(accepted)?)?;
    }
    Ok(report.accepted.len())
}

/// Print download targets as JSON lines, skipping episodes already on disk.
fn print_targets(targets: &[DownloadTarget]) -> Result<usize> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let (emitted, on_disk) = write_targets(&mut out, targets)?;
    metrics::ALREADY_DOWNLOADED.set(on_disk as i64);
    Ok(emitted)
}

/// Write targets whose output file is missing. Returns (emitted, on disk).
///
/// Only the exact output file counts as downloaded. Other files of the same
/// show are logged as a possible conflict and the target is still emitted.
fn write_targets<W: Write>(out: &mut W, targets: &[DownloadTarget]) -> Result<(usize, usize)> {
    let mut emitted = 0;
    let mut on_disk = 0;

    for target in targets {
        if target.already_downloaded() {
            debug!("Already downloaded: {:?}", target.output_path());
            on_disk += 1;
            continue;
        }
        match target.existing_show_files() {
            Ok(others) if !others.is_empty() => debug!(
                "{} has {} other file(s) of the same show in {:?}, possible conflict with {:?}",
                target.file_name,
                others.len(),
                target.destination_path,
                others[0]
            ),
            Ok(_) => {}
            Err(e) => warn!("Cannot list {:?}: {}", target.destination_path, e),
        }
        writeln!(out, "{}", serde_json::to_string(target)?)?;
        emitted += 1;
    }

    Ok((emitted, on_disk))
}

/// Record resolved shows so later runs treat them as duplicates.
fn record_seen(store: &dyn SeenStore, report: &ScanReport, targets: &[DownloadTarget]) {
    let resolved: HashSet<(&str, &str)> = targets
        .iter()
        .map(|t| (t.provider.as_str(), t.show_id.as_str()))
        .collect();

    let mut recorded = 0;
    for accepted in &report.accepted {
        let id = (accepted.show.provider.as_str(), accepted.show.id.as_str());
        if !resolved.contains(&id) {
            continue;
        }
        match store.insert(&accepted.show, &accepted.destination) {
            Ok(true) => recorded += 1,
            Ok(false) => {}
            Err(e) => warn!("Cannot record {} as seen: {}", accepted.show, e),
        }
    }
    debug!("Recorded {} shows in the seen store", recorded);
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
