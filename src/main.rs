use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use velolink::config::{self, AppConfig};
use velolink::dispatch::{Dispatcher, DispatcherHandle};
use velolink::keys::{log_key_strokes, KeySimulator};
use velolink::telemetry::{JsonReportWriter, TelemetryService};
use velolink::transport;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = config::config_path()?;
    let first_run = !config_path.exists();
    let mut config = AppConfig::load_or_create(&config_path).await?;
    setup_logging_env(config.logging.max_level());
    if first_run {
        info!("Wrote default config to {}", config_path.display());
    } else {
        info!("Loaded config from {}", config_path.display());
    }

    // a device path on the command line wins over the config file
    if let Some(device) = std::env::args_os().nth(1) {
        config.transport.device = Some(device.into());
    }

    // Key output
    let (stroke_tx, stroke_rx) = mpsc::channel(100);
    let simulator = Arc::new(KeySimulator::new(config.keys.clone(), stroke_tx));
    let key_sink = tokio::spawn(log_key_strokes(stroke_rx));

    // Telemetry
    let report_dir = config.report_dir();
    info!("Session reports go to {}", report_dir.display());
    let telemetry = TelemetryService::start(
        &config.telemetry,
        Arc::new(JsonReportWriter::new(report_dir)),
    );

    // Dispatcher
    let dispatcher = Dispatcher::new(
        simulator,
        telemetry.handle(),
        &config.dispatch,
        config.telemetry.wheel_diameter_mm,
    );
    let mut dispatcher_handle =
        DispatcherHandle::spawn(dispatcher, config.transport.channel_capacity);
    let client = dispatcher_handle.client();

    match client.select_mode(&config.dispatch.game_mode).await {
        Ok(mode) => info!("Game mode: {} ({})", mode.name, mode.id),
        Err(e) => warn!("Ignoring configured game mode: {}", e),
    }
    for mode in client.list_modes().await? {
        info!("Available mode {}: {}", mode.id, mode.description);
    }

    if config.dispatch.processing_enabled {
        client.enable_processing().await?;
    } else {
        warn!("Data processing is disabled, lines will be buffered (dispatch.processing_enabled)");
    }

    let source = transport::open_source(config.transport.device.as_deref())
        .await
        .map_err(|e| eyre!("Failed to open transport: {}", e))?;

    tokio::select! {
        result = transport::forward_lines(source, client.clone()) => match result {
            Ok(lines) => info!("Transport closed after {} lines", lines),
            Err(e) => error!("Transport failed: {}", e),
        },
        _ = tokio::signal::ctrl_c() => info!("Interrupt received, shutting down"),
    }

    let status = client.status().await?;
    info!(
        "Final dispatch state: enabled {}, {} pending, mode {}",
        status.enabled, status.pending_count, status.current_mode.id
    );
    drop(client);
    dispatcher_handle.shutdown().await?;

    if let Some(report) = telemetry.shutdown().await? {
        info!(
            "Max speed {}, average {}, distance {}",
            report.speed_metrics.max_speed,
            report.speed_metrics.avg_speed,
            report.distance_metrics.total_distance_km
        );
    }

    if let Err(e) = key_sink.await {
        warn!("Key output task ended abnormally: {}", e);
    }
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
