use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use icetime::ledger::Ledger;
use icetime::{http, maintenance, seed};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("ICETIME_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    icetime::observability::init(metrics_port);

    let port = std::env::var("ICETIME_PORT").unwrap_or_else(|_| "8080".into());
    let bind = std::env::var("ICETIME_BIND").unwrap_or_else(|_| "0.0.0.0".into());
    let data_dir = std::env::var("ICETIME_DATA_DIR").unwrap_or_else(|_| "./data".into());
    let compact_threshold: u64 = std::env::var("ICETIME_COMPACT_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;

    let ledger = Arc::new(Ledger::new(
        PathBuf::from(&data_dir).join("ledger.journal"),
    )?);

    let seeded = seed::seed_if_empty(&ledger).await?;
    if seeded > 0 {
        info!("seeded {seeded} facilities into an empty directory");
    }

    let compactor = ledger.clone();
    tokio::spawn(async move {
        maintenance::run_compactor(compactor, compact_threshold).await;
    });

    let app = http::router(ledger);
    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("icetime listening on {addr}");
    info!("  data_dir: {data_dir}");
    info!("  compact_threshold: {compact_threshold}");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("icetime stopped");
    Ok(())
}

/// Resolve on SIGTERM/ctrl-c so in-flight requests drain before exit.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
