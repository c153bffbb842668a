//! Replay a recorded capture session through the composition engine.
//!
//! Usage: `tryangle-replay <session.json>`
//!
//! Prints one JSON line per frame followed by a summary line. Engine
//! thresholds come from `TRYANGLE_*` environment variables.

mod replay;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tryangle_engine::EngineConfig;

fn init_tracing() -> Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("tryangle=info".parse()?)
        .add_directive("tryangle_engine=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

fn init_metrics() -> Option<PrometheusHandle> {
    let enabled = std::env::var("METRICS_DUMP")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if !enabled {
        return None;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: tryangle-replay <session.json>");
    };

    let metrics = init_metrics();

    let config = EngineConfig::from_env();
    config.validate().context("invalid engine configuration")?;
    info!(
        compression_mode = config.compression_mode.as_str(),
        "Engine config loaded"
    );

    let session = replay::load(&path).await?;
    let base = path.parent().unwrap_or(Path::new("."));

    let summary = replay::run(&session, base, config, |line| {
        println!("{}", serde_json::to_string(line)?);
        Ok(())
    })
    .await?;

    println!("{}", serde_json::to_string(&summary)?);

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }
    Ok(())
}
