//! HTTP daemon for the production line engine.
//!
//! One periodic timer drives the tick accumulator; handoff calls arrive
//! concurrently over HTTP from scanner clients and serialize per station
//! inside the store.

mod routes;
mod state;
mod tick_loop;

use anyhow::{Context, Result};
use clap::Parser;
use line_core::{Line, MemoryStore};
use state::{wall_clock_now, AppState};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "line_daemon", about = "Production line zone tracking daemon")]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Number of main-line zones (the maintenance zone is always added).
    #[arg(long, default_value_t = 8)]
    zones: u32,

    /// Tick period in milliseconds.
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,

    /// Allowed CORS origin for the dashboard UI.
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,

    /// Switch the line on at startup instead of waiting for a toggle call.
    #[arg(long)]
    start_on: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let now = wall_clock_now();

    let store = Arc::new(MemoryStore::new(args.zones, now));
    let line = Arc::new(Line::new(store));
    if args.start_on {
        line.toggle_system(true, None, now)
            .context("switching line on at startup")?;
    }

    let (event_tx, _) = tokio::sync::broadcast::channel(256);
    let app_state = AppState { line, event_tx };

    tokio::spawn(tick_loop::run_tick_loop(app_state.clone(), args.tick_ms));

    let router = routes::make_router_with_cors(app_state, &args.cors_origin);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, zones = args.zones, tick_ms = args.tick_ms, "line_daemon listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("serving HTTP")?;

    Ok(())
}
