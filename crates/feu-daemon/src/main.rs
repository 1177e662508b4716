//! feu-daemon entry point.
//!
//! Thin: tracing, layered config, Postgres pool + migrations, shared state,
//! middleware, HTTP server. Handlers live in `routes.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use feu_compliance::ComplianceService;
use feu_config::{ConfigSurface, UnusedKeyPolicy};
use feu_daemon::{routes, state};
use feu_db::PgStore;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Production injects env
    // vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cfg = feu_config::load_from_env()?;
    let report = feu_config::report_unused_keys(
        ConfigSurface::Daemon,
        &cfg.config_json,
        UnusedKeyPolicy::Warn,
    )?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "config has unused keys");
    }
    let policy = feu_config::compliance_policy_from_config(&cfg.config_json)?;
    let db = feu_config::resolve_database_settings(&cfg.config_json)?;
    info!(
        config_hash = %cfg.config_hash,
        ledger_scope = policy.ledger_scope.as_str(),
        db_url_env = %db.url_env,
        "config loaded"
    );

    let pool = feu_db::connect(&db.url, db.max_connections).await?;
    feu_db::migrate(&pool).await?;

    let service = ComplianceService::new(Arc::new(PgStore::new(pool)), policy);
    let shared = Arc::new(state::AppState::new(service).with_config_hash(cfg.config_hash.clone()));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr(&cfg.config_json);
    info!("feu-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// FEU_DAEMON_ADDR, then `/daemon/bind_addr`, then 127.0.0.1:8899.
fn bind_addr(config_json: &serde_json::Value) -> SocketAddr {
    std::env::var("FEU_DAEMON_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .or_else(|| {
            config_json
                .pointer("/daemon/bind_addr")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8899)))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
