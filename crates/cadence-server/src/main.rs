mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use cadence_api::mailer::Mailer;
use cadence_api::{AppState, AppStateInner, GoogleConfig};
use cadence_core::Planner;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = Arc::new(cadence_db::Database::open(&config.db_path)?);
    let planner = Arc::new(Planner::new(db, Arc::new(mockable::DefaultClock)));
    let http = reqwest::Client::new();

    let mailer = match &config.smtp {
        Some(settings) => Mailer::smtp(settings)?,
        None => {
            warn!("EMAIL_USER/EMAIL_PASSWORD not set; outgoing mail goes to the log");
            Mailer::Log
        }
    };

    if config.google.is_none() {
        info!("Google sign-in disabled");
    }

    let state: AppState = Arc::new(AppStateInner {
        planner,
        jwt_secret: config.jwt_secret.clone(),
        token_ttl: chrono::Duration::days(config.jwt_ttl_days),
        mailer,
        client_url: config.client_url.clone(),
        google: config.google.clone().map(|g| GoogleConfig {
            client_id: g.client_id,
            client_secret: g.client_secret,
            callback_url: g.callback_url,
        }),
        http,
    });

    let app = cadence_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Cadence server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
