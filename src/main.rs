// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lets_play_server::{
    api::{router, users::ensure_seed_admin},
    config::Config,
    maintenance::Sweeper,
    state::AppState,
};

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into()))
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .init();
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received, starting graceful shutdown");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::from_env()?;
    if config.jwt_secret_generated {
        warn!("JWT_SECRET not set; using a random secret, tokens will not survive a restart");
    }
    info!(?config, "Configuration loaded");

    let state = AppState::from_config(&config)?;

    if let Some(seed) = &config.seed_admin {
        if ensure_seed_admin(&state, seed).await.map_err(|e| e.message)? {
            info!(email = %seed.email, "Seed admin created");
        }
    }

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(Sweeper::new(&state).run(shutdown.clone()));

    let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    info!(addr = %listener.local_addr()?, "Let's Play server listening (docs at /docs)");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Maintenance sweeper did not stop cleanly");
    }

    Ok(())
}
