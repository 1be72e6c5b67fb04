//! Exhibition Service - exhibition aggregate backend API
//!
//! Serves the exhibition aggregate over HTTP and runs the background
//! visibility sweep and reconciliation jobs.

use std::net::SocketAddr;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exhibition_service::api::{self, AppState};
use exhibition_service::domain::Clock;
use exhibition_service::jobs::JobScheduler;
use exhibition_service::store::Collections;
use exhibition_service::{db, AggregateRepository, Config, ExhibitionService};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exhibition_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the application router
fn build_router(state: AppState) -> Router {
    // Axum layers run last-added first: caller -> logging -> handler
    let api_routes = api::create_router()
        .layer(middleware::from_fn(api::middleware::logging_middleware))
        .layer(middleware::from_fn(api::middleware::caller_middleware));

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(environment = %config.environment, "Starting exhibition service");
    tracing::info!("Connecting to databases...");

    let pool = db::connect(&config, &config.database_url).await?;
    let comment_pool = db::connect(&config, &config.comment_database_url).await?;

    db::verify_connection(&pool).await?;
    db::verify_connection(&comment_pool).await?;

    if !db::check_schema(&pool, &db::EXHIBITION_TABLES).await? {
        tracing::error!("Exhibition schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Exhibition schema incomplete"));
    }
    if !db::check_schema(&comment_pool, &db::COMMENT_TABLES).await? {
        tracing::error!("Comment schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Comment schema incomplete"));
    }

    tracing::info!("Databases connected successfully");

    let repository = AggregateRepository::new(
        Collections::postgres(pool.clone(), comment_pool.clone()),
        Clock::new(config.sweep_timezone),
    )
    .with_timeout(config.database_timeout);

    let scheduler = JobScheduler::with_config(repository.clone(), config.scheduler()).start();

    let app = build_router(AppState::new(ExhibitionService::new(repository)));

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    scheduler.shutdown().await;
    pool.close().await;
    comment_pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
