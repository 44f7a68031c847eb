//! Clinical-records access guard server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use clinic_api::auth::{InMemoryUserDirectory, UserDirectory};
use clinic_api::repository::PgUserDirectory;
use clinic_api::{create_api_router, metrics_layer, setup_metrics_recorder, AppState};
use clinic_core::{init_logging, AppConfig, DatabaseConfig, LogConfig};

/// CORS_ORIGINS (comma separated) restricts allowed origins; unset allows any.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}

async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

fn create_router(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    request_timeout: Duration,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .merge(metrics_router)
        .merge(create_api_router().with_state(state))
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(cors_layer())
}

/// PostgreSQL directory when a URL is configured, otherwise an empty
/// in-memory one (nobody can log in).
async fn build_directory(
    config: &DatabaseConfig,
) -> anyhow::Result<(Arc<dyn UserDirectory>, &'static str)> {
    match &config.url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
                .connect(url)
                .await
                .context("failed to connect to the user directory database")?;
            info!("Connected to user directory database");
            let directory: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(pool));
            Ok((directory, "postgres"))
        }
        None => {
            warn!("DATABASE_URL not set, using an empty in-memory user directory");
            let directory: Arc<dyn UserDirectory> = Arc::new(InMemoryUserDirectory::new());
            Ok((directory, "in_memory"))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("failed to load configuration")?;

    init_logging(LogConfig::from(&config.logging))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    info!(
        environment = ?config.environment,
        algorithm = %config.auth.algorithm,
        token_ttl_minutes = config.auth.token_ttl_minutes,
        revalidate_subject = config.auth.revalidate_subject,
        "Starting clinic-api"
    );

    if config.auth.uses_default_secret() {
        warn!("==========================================================");
        warn!("Using the built-in development signing secret.");
        warn!("Tokens can be forged by anyone who has read this code.");
        warn!("Set SECRET_KEY before exposing this service.");
        warn!("==========================================================");
    }

    let metrics_handle =
        setup_metrics_recorder().context("failed to install Prometheus recorder")?;
    info!("Prometheus metrics recorder initialized");

    let (directory, backend) = build_directory(&config.database).await?;
    let state = Arc::new(AppState::new(&config.auth, directory).with_directory_backend(backend));

    let app = create_router(
        state,
        metrics_handle,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server.host / server.port")?;
    info!("Listening on http://{}", addr);
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
