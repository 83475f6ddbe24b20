//! event-registration server entry point.
//!
//! Wires storage, services and routes for the configured role and starts
//! the Axum HTTP server. SIGINT or SIGTERM stops accepting connections and
//! gives in-flight requests `SHUTDOWN_GRACE_SECS` to finish.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use event_registration::api;
use event_registration::app_state::AppState;
use event_registration::auth::IdentityVerifier;
use event_registration::config::{ServiceConfig, ServiceRole};
use event_registration::persistence::postgres::run_migrations;
use event_registration::persistence::{
    EventStore, InMemoryEventStore, InMemoryLedger, PostgresEventStore, PostgresLedger,
    RegistrationLedger,
};
use event_registration::rpc::{CapacityClient, HttpCapacityClient, LocalCapacityClient};
use event_registration::service::{CapacityService, RegistrationCoordinator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServiceConfig::from_env().context("invalid configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        addr = %config.listen_addr,
        role = ?config.role,
        persistence = config.persistence_enabled,
        "starting event-registration"
    );
    if config.auth_secret_is_default {
        tracing::warn!("AUTH_SECRET not set; using the development secret");
    }

    // Build storage
    let (event_store, ledger) = build_stores(&config).await?;

    // Build service layer
    let identity = Arc::new(IdentityVerifier::new(config.auth_secret.as_bytes()));
    let capacity = Arc::new(CapacityService::new(event_store));
    let app_state = match config.role {
        ServiceRole::Event => AppState::for_capacity(capacity, identity),
        ServiceRole::Registration => {
            let client = HttpCapacityClient::new(
                config.capacity_service_url.clone(),
                config.capacity_rpc_timeout,
            )
            .context("failed to build capacity client")?;
            tracing::info!(url = %config.capacity_service_url, "capacity calls go over HTTP");
            let coordinator = coordinator(ledger, Arc::new(client), &config);
            AppState::for_registration(coordinator, identity)
        }
        ServiceRole::Standalone => {
            let client = LocalCapacityClient::new(Arc::clone(&capacity));
            let coordinator = coordinator(ledger, Arc::new(client), &config);
            AppState::standalone(capacity, coordinator, identity)
        }
    };

    // Build router
    let app = with_swagger(api::build_router(config.role))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            joined??;
            tracing::warn!("server stopped without a shutdown signal");
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    tracing::info!(
        grace_secs = config.shutdown_grace.as_secs(),
        "shutting down; draining in-flight requests"
    );
    let _ = stop_tx.send(());
    match tokio::time::timeout(config.shutdown_grace, &mut server).await {
        Ok(joined) => {
            joined??;
            tracing::info!("server stopped");
        }
        Err(_) => {
            tracing::warn!("grace period elapsed; aborting remaining requests");
            server.abort();
        }
    }

    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

fn coordinator(
    ledger: Arc<dyn RegistrationLedger>,
    client: Arc<dyn CapacityClient>,
    config: &ServiceConfig,
) -> Arc<RegistrationCoordinator> {
    Arc::new(RegistrationCoordinator::new(
        ledger,
        client,
        config.capacity_rpc_timeout,
    ))
}

async fn build_stores(
    config: &ServiceConfig,
) -> anyhow::Result<(Arc<dyn EventStore>, Arc<dyn RegistrationLedger>)> {
    if !config.persistence_enabled {
        tracing::info!("persistence disabled; using in-memory stores");
        return Ok((
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryLedger::new()),
        ));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;
    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!("connected to PostgreSQL; migrations applied");

    Ok((
        Arc::new(PostgresEventStore::new(pool.clone())),
        Arc::new(PostgresLedger::new(pool)),
    ))
}

#[cfg(feature = "swagger-ui")]
fn with_swagger(router: Router<AppState>) -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::ApiDoc::openapi()))
}

#[cfg(not(feature = "swagger-ui"))]
fn with_swagger(router: Router<AppState>) -> Router<AppState> {
    router
}
