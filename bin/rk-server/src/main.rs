//! Rolekeeper Server
//!
//! Serves the role management REST API.
//!
//! ## Configuration
//!
//! Settings come from a TOML file (see `rk_config::ConfigLoader` for the
//! search order) and `ROLEKEEPER_*` environment variables.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ROLEKEEPER_CONFIG` | - | Path to the config file |
//! | `ROLEKEEPER_HTTP_PORT` | `8080` | HTTP port |
//! | `ROLEKEEPER_MONGODB_URI` | `mongodb://localhost:27017` | MongoDB connection URI |
//! | `ROLEKEEPER_MONGODB_DATABASE` | `rolekeeper` | MongoDB database name |
//! | `ROLEKEEPER_STORE` | `mongodb` | `mongodb` or `memory` |
//! | `LOG_FORMAT` | `text` | `json` for structured logs |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use rk_config::AppConfig;
use rk_platform::shared::indexes::initialize_indexes;
use rk_platform::{
    platform_router, HealthState, InMemoryRoleRepository, MongoRoleRepository, RoleRepository,
    RoleService, RoleServiceConfig, RolesState, UniquenessCheck,
};

#[tokio::main]
async fn main() -> Result<()> {
    rk_common::logging::init_logging("rk-server");

    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        store = %config.store,
        uniqueness = %config.roles.uniqueness,
        cascade_delete = config.roles.cascade_delete,
        reject_cycles = config.roles.reject_cycles,
        "Starting Rolekeeper server"
    );

    let (repo, db) = if config.uses_memory_store() {
        warn!("Using in-memory role store; roles are lost on shutdown");
        let repo: Arc<dyn RoleRepository> = Arc::new(InMemoryRoleRepository::new());
        (repo, None)
    } else {
        info!("Connecting to MongoDB...");
        let client = mongodb::Client::with_uri_str(&config.mongodb.uri)
            .await
            .context("Failed to connect to MongoDB")?;
        let db = client.database(&config.mongodb.database);
        info!(database = %config.mongodb.database, "Connected to MongoDB");

        initialize_indexes(&db, &config.mongodb.collection)
            .await
            .context("Failed to initialize MongoDB indexes")?;

        let repo: Arc<dyn RoleRepository> =
            Arc::new(MongoRoleRepository::new(&db, &config.mongodb.collection));
        (repo, Some(db))
    };

    let service_config = RoleServiceConfig {
        uniqueness: config
            .roles
            .uniqueness
            .parse::<UniquenessCheck>()
            .map_err(anyhow::Error::msg)?,
        cascade_delete: config.roles.cascade_delete,
        reject_cycles: config.roles.reject_cycles,
    };
    let service = Arc::new(RoleService::new(repo, service_config));

    let health_state = HealthState::new(db, Some(env!("CARGO_PKG_VERSION").to_string()));
    let app = platform_router(RolesState::new(service), health_state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.http.cors_origins));

    let addr = config.http.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on http://{}", addr);
    info!("Swagger UI at http://{}/swagger-ui", addr);

    health_state.set_ready();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Rolekeeper server shutdown complete");
    Ok(())
}

/// Allow any origin unless specific origins are configured.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received...");
}
