//! VRI Planner - Backend Server
//!
//! Hosts the editing workspaces of variable-rate irrigation systems: sprinkler
//! zone drafting, management zones over the cell grid, and prescription
//! rate editing. Storage and grid generation stay with the upstream services.

use axum::{routing::get, Router};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod external;
mod handlers;
mod routes;
mod services;

pub use config::Config;

use external::UpstreamClient;
use services::{PrescriptionService, WorkspaceService, WorkspaceStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub upstream: UpstreamClient,
    pub workspaces: Arc<WorkspaceStore>,
}

impl AppState {
    pub fn workspace_service(&self) -> WorkspaceService {
        WorkspaceService::new(
            self.workspaces.clone(),
            self.upstream.clone(),
            self.config.planner.boundary_mode,
        )
    }

    pub fn prescription_service(&self) -> PrescriptionService {
        PrescriptionService::new(self.workspace_service(), self.upstream.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vri_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    tracing::info!("Starting VRI Planner Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!(
        "Upstream services: geometry {}, pivot {}, prescription {}",
        config.upstream.geometry_url,
        config.upstream.pivot_url,
        config.upstream.prescription_url
    );

    let upstream = UpstreamClient::new(&config.upstream)?;

    // Create application state
    let state = AppState {
        config: Arc::new(config.clone()),
        upstream,
        workspaces: Arc::new(WorkspaceStore::new()),
    };

    // Build application
    let app = create_app(state, Duration::from_secs(config.server.request_timeout_secs));

    // Start server
    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState, request_timeout: Duration) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "VRI Planner API v1.0"
}
