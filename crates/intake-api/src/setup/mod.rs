//! Application setup: pipeline construction, routes and server.

pub mod routes;
pub mod server;

use axum::Router;
use intake_core::IntakeConfig;
use intake_services::UploadCoordinator;

use crate::state::AppState;

/// Validate configuration, build the upload pipeline and the router.
pub async fn initialize_app(config: IntakeConfig) -> Result<(AppState, Router), anyhow::Error> {
    config.validate()?;

    let coordinator = UploadCoordinator::from_config(&config).await?;
    let state = AppState::new(coordinator, config);
    let router = routes::setup_routes(state.clone());

    tracing::info!(
        environment = %state.config.server.environment,
        uploads_root = %state.coordinator.stager().uploads_root().display(),
        "Application initialized"
    );

    Ok((state, router))
}
