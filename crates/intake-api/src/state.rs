//! Application state shared by handlers.

use std::sync::Arc;

use intake_core::IntakeConfig;
use intake_services::UploadCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<UploadCoordinator>,
    pub config: Arc<IntakeConfig>,
}

impl AppState {
    pub fn new(coordinator: UploadCoordinator, config: IntakeConfig) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            config: Arc::new(config),
        }
    }
}
