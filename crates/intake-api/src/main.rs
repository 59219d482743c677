use intake_core::IntakeConfig;
use intake_infra::LogFormat;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = IntakeConfig::from_env()?;

    let log_format = config
        .server
        .log_format
        .parse::<LogFormat>()
        .unwrap_or_default();
    intake_infra::init_telemetry(log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    // Build the upload pipeline and routes
    let (_state, router) = intake_api::setup::initialize_app(config.clone()).await?;

    intake_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
