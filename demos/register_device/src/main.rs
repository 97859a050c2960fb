use model::config::RegistrationConfig;
use model::env::PUSH_DEVICE_TOKEN;
use model::{DeviceToken, Error};
use platform_sns::SnsPushPlatform;
use presenter::TracingPresenter;
use registration::{Reconciler, RegistrationOrchestrator, TriggerResult};
use state_file::FileEndpointStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config: RegistrationConfig = RegistrationConfig::from_env()?;

    // Accepts the raw form the OS prints, e.g. "<a1b2 c3d4>"
    let raw_token: String = std::env::var(PUSH_DEVICE_TOKEN)
        .map_err(|_| format!("Missing {PUSH_DEVICE_TOKEN} environment variable"))?;
    let token: DeviceToken = DeviceToken::from_description(&raw_token)?;

    let platform: SnsPushPlatform = SnsPushPlatform::from_config(&config).await;
    let store: FileEndpointStore = FileEndpointStore::new(config.endpoint_state_path.clone());

    let orchestrator: RegistrationOrchestrator = RegistrationOrchestrator::new(
        Reconciler::new(Arc::new(platform), Arc::new(store)),
        Arc::new(TracingPresenter),
    );

    match orchestrator.on_device_token(token).await {
        TriggerResult::Completed(outcome) => {
            tracing::info!(?outcome, status = ?orchestrator.status(), "Registration finished")
        }
        TriggerResult::Deferred => tracing::info!("Registration deferred"),
    }

    Ok(())
}
