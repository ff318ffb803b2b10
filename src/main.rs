use std::sync::Arc;

use lambda_runtime::{run, service_fn, Error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ecr_image_replicator::handler::handle;
use ecr_image_replicator::registry::ecr::EcrRegistry;
use ecr_image_replicator::replicator::Replicator;
use ecr_image_replicator::settings::Settings;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; a bad environment fails the function before any
    // network call is made.
    let settings = match Settings::new() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!(
        "Replicating {} from {} ({}) to {} ({})",
        settings.repo_name,
        settings.source_account_id,
        settings.source_region,
        settings.destination_account_id,
        settings.destination_region
    );

    let source = Arc::new(EcrRegistry::new(settings.source()).await);
    let destination = Arc::new(EcrRegistry::new(settings.destination()).await);
    let replicator = Replicator::new(source, destination, settings.repo_name.clone());

    run(service_fn(|event| handle(event, &replicator))).await
}
