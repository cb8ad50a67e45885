//! Benefit Service
//!
//! REST API for the maternity benefit installment ledger

use anyhow::{Context, Result};
use benefit_service::{create_router, AppState, Config, Ledger, Notifier, Storage};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "benefit_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Benefit Service");
    info!("Redis URL: {}", config.redis_url);
    if let Some(url) = &config.notify_webhook_url {
        info!("Notification webhook: {}", url);
    }

    let storage = Storage::new(&config.redis_url)
        .await
        .context("Failed to initialize storage")?;

    let notifier = Notifier::new(config.notify_webhook_url.clone());

    let state = AppState {
        ledger: Mutex::new(Ledger::new(storage, notifier)),
    };

    let app = create_router(state);

    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Benefit Service API running on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
