use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use outdial::dispatcher::{CallDispatcher, DispatcherConfig};
use outdial::providers::{JsonFileStore, TwilioClient};
use outdial::{create_router, AppState, Config};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "outdial", about = "Outbound calling agent with a compliance-aware retry queue")]
struct Args {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/outdial")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outdial=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = Arc::new(Config::load(&args.config).context("Failed to load config")?);

    info!("Outdial v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Calling hours: {}:00-{}:00, max attempts: {}",
        config.compliance.calling_hours_start,
        config.compliance.calling_hours_end,
        config.compliance.max_retry_attempts
    );

    let provider = Arc::new(TwilioClient::new(
        &config.twilio.account_sid,
        &config.twilio.auth_token,
        &config.twilio.phone_number,
    ));
    let store = Arc::new(JsonFileStore::new(&config.queue.store_path));
    let dispatcher = CallDispatcher::new(provider, store, DispatcherConfig::from_config(&config));

    // Log lifecycle notifications for operators
    let mut events = dispatcher.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(?event, "dispatcher"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event log lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let state = AppState::new(dispatcher, config.clone());
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
