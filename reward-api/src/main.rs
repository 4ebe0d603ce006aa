use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use reward_api::{app, webhooks::HttpNotifier, AppState};
use reward_core::OrderRepository;
use reward_engine::{InMemoryOrderRepository, LifecycleEngine, PayoutPolicy, ThreadRandom};
use reward_store::app_config::{Config, StoreBackend};
use reward_store::{DbClient, PgOrderRepository};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reward_api=debug,reward_engine=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting reward payout service on port {}", config.server.port);

    let repository = build_repository(&config).await?;

    let notifier = HttpNotifier::new(Duration::from_secs(config.webhook.timeout_seconds))
        .context("Failed to build webhook client")?;

    let policy = Arc::new(PayoutPolicy::new(
        config.business_rules.force_success,
        config.business_rules.max_pending_seconds,
    ));

    let engine = LifecycleEngine::new(repository, Arc::new(notifier), policy, Arc::new(ThreadRandom));
    let app = app(AppState::new(engine.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let drain = Duration::from_secs(config.server.shutdown_drain_seconds);
    if !engine.drain(drain).await {
        tracing::warn!("Shutting down with unsettled payouts");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn build_repository(config: &Config) -> anyhow::Result<Arc<dyn OrderRepository>> {
    match config.database.backend {
        StoreBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .context("database.url is required for the postgres backend")?;
            let db = DbClient::new(url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Ok(Arc::new(PgOrderRepository::new(db.pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory order store, orders are lost on restart");
            Ok(Arc::new(InMemoryOrderRepository::new()))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received, no longer accepting requests");
}
