//! Billing Reconciler server binary.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use billing_reconciler::adapters::http::{app_router, shutdown_signal, WebhookAppState};
use billing_reconciler::adapters::postgres::PostgresUserBillingRepository;
use billing_reconciler::application::WebhookReconciler;
use billing_reconciler::config::{AppConfig, LogFormat, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting billing reconciler"
    );

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(&config.database.url)
        .await?;
    tracing::info!("Database connection established");

    let repository = PostgresUserBillingRepository::with_table(pool, &config.database.table_name()?);
    let plans = config.payment.plan_catalog()?;
    tracing::info!(
        users_table = %config.database.users_table,
        mapped_prices = plans.len(),
        default_plan = %plans.default_plan(),
        policy = ?config.payment.persistence_failure_policy,
        "Webhook reconciler configured"
    );

    let reconciler = WebhookReconciler::new(
        Arc::new(config.payment.webhook_verifier()),
        Arc::new(repository),
        plans,
    )
    .with_policy(config.payment.persistence_failure_policy);

    let app = app_router(
        WebhookAppState::new(Arc::new(reconciler)),
        config.server.request_timeout(),
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    match server.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
