use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use disputepay::config::{AppConfig, Config, DatabaseConfig};
use disputepay::core::shutdown::{cancel_then_stop, shutdown_signal};
use disputepay::middleware::{json_config, query_config, RequestId};
use disputepay::modules::charges::{self, BillingSettings, ChargeService};
use disputepay::modules::gateways::{backoff_policy, AsaasClient, PaymentGateway};
use disputepay::modules::health;
use disputepay::modules::ledger::{LedgerStore, MySqlLedgerStore};
use disputepay::modules::reconciliation::{self, ForceSyncService, SyncSettings};
use disputepay::modules::webhooks::{self, WebhookService};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.app);
    config.validate().context("Configuration validation failed")?;

    tracing::info!(
        env = %config.app.env,
        gateway_environment = %config.asaas.environment,
        bind_address = %config.server.bind_address(),
        "Starting dispute payment service"
    );

    let db_pool = config
        .database
        .create_pool()
        .await
        .context("Failed to create database pool")?;
    DatabaseConfig::migrate(&db_pool)
        .await
        .context("Failed to apply migrations")?;

    tracing::info!(
        max_connections = config.database.max_connections,
        "Database pool initialized"
    );

    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(AsaasClient::new(&config.asaas).context("Failed to build Asaas client")?);
    let store: Arc<dyn LedgerStore> = Arc::new(MySqlLedgerStore::new(db_pool.clone()));
    let read_retry = backoff_policy(config.asaas.max_retries);

    let charge_service = Arc::new(ChargeService::new(
        gateway.clone(),
        store.clone(),
        BillingSettings::from_config(&config.billing, read_retry.clone()),
    ));
    let webhook_service = Arc::new(WebhookService::new(
        store.clone(),
        config.asaas.webhook_token.clone(),
    ));
    let force_sync_service = Arc::new(ForceSyncService::new(
        gateway.clone(),
        store.clone(),
        SyncSettings::from_config(&config.billing, read_retry),
    ));

    let shutdown = CancellationToken::new();
    let environment = config.asaas.environment;
    let bind_address = config.server.bind_address();

    let server = {
        let shutdown = shutdown.clone();
        HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .wrap(TracingLogger::default())
                .wrap(RequestId)
                .app_data(json_config())
                .app_data(query_config())
                .app_data(web::Data::new(db_pool.clone()))
                .app_data(web::Data::new(environment))
                .app_data(web::Data::new(shutdown.clone()))
                .app_data(web::Data::new(charge_service.clone()))
                .app_data(web::Data::new(webhook_service.clone()))
                .app_data(web::Data::new(force_sync_service.clone()))
                .configure(health::configure)
                .service(
                    web::scope("/api")
                        .configure(charges::configure)
                        .configure(webhooks::configure)
                        .configure(reconciliation::configure),
                )
        })
        .workers(config.server.workers)
        .shutdown_timeout(config.server.shutdown_timeout_secs)
        .disable_signals()
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run()
    };

    let handle = server.handle();
    actix_web::rt::spawn(cancel_then_stop(shutdown_signal(), shutdown, move || {
        handle.stop(true)
    }));

    tracing::info!("Server started at http://{}", bind_address);

    server.await.context("Server terminated with an error")
}

fn init_tracing(app: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("disputepay={},actix_web=info,sqlx=warn", app.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if app.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
