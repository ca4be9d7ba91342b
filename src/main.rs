use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};

use storefront_api as api;
use api::notifications::{HttpNotifier, LogNotifier, Notifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);
    api::handlers::health::init_start_time();
    api::metrics::init();

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!(error = %e, "Failed running migrations");
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_sender, event_rx) = api::events::channel();
    let event_sender = Arc::new(event_sender);
    tokio::spawn(api::events::process_events(event_rx));

    let provider = Arc::new(
        api::payments::StripeClient::new(cfg.stripe_api_base.clone())
            .context("failed to build payment client")?,
    );

    let notifier: Arc<dyn Notifier> = match cfg.notification_webhook_url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            info!(endpoint = url, "Notification relay enabled");
            Arc::new(
                HttpNotifier::new(url, cfg.email_from.clone())
                    .context("failed to build notification client")?,
            )
        }
        _ => {
            info!("Notification relay not configured; notifications are logged only");
            Arc::new(LogNotifier)
        }
    };

    // Aggregate app services used by HTTP handlers
    let services = api::handlers::AppServices::new(
        db_arc.clone(),
        &cfg,
        provider,
        notifier,
        event_sender.clone(),
    );

    let app_state = api::AppState {
        db: db_arc,
        config: cfg.clone(),
        services,
        auth: Arc::new(api::auth::AuthService::from_config(&cfg)),
        event_sender,
    };

    let app = api::app(app_state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, environment = %cfg.environment, "storefront-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
