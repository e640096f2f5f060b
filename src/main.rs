use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::HeaderValue;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use storefront_api as api;
use api::services::{
    notifications::{EmailDispatcher, LogDispatcher, NotificationDispatcher},
    payments::HttpPaymentGateway,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db = Arc::new(
        api::db::establish_connection(&cfg.database_url)
            .await
            .context("failed to connect to database")?,
    );
    if cfg.auto_migrate {
        api::db::create_schema(&db)
            .await
            .context("failed to bootstrap schema")?;
    }

    let (event_sender, event_rx) = api::events::channel(1024);
    tokio::spawn(api::events::process_events(event_rx));

    let gateway = Arc::new(HttpPaymentGateway::new(
        cfg.payment_gateway_url.clone(),
        cfg.payment_gateway_api_key.clone(),
    ));
    let notifier: Arc<dyn NotificationDispatcher> = match &cfg.notification_endpoint {
        Some(endpoint) => {
            info!(endpoint, "Email notifications enabled");
            Arc::new(EmailDispatcher::new(endpoint.clone()))
        }
        None => {
            info!("No notification endpoint configured; logging notifications");
            Arc::new(LogDispatcher)
        }
    };

    let state = api::AppState::build(db, cfg.clone(), event_sender, gateway, notifier);

    let cors = build_cors(cfg.cors_allowed_origins.as_deref(), cfg.is_development());
    let app = api::app_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port configuration")?;
    info!(%addr, environment = %cfg.environment, "Starting storefront API");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn build_cors(allowed_origins: Option<&str>, is_development: bool) -> CorsLayer {
    match allowed_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None if is_development => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
