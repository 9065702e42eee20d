//! SparkMade funding core server
//!
//! Wires configuration, the database pool, the payment gateway, the pledge
//! ledger, and the deadline sweep into an axum application with graceful
//! shutdown.

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use sparkmade_backend::campaign::CampaignService;
use sparkmade_backend::config::Config;
use sparkmade_backend::db::{self, Database};
use sparkmade_backend::gateway::{PaymentGateway, StripeGateway};
use sparkmade_backend::handlers::{health_check, root};
use sparkmade_backend::middleware;
use sparkmade_backend::notify::Notifier;
use sparkmade_backend::pledge::PledgeLedger;
use sparkmade_backend::routes;
use sparkmade_backend::state::AppState;
use sparkmade_backend::sweep::{sweep_scheduler, DeadlineSweep};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting up");

    // Open the database pool and run migrations
    let pool = match db::create_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db::run_migrations(&pool).await {
        tracing::error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    let database = Database::new(pool.clone());

    // Wire services
    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(
        config.stripe_secret_key.clone(),
        config.currency.clone(),
    ));

    let notifier = Arc::new(Notifier::new(
        config.resend_api_key.clone(),
        config.email_from.clone(),
    ));

    let campaign_service = CampaignService::new(pool.clone());

    let ledger = Arc::new(PledgeLedger::new(
        pool.clone(),
        gateway.clone(),
        notifier.clone(),
    ));

    let sweep = Arc::new(DeadlineSweep::new(
        pool.clone(),
        campaign_service.clone(),
        ledger.clone(),
        gateway.clone(),
        notifier.clone(),
    ));

    // Optional in-process sweep trigger; the cron endpoint is the primary one
    if config.sweep_interval_seconds > 0 {
        let sweep_loop = sweep.clone();
        let interval = config.sweep_interval_seconds;
        tokio::spawn(async move {
            sweep_scheduler(sweep_loop, interval).await;
            tracing::error!("Sweep scheduler task exited unexpectedly");
        });
    }

    let app_state = AppState::new(
        database.clone(),
        Arc::new(campaign_service),
        ledger,
        sweep,
        config.category_rules.clone(),
        config.gateway_webhook_secret.clone(),
        config.cron_secret.clone(),
    );

    // Create the app router
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(routes::campaign_routes())
        .merge(routes::pledge_routes())
        .merge(routes::sweep_routes())
        .with_state(app_state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(configure_cors(&config));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Serve with graceful shutdown
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    // Close the pool before exiting
    database.close().await;

    tracing::info!("Server shutdown complete");
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins_str = config.cors_allowed_origins.clone().unwrap_or_default();

    if allowed_origins_str.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
