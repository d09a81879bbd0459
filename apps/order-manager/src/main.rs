//! Order Manager Binary
//!
//! Starts the HTTP API, the execution worker pool and the outbox relay.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-manager
//! cargo run --bin order-manager --features sqlite,kafka
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_MANAGER_CONFIG`: Path to the YAML config (default: config.yaml,
//!   built-in defaults when that file is absent)
//! - `RUST_LOG`: Log filter, overrides the configured level
//!
//! Any `${VAR}` referenced from the config file is read from the environment
//! or a `.env` file.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;

use order_manager::application::ports::{EventPublisherPort, ExchangePort, OrderStorePort};
use order_manager::application::services::{Orchestrator, OrchestratorConfig};
use order_manager::config::{
    Config, DEFAULT_CONFIG_PATH, ExchangeMode, PublisherBackend, StoreBackend, load_config,
    load_config_from_string,
};
use order_manager::infrastructure::exchange::{BinanceTestnetClient, SimulatedExchange};
use order_manager::infrastructure::http::{AppState, create_router};
use order_manager::infrastructure::messaging::{DEFAULT_RETAINED_MESSAGES, InMemoryEventPublisher};
use order_manager::infrastructure::persistence::InMemoryOrderStore;
use order_manager::observability::{init_logging, init_metrics};

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable naming the config file.
const CONFIG_PATH_ENV: &str = "ORDER_MANAGER_CONFIG";

/// Orchestrator over runtime-selected adapters.
type AppOrchestrator = Orchestrator<dyn OrderStorePort, dyn ExchangePort, dyn EventPublisherPort>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => load_config(Some(&path)),
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(None),
        // No file at all: run on defaults.
        Err(_) => load_config_from_string(""),
    }
    .context("failed to load configuration")?;

    init_logging(&config.observability.logging).context("failed to initialize logging")?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting order manager");
    log_config(&config);

    if config.observability.metrics.enabled {
        let addr: SocketAddr = config
            .observability
            .metrics
            .listen_address
            .parse()
            .context("invalid metrics listen address")?;
        init_metrics(addr).context("failed to start metrics exporter")?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }

    let store = create_store(&config).await?;
    let publisher = create_publisher(&config).await?;
    let exchange = create_exchange(&config)?;

    let orchestrator: Arc<AppOrchestrator> = Arc::new(Orchestrator::new(
        store,
        exchange,
        publisher,
        OrchestratorConfig::from_config(&config),
    )?);
    orchestrator.start()?;

    let served = serve_http(&config, Arc::clone(&orchestrator)).await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "HTTP server failed");
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, orchestrator.stop()).await {
        Ok(()) => tracing::info!("Order manager stopped"),
        Err(_) => tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            in_flight = orchestrator.in_flight_count(),
            "Shutdown timed out with work still running"
        ),
    }

    served
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &Config) {
    tracing::info!(
        http_port = config.server.http_port,
        store = ?config.persistence.backend,
        publisher = ?config.messaging.backend,
        exchange = ?config.exchange.mode,
        workers = config.execution.worker_count,
        queue_capacity = config.execution.queue_capacity,
        relay_interval_ms = config.outbox.poll_interval_ms,
        relay_trigger = ?config.outbox.trigger,
        "Configuration loaded"
    );
}

async fn create_store(config: &Config) -> anyhow::Result<Arc<dyn OrderStorePort>> {
    match config.persistence.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory order store; orders are lost on restart");
            Ok(Arc::new(InMemoryOrderStore::new()))
        }
        StoreBackend::Sqlite => open_sqlite_store(&config.persistence.db_path).await,
    }
}

#[cfg(feature = "sqlite")]
async fn open_sqlite_store(path: &str) -> anyhow::Result<Arc<dyn OrderStorePort>> {
    let store = order_manager::infrastructure::persistence::TursoOrderStore::open(path)
        .await
        .context("failed to open SQLite order store")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
#[allow(clippy::unused_async)]
async fn open_sqlite_store(_path: &str) -> anyhow::Result<Arc<dyn OrderStorePort>> {
    anyhow::bail!("sqlite backend requires the `sqlite` feature")
}

async fn create_publisher(config: &Config) -> anyhow::Result<Arc<dyn EventPublisherPort>> {
    match config.messaging.backend {
        PublisherBackend::Memory => {
            tracing::warn!(
                retained = DEFAULT_RETAINED_MESSAGES,
                "Using in-memory event publisher; events are not delivered anywhere"
            );
            Ok(Arc::new(InMemoryEventPublisher::new()))
        }
        PublisherBackend::Kafka => create_kafka_publisher(config).await,
    }
}

#[cfg(feature = "kafka")]
async fn create_kafka_publisher(config: &Config) -> anyhow::Result<Arc<dyn EventPublisherPort>> {
    use order_manager::infrastructure::messaging::KafkaEventPublisher;

    if let Err(e) = KafkaEventPublisher::ensure_events_topic(&config.messaging).await {
        tracing::warn!(
            topic = %config.messaging.events_topic,
            error = %e,
            "Failed to ensure Kafka events topic exists"
        );
    }

    let publisher = KafkaEventPublisher::new(&config.messaging)
        .context("failed to create Kafka producer")?;
    Ok(Arc::new(publisher))
}

#[cfg(not(feature = "kafka"))]
#[allow(clippy::unused_async)]
async fn create_kafka_publisher(_config: &Config) -> anyhow::Result<Arc<dyn EventPublisherPort>> {
    anyhow::bail!("kafka backend requires the `kafka` feature")
}

fn create_exchange(config: &Config) -> anyhow::Result<Arc<dyn ExchangePort>> {
    match config.exchange.mode {
        ExchangeMode::Simulated => {
            tracing::info!(
                latency_ms = config.exchange.simulated_latency_ms,
                "Using simulated exchange"
            );
            Ok(Arc::new(SimulatedExchange::from_config(&config.exchange)))
        }
        ExchangeMode::BinanceTestnet => {
            let client = BinanceTestnetClient::new(&config.exchange)
                .context("failed to create Binance testnet client")?;
            tracing::info!(base_url = %config.exchange.base_url, "Using Binance testnet");
            Ok(Arc::new(client))
        }
    }
}

/// Serve the API until a shutdown signal arrives.
async fn serve_http(config: &Config, orchestrator: Arc<AppOrchestrator>) -> anyhow::Result<()> {
    let app = create_router(AppState {
        orchestrator,
        version: env!("CARGO_PKG_VERSION").to_string(),
    });

    let http_addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.http_port)
        .parse()
        .context("invalid HTTP bind address")?;

    tracing::info!(%http_addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  POST /api/v1/orders");
    tracing::info!("  GET  /api/v1/orders");
    tracing::info!("  GET  /api/v1/orders/{{id}}");

    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("failed to bind {http_addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed; the process could not be
/// stopped gracefully without them.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
