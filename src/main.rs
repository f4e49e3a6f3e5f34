//! Traffic stream service.
//!
//! Runs one or both halves of the pipeline:
//! - producer: HTTP trigger surface, session tracking, event synthesis, publishing
//! - consumer: idempotent ingest into the append-only record log with running statistics

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use stream_core::{SessionConfig, SessionTracker, SynthConfig, Synthesizer};
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use api::{router, AppState};
use redpanda::{Consumer, Producer, RedpandaConfig};
use telemetry::{health, init_tracing_from_env};
use worker::{AggregateSnapshot, ConsumerWorker, RecordLog, WorkerConfig, WorkerScheduler};

/// Which half of the pipeline this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    Producer,
    Consumer,
    All,
}

impl Role {
    fn produces(self) -> bool {
        matches!(self, Self::Producer | Self::All)
    }

    fn consumes(self) -> bool {
        matches!(self, Self::Consumer | Self::All)
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_role")]
    role: Role,

    #[serde(default)]
    redpanda: RedpandaConfig,
    #[serde(default)]
    session: SessionConfig,
    #[serde(default)]
    synth: SynthConfig,
    #[serde(default)]
    worker: WorkerConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_role() -> Role {
    Role::All
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            role: default_role(),
            redpanda: RedpandaConfig::default(),
            session: SessionConfig::default(),
            synth: SynthConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

type ConsumerTask = JoinHandle<stream_core::Result<AggregateSnapshot>>;

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23 needs an explicit crypto provider before any TLS handshake
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing_from_env();

    info!("Starting traffic stream v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        role = ?config.role,
        brokers = ?config.redpanda.brokers,
        topic = %config.redpanda.topic,
        log_dir = %config.worker.log_dir,
        "Loaded configuration"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = WorkerScheduler::new(config.worker.clone(), shutdown_rx.clone());

    // Consumer startup failures are fatal: no log, or no subscription, means no run.
    let mut consumer_task: Option<ConsumerTask> = None;
    if config.role.consumes() {
        let log = RecordLog::create(&config.worker.log_dir).context("Failed to create record log")?;
        let consumer = Consumer::subscribe(config.redpanda.clone())
            .await
            .context("Failed to subscribe to Redpanda")?;
        health().redpanda.set_healthy();

        let worker = ConsumerWorker::new(Arc::new(consumer), log, config.worker.consumer.clone());
        consumer_task = Some(scheduler.spawn_consumer(worker));
    } else {
        health().record_store.set_disabled();
    }

    let mut tracker = None;
    let mut server_task = None;
    if config.role.produces() {
        let session_tracker = Arc::new(SessionTracker::new(config.session.clone()));
        let synthesizer = Arc::new(
            Synthesizer::new(config.synth.clone(), session_tracker.clone())
                .context("Invalid synthesizer configuration")?,
        );

        let producer = match Producer::connect(config.redpanda.clone()).await {
            Ok(producer) => producer,
            Err(e) => {
                warn!(error = %e, "Redpanda unavailable at startup, will retry on first publish");
                Producer::new(config.redpanda.clone())
            }
        };

        let app = router(AppState::new(Arc::new(producer), synthesizer));
        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .context("Invalid server address")?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("Failed to bind to address")?;
        info!("Listening on http://{}", addr);

        let mut stop = shutdown_rx.clone();
        server_task = Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.wait_for(|stopped| *stopped).await;
                })
                .await
        }));
        tracker = Some(session_tracker);
    }

    let monitor = scheduler.spawn_monitor(config.redpanda.clone(), tracker);

    // Run until a signal arrives or the consumer stops by itself.
    let early_exit = tokio::select! {
        _ = shutdown_signal() => None,
        joined = async {
            match consumer_task.as_mut() {
                Some(task) => task.await,
                None => std::future::pending().await,
            }
        } => Some(joined),
    };
    if early_exit.is_some() {
        consumer_task = None;
    }

    info!("Shutting down...");
    let _ = shutdown_tx.send(true);

    if let Some(server) = server_task {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Server error"),
            Err(e) => error!(error = %e, "Server task failed"),
        }
    }
    let _ = monitor.await;

    let consumer_exit = match (early_exit, consumer_task) {
        (Some(joined), _) => Some(joined),
        (None, Some(task)) => Some(task.await),
        (None, None) => None,
    };

    match consumer_exit {
        Some(Ok(Ok(snapshot))) => info!(
            total_events = snapshot.total_events,
            unique_sessions = snapshot.unique_sessions,
            "Consumer finished"
        ),
        Some(Ok(Err(e))) => return Err(e).context("Consumer stopped"),
        Some(Err(e)) => return Err(anyhow!("consumer task failed: {e}")),
        None => {}
    }

    info!("Shutdown complete");
    Ok(())
}

/// Layers defaults, `config/default.toml`, and `TRAFFIC__*` variables.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("TRAFFIC")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides for the settings deployments set most often; nested
    // parsing misreads field names that contain underscores.
    if let Ok(brokers) = std::env::var("TRAFFIC_REDPANDA_BROKERS").or_else(|_| std::env::var("KAFKA_BROKER")) {
        config.redpanda.brokers = brokers.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Ok(topic) = std::env::var("TRAFFIC_REDPANDA_TOPIC") {
        config.redpanda.topic = topic;
    }
    if let Ok(username) = std::env::var("TRAFFIC_REDPANDA_SASL_USERNAME") {
        config.redpanda.sasl_username = Some(username);
    }
    if let Ok(password) = std::env::var("TRAFFIC_REDPANDA_SASL_PASSWORD") {
        config.redpanda.sasl_password = Some(password);
    }
    if let Ok(group_id) = std::env::var("TRAFFIC_CONSUMER_GROUP_ID") {
        config.redpanda.consumer.group_id = group_id;
    }
    if let Ok(dir) = std::env::var("TRAFFIC_LOG_DIR") {
        config.worker.log_dir = dir;
    }
    if let Ok(role) = std::env::var("TRAFFIC_ROLE") {
        config.role = match role.to_ascii_lowercase().as_str() {
            "producer" => Role::Producer,
            "consumer" => Role::Consumer,
            "all" => Role::All,
            other => return Err(anyhow!("unknown TRAFFIC_ROLE {other:?}")),
        };
    }

    Ok(config)
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
