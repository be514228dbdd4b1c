//! Conversion polling worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hlscast_queue::{JobQueue, JobScheduler, QueueConfig};
use hlscast_storage::{ConversionClient, ProviderConfig};
use hlscast_worker::{ConvertContext, JobExecutor, RedisRecordStore, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("hlscast=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting hlscast-worker");

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let provider = match ProviderConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load provider config: {}", e);
            std::process::exit(1);
        }
    };

    let conversions = match ConversionClient::new(provider) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create conversion client: {}", e);
            std::process::exit(1);
        }
    };

    // Create queue client
    let queue = match JobQueue::new(QueueConfig::from_env()) {
        Ok(q) => Arc::new(q),
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    let records = match RedisRecordStore::from_env() {
        Ok(r) => Arc::new(r),
        Err(e) => {
            error!("Failed to create record store: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = Arc::new(ConvertContext {
        records,
        scheduler: Arc::clone(&queue) as Arc<dyn JobScheduler>,
        conversions,
        poll_delay: config.poll_delay,
    });

    // Create executor
    let executor = Arc::new(JobExecutor::new(config, queue, ctx));

    // Setup signal handler
    let shutdown_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_executor.shutdown();
    });

    // Run executor
    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
