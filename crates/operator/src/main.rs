use anyhow::Context;
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use selfheal_operator::{
    artifacts::{DriveClient, ServiceAccountTokenSource},
    capture::DiagnosticCapturer,
    config::{Config, LogConfig},
    kubernetes::KubeClient,
    metrics,
    notify::Notifier,
    remediation::{RemediationCoordinator, WorkerPool},
    server::Server,
};

fn init_tracing(log: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &log.file_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;
    init_tracing(&config.log)?;
    info!(
        folder = %config.drive.folder_id,
        workers = config.workers.pool_size,
        queue = config.workers.queue_capacity,
        http_timeout_secs = config.http.timeout_secs,
        "Loaded configuration"
    );

    if let Err(e) = metrics::register_metrics() {
        warn!("Failed to register metrics: {}", e);
    }

    // Initialize KubeClient
    let kube_client = Arc::new(KubeClient::new().await?);

    let http = config.http.client()?;

    // Initialize the artifact store
    let tokens = ServiceAccountTokenSource::from_file(&config.drive.credentials_path, http.clone())
        .await
        .with_context(|| {
            format!(
                "cannot load Drive credentials from {}",
                config.drive.credentials_path.display()
            )
        })?;
    let drive = Arc::new(DriveClient::new(Arc::new(tokens), http.clone())?);

    let capturer = Arc::new(DiagnosticCapturer::new(
        kube_client.clone(),
        drive,
        config.drive.folder_id.clone(),
        &config.capture,
    )?);
    let notifier = Arc::new(Notifier::new(config.slack.clone(), http));
    let pool = WorkerPool::start(config.workers.pool_size, config.workers.queue_capacity);

    let coordinator = RemediationCoordinator::new(
        kube_client,
        capturer,
        notifier,
        pool,
        config.drive.folder_link(),
    );

    // Start server
    info!("Starting server on {}", config.server.addr);
    Server::new(coordinator).start(&config.server.addr).await?;

    Ok(())
}
