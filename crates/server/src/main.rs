use std::future::IntoFuture;

use config::ConfigError;
use db::DbErr;
use server::{Deployment, DeploymentError, http};
use thiserror::Error;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, prelude::*};

const GRACEFUL_SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}

fn init_tracing() -> Result<(), AppError> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},db={level},config={level},utils_core={level},tower_http={level}",
        level = log_level
    );
    let env_filter =
        EnvFilter::try_new(filter_string).map_err(|err| AppError::Logging(err.to_string()))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .try_init()
        .map_err(|err| AppError::Logging(err.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // A missing .env is normal outside development.
    let dotenv_path = dotenvy::dotenv().ok();
    init_tracing()?;
    if let Some(path) = dotenv_path {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config = config::load()?;
    tracing::debug!(?config, "Loaded configuration");
    let bind_address = config.bind_address();

    let deployment = Deployment::new(config).await?;
    let app_router = http::router(deployment.clone());

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!("Server running on http://{local_addr}");

    let (shutdown_rx, force_exit_rx) = spawn_shutdown_watchers();

    let server = axum::serve(listener, app_router)
        .with_graceful_shutdown(wait_for_watch_true(shutdown_rx.clone()))
        .into_future();
    tokio::pin!(server);

    let serve_result = tokio::select! {
        res = &mut server => res,
        _ = wait_for_watch_true(force_exit_rx.clone()) => {
            tracing::warn!("Force shutdown requested (second signal), exiting immediately");
            std::process::exit(130);
        }
        _ = shutdown_deadline(shutdown_rx.clone(), GRACEFUL_SHUTDOWN_TIMEOUT) => {
            tracing::warn!(
                "Graceful shutdown timed out after {:?}, exiting immediately",
                GRACEFUL_SHUTDOWN_TIMEOUT
            );
            std::process::exit(130);
        }
    };

    serve_result?;

    deployment.db().clone().close().await?;
    tracing::info!("Server stopped");

    Ok(())
}

/// SIGINT or SIGTERM on unix, Ctrl+C elsewhere.
struct ShutdownSignals {
    #[cfg(unix)]
    sigterm: Option<tokio::signal::unix::Signal>,
}

impl ShutdownSignals {
    #[cfg(unix)]
    fn install() -> Self {
        use tokio::signal::unix::{SignalKind, signal};

        let sigterm = signal(SignalKind::terminate())
            .inspect_err(|err| tracing::error!("Failed to install SIGTERM handler: {err}"))
            .ok();
        Self { sigterm }
    }

    #[cfg(not(unix))]
    fn install() -> Self {
        Self {}
    }

    #[cfg(unix)]
    async fn recv(&mut self) -> std::io::Result<()> {
        match self.sigterm.as_mut() {
            Some(sigterm) => tokio::select! {
                res = tokio::signal::ctrl_c() => res,
                _ = sigterm.recv() => Ok(()),
            },
            None => tokio::signal::ctrl_c().await,
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> std::io::Result<()> {
        tokio::signal::ctrl_c().await
    }
}

/// The first signal flips the drain watch, the second the force-exit watch.
fn spawn_shutdown_watchers() -> (watch::Receiver<bool>, watch::Receiver<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (force_exit_tx, force_exit_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut signals = ShutdownSignals::install();

        if let Err(err) = signals.recv().await {
            tracing::error!("Failed to listen for shutdown signals: {err}");
            return;
        }
        tracing::info!("Shutting down, draining open requests (signal again to force)");
        let _ = shutdown_tx.send(true);

        if let Err(err) = signals.recv().await {
            tracing::error!("Failed to listen for shutdown signals: {err}");
            return;
        }
        tracing::warn!("Second shutdown signal received, forcing exit");
        let _ = force_exit_tx.send(true);
    });

    (shutdown_rx, force_exit_rx)
}

async fn wait_for_watch_true(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }

        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn shutdown_deadline(rx: watch::Receiver<bool>, timeout: std::time::Duration) {
    wait_for_watch_true(rx).await;
    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::watch;

    use super::{shutdown_deadline, wait_for_watch_true};

    #[tokio::test]
    async fn wait_for_watch_true_returns_once_flag_flips() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_watch_true(rx));

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_deadline_waits_for_signal_then_timeout() {
        let (tx, rx) = watch::channel(false);
        let deadline = tokio::spawn(shutdown_deadline(rx, Duration::from_secs(10)));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!deadline.is_finished());

        tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_secs(11)).await;
        deadline.await.unwrap();
    }
}
