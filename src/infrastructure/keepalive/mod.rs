//! Keep-alive helpers for hosts that idle inactive web processes
//!
//! Two independent tasks, both stopped by the shared cancellation token:
//! a pinger that GETs the public service URL and an HTTP responder bound
//! to the port the host assigns.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::config::KeepAliveConfig;

/// Upper bound for a single keep-alive ping
pub const PING_TIMEOUT: Duration = Duration::from_secs(30);

pub struct KeepAlive {
    service_url: Option<String>,
    port: Option<u16>,
    interval: Duration,
    response_text: String,
}

impl KeepAlive {
    pub fn from_config(config: &KeepAliveConfig) -> Self {
        Self {
            service_url: config.service_url.clone(),
            port: config.port,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            response_text: config.response_text.clone(),
        }
    }

    /// Start whichever tasks are configured
    pub fn spawn(self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        match self.service_url {
            Some(url) => {
                tracing::info!("Starting keep-alive ping for {}", url);
                match Client::builder().timeout(PING_TIMEOUT).build() {
                    Ok(client) => handles.push(tokio::spawn(ping_loop(client, url, self.interval, cancel.clone()))),
                    Err(e) => tracing::error!("Failed to create keep-alive client: {}", e),
                }
            }
            None => tracing::info!("SERVICE_URL is empty, keep-alive ping is not used"),
        }

        if let Some(port) = self.port {
            let text = self.response_text;
            handles.push(tokio::spawn(async move {
                let listener = match TcpListener::bind(("0.0.0.0", port)).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        tracing::error!("Failed to bind keep-alive responder on port {}: {}", port, e);
                        return;
                    }
                };
                if let Err(e) = serve(listener, text, cancel).await {
                    tracing::error!("Keep-alive responder failed: {}", e);
                }
            }));
        }

        handles
    }
}

/// Wait for the keep-alive tasks, returning how many ended abnormally
pub async fn join(handles: Vec<JoinHandle<()>>) -> usize {
    let mut failed = 0;
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!("Keep-alive task ended abnormally: {}", e);
            failed += 1;
        }
    }
    failed
}

async fn ping_loop(client: Client, url: String, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => tokio::select! {
                _ = cancel.cancelled() => break,
                result = client.get(&url).send() => match result {
                    Ok(response) => tracing::debug!("Keep-alive ping {}: {}", url, response.status()),
                    Err(e) => tracing::warn!("Keep-alive ping {} failed: {}", url, e),
                },
            },
        }
    }

    tracing::info!("Closed keep-alive ping for {}", url);
}

pub fn router(text: impl Into<Arc<str>>) -> Router {
    Router::new()
        .route("/", get(respond))
        .with_state(text.into())
}

async fn respond(State(text): State<Arc<str>>) -> String {
    text.to_string()
}

/// Answer `GET /` with a fixed text until cancelled
pub async fn serve(listener: TcpListener, text: impl Into<Arc<str>>, cancel: CancellationToken) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Starting keep-alive responder on {}", addr);
    }

    axum::serve(listener, router(text))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    tracing::info!("Closed keep-alive responder");
    Ok(())
}
