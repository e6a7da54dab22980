use crate::app_state::AppState;
use crate::config::RelayConfig;
use crate::delivery::{DeliverySink, UpstreamClient, UpstreamSettings};
use crate::error::{Context, Result};
use crate::relay::{RelayDispatcher, RelayMapping, RelayPipeline};
use crate::transport::http_server;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub struct RelayApp {
    state: AppState,
    listener: TcpListener,
    drain_timeout: Duration,
}

impl RelayApp {
    /// Loads the relay mapping, builds the delivery sink and binds the
    /// listener. Any failure here is fatal to the process.
    pub async fn initialise(config: RelayConfig) -> Result<Self> {
        if config.token().is_none() {
            tracing::warn!("TOKEN is missing, running in log-only mode");
        }
        if config.account_id().is_none() {
            tracing::warn!("ACCOUNT_ID is missing, running in log-only mode");
        }

        let mapping = RelayMapping::load(&config.relays_path).with_context(|| {
            format!(
                "cannot load relay mapping `{}`, refusing to start",
                config.relays_path.display()
            )
        })?;
        tracing::info!(
            path = %config.relays_path.display(),
            relays = mapping.len(),
            skipped = mapping.skipped_rows(),
            "relay mapping loaded"
        );

        let sink = match UpstreamSettings::from_config(&config) {
            Some(settings) => {
                let client = UpstreamClient::new(settings)?;
                tracing::info!(endpoint = %client.endpoint(), "upstream delivery enabled");
                Some(Arc::new(client) as Arc<dyn DeliverySink>)
            }
            None => None,
        };

        let pipeline = Arc::new(RelayPipeline::new(Arc::new(mapping), sink));
        let state = AppState::new(RelayDispatcher::new(pipeline));

        let addr = config.listen_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind listener on {addr}"))?;

        Ok(Self {
            state,
            listener,
            drain_timeout: config.drain_timeout(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves until `signal` resolves, then drains in-flight relays for up
    /// to the configured drain timeout.
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self {
            state,
            listener,
            drain_timeout,
        } = self;

        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            signal.await;
            tracing::info!("shutdown signal received");
            trigger.cancel();
        });

        tracing::info!(
            log_only = state.dispatcher.pipeline().log_only(),
            "text relay ready; press Ctrl+C to stop"
        );
        let served = http_server::serve(listener, state.clone(), shutdown).await;

        let in_flight = state.dispatcher.in_flight();
        if !state.dispatcher.shutdown(drain_timeout).await {
            tracing::warn!(
                in_flight,
                timeout_secs = drain_timeout.as_secs_f64(),
                "drain timeout exceeded, abandoning in-flight relays"
            );
        }

        served
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
