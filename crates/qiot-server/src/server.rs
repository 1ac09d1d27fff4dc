//! Ingestion server implementation

use std::net::SocketAddr;

use qiot_core::ServerConfig;
use tokio::net::TcpListener;

use crate::error::{Result, ServerError};
use crate::metrics::init_prometheus_recorder;
use crate::routes::create_router;
use crate::state::{ServerState, SharedState};

/// Telemetry ingestion server
pub struct IngestServer {
    state: SharedState,
    addr: SocketAddr,
}

impl IngestServer {
    /// Run the server until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let router = create_router(self.state);

        let listener = TcpListener::bind(self.addr).await?;
        tracing::info!("Starting ingestion server on {}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        tracing::info!("Server stopped");
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the server state for testing
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Builder for IngestServer
pub struct ServerBuilder {
    config: ServerConfig,
}

impl ServerBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.config = self.config.with_addr(addr);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config = self.config.with_port(port);
        self
    }

    /// Install the global Prometheus recorder on build
    pub fn prometheus(mut self, enabled: bool) -> Self {
        self.config = self.config.with_prometheus(enabled);
        self
    }

    /// Generate the process keypair and assemble the state
    pub fn build(self) -> Result<IngestServer> {
        let addr = self.config.bind_addr;
        let install_recorder = self.config.prometheus;

        let mut state = ServerState::new(self.config)?;
        if install_recorder {
            state = state.with_prometheus(init_prometheus_recorder()?);
        }

        Ok(IngestServer {
            state: SharedState::new(state),
            addr,
        })
    }
}
