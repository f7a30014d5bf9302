//! ANP Bridge Server
//!
//! Binds the listener, runs the session reaper next to the axum server and
//! tears both down on shutdown.

use crate::{anp::AnpClient, create_app, AppState, WebConfig, WebError, WebResult};
use anpbridge_core::{AuthResolver, ResourceFactory, SessionReaper, SessionSettings};
use axum::serve;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// How long shutdown waits for the reaper before leaving it behind
const REAPER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Main ANP bridge server
pub struct AnpBridgeServer {
    config: WebConfig,
    state: AppState,
}

impl AnpBridgeServer {
    /// Create a server with the resolver and factory implied by `config`
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Create a server around an existing state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config.clone(),
            state,
        }
    }

    /// Bind the configured address and serve until Ctrl-C or SIGTERM
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!("Starting ANP Bridge Server");
        info!(
            auth_enabled = self.config.enable_auth,
            session_timeout_secs = self.config.session.idle_timeout_secs,
            cleanup_interval_secs = self.config.session.sweep_interval_secs,
            "Server settings"
        );

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);
        self.run(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> WebResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let reaper = SessionReaper::spawn(self.state.registry.clone(), &self.config.session);
        let app = create_app(self.state.clone());

        let served = serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        // Stop the reaper first so the error path does not leave it running
        reaper.signal_shutdown();
        if tokio::time::timeout(REAPER_SHUTDOWN_GRACE, reaper.shutdown())
            .await
            .is_err()
        {
            warn!("Session reaper did not stop in time");
        }

        if let Err(e) = served {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        info!("Server stopped");
        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Builder for AnpBridgeServer
pub struct AnpBridgeServerBuilder {
    config: WebConfig,
    resolver: Option<Arc<dyn AuthResolver>>,
    factory: Option<Arc<dyn ResourceFactory<Resource = AnpClient>>>,
}

impl AnpBridgeServerBuilder {
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
            resolver: None,
            factory: None,
        }
    }

    pub fn config(mut self, config: WebConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn session_settings(mut self, settings: SessionSettings) -> Self {
        self.config.session = settings;
        self
    }

    /// Require this bearer token on session-creating requests
    pub fn auth_token<S: Into<String>>(mut self, token: S) -> Self {
        self.config.enable_auth = true;
        self.config.auth_token = Some(token.into());
        self
    }

    /// Use a custom resolver instead of the one derived from the config
    pub fn resolver(mut self, resolver: Arc<dyn AuthResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Use a custom factory instead of the DID-backed ANP client factory
    pub fn factory(mut self, factory: Arc<dyn ResourceFactory<Resource = AnpClient>>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Build the server
    pub async fn build(self) -> WebResult<AnpBridgeServer> {
        self.config.session.validate()?;

        let resolver = self
            .resolver
            .unwrap_or_else(|| crate::auth::resolver_from_config(&self.config));
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(crate::anp::DidResourceFactory::default()));

        let state = AppState::with_components(self.config, resolver, factory);
        Ok(AnpBridgeServer::with_state(state))
    }
}

impl Default for AnpBridgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
