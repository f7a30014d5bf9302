//! ANP Bridge Web Server
//!
//! Hosts the session middleware in front of the ANP tools. Each bearer
//! credential gets its own session and ANP client; clients keep using it by
//! echoing the `Mcp-Session-Id` header.

pub mod anp;
pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use server::AnpBridgeServer;
pub use state::AppState;

use anpbridge_core::{BridgeError, SessionSettings};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Json, Response},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Header carrying the session id in both directions
pub const MCP_SESSION_ID: &str = "mcp-session-id";

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    let session_header = HeaderName::from_static(MCP_SESSION_ID);

    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE, session_header.clone()])
        .expose_headers([session_header]);

    Router::new()
        .nest("/api", routes::api_routes())
        .nest("/mcp", routes::mcp_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .with_state(state)
}

/// Configuration for the web server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Idle timeout and sweep interval
    pub session: SessionSettings,
    /// Require an `Authorization` header on session-creating requests
    pub enable_auth: bool,
    /// Shared bearer token; only checked when `enable_auth` is set
    pub auth_token: Option<String>,
    /// DID document handed to every tenant by the built-in resolvers
    pub did_document_path: PathBuf,
    /// DID private key handed to every tenant by the built-in resolvers
    pub did_private_key_path: PathBuf,
    /// CORS origins; empty means any
    pub allowed_origins: Vec<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9880,
            session: SessionSettings::default(),
            enable_auth: false,
            auth_token: None,
            did_document_path: PathBuf::from("docs/did_public/public-did-doc.json"),
            did_private_key_path: PathBuf::from("docs/did_public/public-private-key.pem"),
            allowed_origins: Vec::new(),
        }
    }
}

impl WebConfig {
    /// Load configuration: defaults, then an optional TOML file, then
    /// `ANPBRIDGE_*` environment variables (`__` separates nested keys).
    pub fn load(config_file: Option<&Path>) -> WebResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_file {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ANPBRIDGE")
                .separator("__")
                .try_parsing(true),
        );

        let config: WebConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| {
                anpbridge_core::config_error!(
                    format!("Failed to load configuration: {}", e),
                    "web_config"
                )
            })?;

        config.session.validate()?;
        Ok(config)
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No active session found. Please authenticate first.")]
    NoSession,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl WebError {
    pub fn code(&self) -> &'static str {
        match self {
            WebError::Bridge(err) => err.code(),
            WebError::InvalidArgument(_) => "INVALID_ARGUMENT",
            WebError::NoSession => "NO_SESSION",
            WebError::Server(_) | WebError::Serialization(_) | WebError::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Bridge(BridgeError::AuthenticationFailed { .. })
            | WebError::Bridge(BridgeError::InvalidSession { .. })
            | WebError::NoSession => StatusCode::UNAUTHORIZED,
            WebError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match &self {
            WebError::Bridge(err) => err.log(),
            other => warn!(code = other.code(), error = %other, "Request failed"),
        }

        let body = handlers::ErrorEnvelope::new(self.code(), self.to_string());
        (self.status(), Json(body)).into_response()
    }
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

/// Initialize logging for the web server
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "anpbridge_web=debug,anpbridge_core=debug,tower_http=debug".into()
            }),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = WebConfig::default();
        assert_eq!(config.address(), "127.0.0.1:9880");
        assert!(!config.enable_auth);
        assert_eq!(config.session, SessionSettings::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
port = 9999
enable_auth = true
auth_token = "good"

[session]
idle_timeout_secs = 30
"#
        )
        .unwrap();

        let config = WebConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.port, 9999);
        assert!(config.enable_auth);
        assert_eq!(config.auth_token.as_deref(), Some("good"));
        assert_eq!(config.session.idle_timeout_secs, 30);
        assert_eq!(config.session.sweep_interval_secs, 300);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[session]\nidle_timeout_secs = 0").unwrap();

        let err = WebConfig::load(Some(file.path())).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_error_statuses() {
        let auth: WebError = BridgeError::authentication_failed("nope").into();
        assert_eq!(auth.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(auth.code(), "AUTHENTICATION_FAILED");

        let session: WebError = BridgeError::invalid_session("abc").into();
        assert_eq!(session.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(session.code(), "INVALID_SESSION");

        let creation: WebError = BridgeError::session_creation_failed("down").into();
        assert_eq!(creation.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(creation.code(), "SESSION_CREATION_FAILED");
    }
}
