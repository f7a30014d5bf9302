//! Unified error handling system
//!
//! Every failure the bridge reports to a client maps onto one of a small set of
//! request-local errors. Nothing in here is fatal to the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the bridge core
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The bearer credential was missing, malformed or rejected. No session exists.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        message: String,
        context: ErrorContext,
    },

    /// The client presented a session id that is unknown or already evicted.
    #[error("Session not found or expired: {session_id}")]
    InvalidSession {
        session_id: String,
        context: ErrorContext,
    },

    /// The resource factory failed; the session has been rolled back.
    #[error("Session creation failed: {message}")]
    SessionCreationFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        context: ErrorContext,
    },
}

impl BridgeError {
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        BridgeError::AuthenticationFailed {
            message: message.into(),
            context: ErrorContext::new("auth")
                .with_operation("resolve")
                .with_suggestion("Provide a valid 'Authorization: Bearer <token>' header"),
        }
    }

    pub fn invalid_session(session_id: impl Into<String>) -> Self {
        BridgeError::InvalidSession {
            session_id: session_id.into(),
            context: ErrorContext::new("session_registry")
                .with_operation("get")
                .with_suggestion("Drop the Mcp-Session-Id header and authenticate again"),
        }
    }

    pub fn session_creation_failed(message: impl Into<String>) -> Self {
        BridgeError::SessionCreationFailed {
            message: message.into(),
            source: None,
            context: ErrorContext::new("session_registry")
                .with_operation("initialize")
                .with_suggestion("Retry later; a new session will be created"),
        }
    }

    /// Stable machine-readable code used in the response envelope
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            BridgeError::InvalidSession { .. } => "INVALID_SESSION",
            BridgeError::SessionCreationFailed { .. } => "SESSION_CREATION_FAILED",
            BridgeError::Config { .. } => "CONFIGURATION_ERROR",
            BridgeError::Io(_) | BridgeError::Serialization(_) | BridgeError::Internal { .. } => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            BridgeError::AuthenticationFailed { context, .. } => Some(context),
            BridgeError::InvalidSession { context, .. } => Some(context),
            BridgeError::SessionCreationFailed { context, .. } => Some(context),
            BridgeError::Config { context, .. } => Some(context),
            BridgeError::Internal { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Whether retrying the same request later may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BridgeError::SessionCreationFailed { .. })
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            BridgeError::AuthenticationFailed { .. } | BridgeError::InvalidSession { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    code = self.code(),
                    error = %self,
                    "Request rejected"
                );
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    code = self.code(),
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::BridgeError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file and ANPBRIDGE_* variables"),
        }
    };
}
