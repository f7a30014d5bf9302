//! Types shared by every endpoint

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Sessions currently registered, initialized or not
    #[schema(example = 3)]
    pub active_sessions: usize,
}

/// Body of every failed response: `{"ok": false, "error": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    #[schema(example = false)]
    pub ok: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "INVALID_SESSION")]
    pub code: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let value = serde_json::to_value(ErrorEnvelope::new("INVALID_SESSION", "gone")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "ok": false,
                "error": { "code": "INVALID_SESSION", "message": "gone" }
            })
        );
    }
}
