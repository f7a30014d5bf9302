//! Tool call and session types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Bridge tool invocation
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ToolCallRequest {
    /// `anp.fetchDoc` or `anp.invokeOpenRPC`
    #[schema(example = "anp.fetchDoc")]
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Parameters of `anp.fetchDoc`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FetchDocParams {
    #[schema(example = "https://agent-navigation.com/ad.json")]
    pub url: String,
}

/// Parameters of `anp.invokeOpenRPC`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InvokeOpenRpcParams {
    #[schema(example = "https://example.com/api/jsonrpc")]
    pub endpoint: String,
    #[schema(example = "searchLocations")]
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    #[serde(default)]
    pub id: Option<String>,
}

/// View of the session bound to the request
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionInfoResponse {
    pub session_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Seconds since the session was last used
    #[schema(example = 12.5)]
    pub idle_secs: f64,
    pub initialized: bool,
}

impl From<anpbridge_core::SessionSnapshot> for SessionInfoResponse {
    fn from(snapshot: anpbridge_core::SessionSnapshot) -> Self {
        Self {
            session_id: snapshot.session_id,
            created_at: snapshot.created_at,
            idle_secs: snapshot.idle_secs,
            initialized: snapshot.initialized,
        }
    }
}
