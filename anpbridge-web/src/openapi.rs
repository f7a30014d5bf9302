//! OpenAPI specification for the ANP bridge

use axum::response::{IntoResponse, Json, Response};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::handlers::{
    ErrorBody, ErrorEnvelope, FetchDocParams, HealthResponse, InvokeOpenRpcParams,
    SessionInfoResponse, ToolCallRequest,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ANP Bridge API",
        version = "0.1.0",
        description = "Multi-tenant stateful bridge to the Agent Network Protocol",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:9880", description = "Local development server")
    ),
    paths(
        crate::handlers::health_check,
        crate::handlers::tool_call,
        crate::handlers::session_info,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorEnvelope,
            ErrorBody,
            ToolCallRequest,
            FetchDocParams,
            InvokeOpenRpcParams,
            SessionInfoResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Bridge", description = "Session-bound ANP tools"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Bearer token used when a request opens a new session
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Get the OpenAPI specification as JSON
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// `GET /api/openapi.json`
pub async fn openapi_json() -> Response {
    Json(ApiDoc::openapi()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "ANP Bridge API");
        assert_eq!(openapi.info.version, "0.1.0");
        assert!(openapi.paths.paths.contains_key("/mcp"));
        assert!(openapi.paths.paths.contains_key("/api/health"));
    }

    #[test]
    fn test_openapi_json() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("ANP Bridge API"));
        assert!(json.contains("bearer_auth"));
    }
}
