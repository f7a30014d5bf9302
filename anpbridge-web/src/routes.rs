//! Route definitions for the ANP bridge

use crate::{handlers, middleware::session_middleware, openapi, AppState};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

/// Public API routes; no session is opened for these
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(openapi::openapi_json))
}

/// Bridge routes, each bound to a session by the session middleware
pub fn mcp_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::tool_call))
        .route("/session", get(handlers::session_info))
        .route_layer(from_fn_with_state(state, session_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppState, WebConfig, MCP_SESSION_ID};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check_route() {
        let state = AppState::new(WebConfig::default()).await.unwrap();
        let app = api_routes().with_state(state.clone());

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(MCP_SESSION_ID).is_none());
        assert!(state.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_session_route_without_did_material_opens_nothing() {
        // the default DID paths do not exist in the test environment
        let state = AppState::new(WebConfig::default()).await.unwrap();
        let app = mcp_routes(state.clone()).with_state(state.clone());

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/session")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(MCP_SESSION_ID).is_none());
        assert!(state.registry.is_empty().await);
    }
}
