//! Bridge tool endpoints, served behind the session middleware

use super::types::{
    ErrorEnvelope, FetchDocParams, InvokeOpenRpcParams, SessionInfoResponse, ToolCallRequest,
};
use crate::{anp::ToolError, auth::CurrentSession, WebError};
use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Json, Response},
};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{info, warn};

/// Invoke a bridge tool in the caller's session
#[utoipa::path(
    post,
    path = "/mcp",
    tag = "Bridge",
    summary = "Call an ANP tool",
    description = "Runs `anp.fetchDoc` or `anp.invokeOpenRPC` with the session's ANP client. \
                   Without `Mcp-Session-Id` a new session is opened and its id returned in that header.",
    request_body = ToolCallRequest,
    params(
        ("Mcp-Session-Id" = Option<String>, Header, description = "Session to reuse")
    ),
    responses(
        (status = 200, description = "Tool result; tool failures carry ok=false"),
        (status = 400, description = "Unknown method or malformed params", body = ErrorEnvelope),
        (status = 401, description = "AUTHENTICATION_FAILED or INVALID_SESSION", body = ErrorEnvelope),
        (status = 500, description = "SESSION_CREATION_FAILED", body = ErrorEnvelope)
    ),
    security(("bearer_auth" = []))
)]
pub async fn tool_call(
    session: CurrentSession,
    payload: Result<Json<ToolCallRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(request) = payload.map_err(|e| WebError::InvalidArgument(e.body_text()))?;
    info!(
        session_id = %session.session_id(),
        method = %request.method,
        "Tool call"
    );

    let outcome = match request.method.as_str() {
        "anp.fetchDoc" => {
            let params: FetchDocParams = parse_params(request.params)?;
            let client = session.resource().await?;
            client
                .fetch_doc(&params.url)
                .await
                .map(|doc| Json(doc).into_response())
        }
        "anp.invokeOpenRPC" => {
            let params: InvokeOpenRpcParams = parse_params(request.params)?;
            let client = session.resource().await?;
            client
                .invoke_openrpc(&params.endpoint, &params.method, params.params, params.id)
                .await
                .map(|result| Json(result).into_response())
        }
        other => {
            return Err(WebError::InvalidArgument(format!(
                "Unknown method '{}'",
                other
            )))
        }
    };

    Ok(outcome.unwrap_or_else(tool_failure))
}

/// Describe the caller's session
#[utoipa::path(
    get,
    path = "/mcp/session",
    tag = "Bridge",
    summary = "Session info",
    description = "Without `Mcp-Session-Id` a new session is opened, initialized and its id returned in that header.",
    params(
        ("Mcp-Session-Id" = Option<String>, Header, description = "Session to inspect")
    ),
    responses(
        (status = 200, description = "Bound session", body = SessionInfoResponse),
        (status = 401, description = "AUTHENTICATION_FAILED or INVALID_SESSION", body = ErrorEnvelope),
        (status = 500, description = "SESSION_CREATION_FAILED", body = ErrorEnvelope)
    ),
    security(("bearer_auth" = []))
)]
pub async fn session_info(session: CurrentSession) -> Json<SessionInfoResponse> {
    Json(session.entry().snapshot(Instant::now()).into())
}

fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, WebError> {
    serde_json::from_value(params)
        .map_err(|e| WebError::InvalidArgument(format!("Invalid params: {}", e)))
}

fn tool_failure(err: ToolError) -> Response {
    warn!(code = err.code, error = %err.message, "Tool call failed");
    Json(ErrorEnvelope::new(err.code, err.message)).into_response()
}
