//! Session middleware
//!
//! Resolves or creates the session for each request under `/mcp` and binds it
//! to the request's extensions, where [`CurrentSession`](crate::auth::CurrentSession)
//! picks it up. Bindings live and die with the request.

use crate::{anp::AnpClient, auth, AppState, WebError, MCP_SESSION_ID};
use anpbridge_core::{BridgeError, SessionEntry};
use axum::{
    extract::{Request, State},
    http::{header::ACCESS_CONTROL_EXPOSE_HEADERS, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The session bound to one in-flight request
#[derive(Clone)]
pub struct SessionBinding {
    pub entry: Arc<SessionEntry<AnpClient>>,
    /// Whether this request created the session
    pub created: bool,
}

/// Look up the session named by `Mcp-Session-Id`, or authenticate and open a new one.
///
/// A new session is initialized before the handler runs, so a failed creation
/// is rejected with `SESSION_CREATION_FAILED` and its id never leaves the
/// server. Responses to session-creating requests carry the new id, as long as
/// the session survived the handler.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let binding = bind_session(&state, request.headers()).await?;
    let created_id = binding
        .created
        .then(|| binding.entry.session_id().to_string());

    if binding.created {
        state.registry.initialize(&binding.entry).await?;
    }

    request.extensions_mut().insert(binding);
    let mut response = next.run(request).await;

    if let Some(session_id) = created_id {
        if state.registry.contains(&session_id).await {
            attach_session_header(&mut response, &session_id);
        } else {
            debug!(session_id = %session_id, "Session rolled back, not returning its id");
        }
    }

    Ok(response)
}

async fn bind_session(state: &AppState, headers: &HeaderMap) -> Result<SessionBinding, WebError> {
    // an empty id counts as no id
    if let Some(value) = headers.get(MCP_SESSION_ID).filter(|v| !v.is_empty()) {
        let session_id = value
            .to_str()
            .map_err(|_| BridgeError::invalid_session("<non-ascii>"))?;

        return match state.registry.get(session_id).await {
            Some(entry) => {
                debug!(session_id = %session_id, "Using existing session");
                Ok(SessionBinding {
                    entry,
                    created: false,
                })
            }
            None => {
                warn!(session_id = %session_id, "Invalid or expired session id");
                Err(BridgeError::invalid_session(session_id).into())
            }
        };
    }

    let token = auth::bearer_token(headers)?;
    let resolver = state.auth_resolver().await;
    let credential = auth::resolve_credential(resolver.as_ref(), token.as_deref()).await?;

    let entry = state.registry.create_entry(credential).await;
    info!(session_id = %entry.session_id(), "Created new session");

    Ok(SessionBinding {
        entry,
        created: true,
    })
}

fn attach_session_header(response: &mut Response, session_id: &str) {
    let Ok(value) = HeaderValue::from_str(session_id) else {
        warn!(session_id = %session_id, "Session id is not a valid header value");
        return;
    };

    let headers = response.headers_mut();
    headers.insert(MCP_SESSION_ID, value);
    headers.insert(
        ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(MCP_SESSION_ID),
    );
}
