//! Bearer-token authentication and the request-bound session extractor

use crate::{
    anp::AnpClient, middleware::SessionBinding, state::AnpSessionRegistry, AppState, WebConfig,
    WebError,
};
use anpbridge_core::{
    AuthResolver, BridgeError, BridgeResult, Credential, FnResolver, PermissiveResolver,
    SessionEntry, StaticTokenResolver,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pick the resolver implied by the configuration.
///
/// - auth disabled: any request gets the configured public credential
/// - auth enabled with a token: only that token is accepted
/// - auth enabled without a token: any bearer token is accepted, but one must be sent
pub fn resolver_from_config(config: &WebConfig) -> Arc<dyn AuthResolver> {
    let credential = Credential::new(&config.did_document_path, &config.did_private_key_path);

    match (config.enable_auth, &config.auth_token) {
        (false, _) => {
            info!("Authentication disabled (using default public credentials)");
            Arc::new(PermissiveResolver::new(credential))
        }
        (true, Some(token)) => {
            info!("Authentication enabled with fixed token");
            Arc::new(StaticTokenResolver::new(token.clone(), credential))
        }
        (true, None) => {
            info!("Authentication enabled with default callback (public credentials)");
            Arc::new(FnResolver::new(move |token: Option<&str>| match token {
                Some(_) => Ok(credential.clone()),
                None => Err(BridgeError::authentication_failed(
                    "Authorization header required",
                )),
            }))
        }
    }
}

/// Pull the bearer token out of the `Authorization` header.
///
/// An absent header yields `Ok(None)` and is left to the resolver. A header
/// that is present but not a non-empty `Bearer` token is rejected outright.
pub fn bearer_token(headers: &HeaderMap) -> BridgeResult<Option<String>> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        debug!("No Authorization header provided");
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| BridgeError::authentication_failed("Authorization header is not valid ASCII"))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| BridgeError::authentication_failed("Invalid Authorization header format"))?
        .trim();

    if token.is_empty() {
        return Err(BridgeError::authentication_failed("Empty bearer token"));
    }

    Ok(Some(token.to_string()))
}

/// Run a resolver, turning both errors and panics into `AuthenticationFailed`
pub async fn resolve_credential(
    resolver: &dyn AuthResolver,
    token: Option<&str>,
) -> BridgeResult<Credential> {
    match AssertUnwindSafe(resolver.resolve(token)).catch_unwind().await {
        Ok(Ok(credential)) => {
            debug!(token_prefix = ?token.map(token_prefix), "Auth callback succeeded");
            Ok(credential)
        }
        Ok(Err(err @ BridgeError::AuthenticationFailed { .. })) => Err(err),
        Ok(Err(other)) => {
            warn!(error = %other, "Auth callback execution failed");
            Err(BridgeError::authentication_failed(other.to_string()))
        }
        Err(_) => {
            warn!("Auth callback panicked");
            Err(BridgeError::authentication_failed("Authentication failed"))
        }
    }
}

fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(4)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}

/// The session bound to the current request by the session middleware
pub struct CurrentSession {
    entry: Arc<SessionEntry<AnpClient>>,
    registry: Arc<AnpSessionRegistry>,
}

impl CurrentSession {
    pub fn session_id(&self) -> &str {
        self.entry.session_id()
    }

    pub fn entry(&self) -> &SessionEntry<AnpClient> {
        &self.entry
    }

    /// The session's ANP client, built on first use.
    ///
    /// If building fails the session is gone afterwards and the error is
    /// `SESSION_CREATION_FAILED`.
    pub async fn resource(&self) -> Result<Arc<AnpClient>, WebError> {
        Ok(self.registry.initialize(&self.entry).await?)
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let binding = parts
            .extensions
            .get::<SessionBinding>()
            .cloned()
            .ok_or(WebError::NoSession)?;

        Ok(CurrentSession {
            entry: binding.entry,
            registry: app_state.registry,
        })
    }
}
