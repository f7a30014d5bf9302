//! Collaborator seams: who may open a session, and what a session owns

use crate::error::{BridgeError, BridgeResult};
use crate::types::Credential;
use async_trait::async_trait;
use tracing::{debug, info};

/// Maps a bearer token to a tenant credential.
///
/// Implementations may do arbitrary external validation but must not touch
/// the session registry. Any `Err` is reported to the client as
/// `AUTHENTICATION_FAILED`.
#[async_trait]
pub trait AuthResolver: Send + Sync {
    async fn resolve(&self, token: Option<&str>) -> BridgeResult<Credential>;
}

/// Builds the per-session resource from a credential.
///
/// Called at most once per session. A failure rolls the session back.
#[async_trait]
pub trait ResourceFactory: Send + Sync {
    type Resource: Send + Sync + 'static;

    async fn make(&self, credential: &Credential) -> BridgeResult<Self::Resource>;
}

/// Accepts any token, including none, and hands out one fixed credential
#[derive(Debug, Clone)]
pub struct PermissiveResolver {
    credential: Credential,
}

impl PermissiveResolver {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl AuthResolver for PermissiveResolver {
    async fn resolve(&self, token: Option<&str>) -> BridgeResult<Credential> {
        debug!(has_token = token.is_some(), "Permissive resolver accepted request");
        Ok(self.credential.clone())
    }
}

/// Accepts exactly one shared token
#[derive(Debug, Clone)]
pub struct StaticTokenResolver {
    token: String,
    credential: Credential,
}

impl StaticTokenResolver {
    pub fn new(token: impl Into<String>, credential: Credential) -> Self {
        Self {
            token: token.into(),
            credential,
        }
    }
}

#[async_trait]
impl AuthResolver for StaticTokenResolver {
    async fn resolve(&self, token: Option<&str>) -> BridgeResult<Credential> {
        match token {
            Some(token) if token == self.token => {
                info!("Static token accepted");
                Ok(self.credential.clone())
            }
            Some(_) => Err(BridgeError::authentication_failed("Invalid bearer token")),
            None => Err(BridgeError::authentication_failed("Missing bearer token")),
        }
    }
}

/// Adapts a plain closure into a resolver
pub struct FnResolver<F> {
    f: F,
}

impl<F> FnResolver<F>
where
    F: Fn(Option<&str>) -> BridgeResult<Credential> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> AuthResolver for FnResolver<F>
where
    F: Fn(Option<&str>) -> BridgeResult<Credential> + Send + Sync,
{
    async fn resolve(&self, token: Option<&str>) -> BridgeResult<Credential> {
        (self.f)(token)
    }
}
