//! Application state shared by the middleware and the handlers

use crate::{anp::AnpClient, anp::DidResourceFactory, auth, WebConfig, WebResult};
use anpbridge_core::{AuthResolver, ResourceFactory, SessionRegistry};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Session registry specialised to the ANP client resource
pub type AnpSessionRegistry = SessionRegistry<AnpClient>;

#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: WebConfig,
    /// Live sessions, one ANP client each
    pub registry: Arc<AnpSessionRegistry>,
    /// Active resolver; swappable while the server runs
    resolver: Arc<RwLock<Arc<dyn AuthResolver>>>,
}

impl AppState {
    /// Create the state with the resolver implied by `config` and the DID-backed ANP client factory
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        config.session.validate()?;

        let resolver = auth::resolver_from_config(&config);
        let factory: Arc<dyn ResourceFactory<Resource = AnpClient>> =
            Arc::new(DidResourceFactory::default());

        let state = Self::with_components(config, resolver, factory);
        info!(
            auth_enabled = state.config.enable_auth,
            idle_timeout_secs = state.config.session.idle_timeout_secs,
            sweep_interval_secs = state.config.session.sweep_interval_secs,
            "Application state initialized successfully"
        );
        Ok(state)
    }

    /// Create the state from explicit collaborators
    pub fn with_components(
        config: WebConfig,
        resolver: Arc<dyn AuthResolver>,
        factory: Arc<dyn ResourceFactory<Resource = AnpClient>>,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(SessionRegistry::new(factory)),
            resolver: Arc::new(RwLock::new(resolver)),
        }
    }

    /// Current resolver. Callers keep the returned handle for the whole request.
    pub async fn auth_resolver(&self) -> Arc<dyn AuthResolver> {
        Arc::clone(&*self.resolver.read().await)
    }

    /// Replace the resolver used for new sessions
    pub async fn set_auth_resolver(&self, resolver: Arc<dyn AuthResolver>) {
        *self.resolver.write().await = resolver;
        info!("Auth resolver replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anpbridge_core::{Credential, StaticTokenResolver};

    #[tokio::test]
    async fn test_resolver_can_be_swapped() {
        let state = AppState::new(WebConfig::default()).await.unwrap();
        assert!(state.auth_resolver().await.resolve(None).await.is_ok());

        state
            .set_auth_resolver(Arc::new(StaticTokenResolver::new(
                "good",
                Credential::new("did.json", "key.pem"),
            )))
            .await;

        let resolver = state.auth_resolver().await;
        assert!(resolver.resolve(None).await.is_err());
        assert!(resolver.resolve(Some("good")).await.is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_registry() {
        let state = AppState::new(WebConfig::default()).await.unwrap();
        let clone = state.clone();

        let id = state
            .registry
            .create(Credential::new("did.json", "key.pem"))
            .await;
        assert!(clone.registry.contains(&id).await);
    }

    #[tokio::test]
    async fn test_independent_states_are_isolated() {
        let first = AppState::new(WebConfig::default()).await.unwrap();
        let second = AppState::new(WebConfig::default()).await.unwrap();

        let id = first
            .registry
            .create(Credential::new("did.json", "key.pem"))
            .await;
        assert!(!second.registry.contains(&id).await);
    }
}
