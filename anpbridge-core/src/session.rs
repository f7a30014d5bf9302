//! Session registry
//!
//! Owns the mapping from session id to [`SessionEntry`]. The map lock is held
//! only for insert/lookup/remove/sweep; resource construction happens outside
//! it behind a per-entry once-cell, so unrelated sessions never wait on each
//! other's factory calls.

use crate::error::{BridgeError, BridgeResult, ErrorContext};
use crate::traits::ResourceFactory;
use crate::types::{Credential, SessionId, SessionSnapshot};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One tenant's session state
pub struct SessionEntry<R> {
    session_id: SessionId,
    credential: Credential,
    resource: OnceCell<Arc<R>>,
    /// Set once the factory has failed for this entry; later callers must not retry it.
    failed: AtomicBool,
    created_at: DateTime<Utc>,
    created: Instant,
    /// Nanoseconds between `created` and the latest access. Only ever moves forward.
    last_accessed_nanos: AtomicU64,
}

impl<R> SessionEntry<R> {
    fn new(session_id: SessionId, credential: Credential, now: Instant) -> Self {
        Self {
            session_id,
            credential,
            resource: OnceCell::new(),
            failed: AtomicBool::new(false),
            created_at: Utc::now(),
            created: now,
            last_accessed_nanos: AtomicU64::new(0),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Wall-clock creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The resource, if it has been initialized
    pub fn resource(&self) -> Option<Arc<R>> {
        self.resource.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.resource.initialized()
    }

    pub fn last_accessed(&self) -> Instant {
        self.created + Duration::from_nanos(self.last_accessed_nanos.load(Ordering::Acquire))
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_accessed())
    }

    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        self.idle_for(now) > timeout
    }

    fn touch(&self, now: Instant) {
        let offset = now.saturating_duration_since(self.created).as_nanos();
        let offset = u64::try_from(offset).unwrap_or(u64::MAX);
        // fetch_max keeps concurrent touches from moving the timestamp backwards
        self.last_accessed_nanos.fetch_max(offset, Ordering::AcqRel);
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            created_at: self.created_at,
            idle_secs: self.idle_for(now).as_secs_f64(),
            initialized: self.is_initialized(),
        }
    }
}

impl<R> std::fmt::Debug for SessionEntry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEntry")
            .field("session_id", &self.session_id)
            .field("credential", &self.credential)
            .field("initialized", &self.is_initialized())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Mapping from session id to live session
pub struct SessionRegistry<R> {
    sessions: RwLock<HashMap<SessionId, Arc<SessionEntry<R>>>>,
    factory: Arc<dyn ResourceFactory<Resource = R>>,
}

impl<R> SessionRegistry<R>
where
    R: Send + Sync + 'static,
{
    pub fn new(factory: Arc<dyn ResourceFactory<Resource = R>>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            factory,
        }
    }

    /// Create a session and return its id
    pub async fn create(&self, credential: Credential) -> SessionId {
        self.create_entry(credential).await.session_id.clone()
    }

    /// Create a session and return the entry itself
    pub async fn create_entry(&self, credential: Credential) -> Arc<SessionEntry<R>> {
        let mut sessions = self.sessions.write().await;

        let session_id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
            warn!("Session id collision, regenerating");
        };

        let entry = Arc::new(SessionEntry::new(
            session_id.clone(),
            credential,
            Instant::now(),
        ));
        sessions.insert(session_id.clone(), Arc::clone(&entry));

        info!(
            session_id = %session_id,
            total_sessions = sessions.len(),
            "Session created"
        );
        entry
    }

    /// Look up a session. A hit resets its idle timer.
    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionEntry<R>>> {
        let entry = self.sessions.read().await.get(session_id).cloned()?;
        entry.touch(Instant::now());
        debug!(session_id = %session_id, "Session touched");
        Some(entry)
    }

    /// Remove a session. Returns whether it was present; absence is not an error.
    pub async fn remove(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(session_id).is_some();
        if removed {
            info!(
                session_id = %session_id,
                total_sessions = sessions.len(),
                "Session removed"
            );
        }
        removed
    }

    /// Evict every session idle for longer than `timeout`
    pub async fn sweep(&self, timeout: Duration) -> usize {
        self.sweep_at(Instant::now(), timeout).await
    }

    /// Evict against an explicit clock reading
    pub async fn sweep_at(&self, now: Instant, timeout: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|session_id, entry| {
            let expired = entry.is_expired(now, timeout);
            if expired {
                debug!(session_id = %session_id, "Evicting idle session");
            }
            !expired
        });

        let removed = before - sessions.len();
        if removed > 0 {
            info!(
                removed,
                timeout_secs = timeout.as_secs(),
                total_sessions = sessions.len(),
                "Cleaned up expired sessions"
            );
        } else {
            debug!(total_sessions = sessions.len(), "No expired sessions to clean up");
        }
        removed
    }

    /// Build the entry's resource on first use.
    ///
    /// Concurrent callers on the same entry share a single factory call. If the
    /// factory fails the entry is removed before the error is returned.
    pub async fn initialize(&self, entry: &Arc<SessionEntry<R>>) -> BridgeResult<Arc<R>> {
        let result = entry
            .resource
            .get_or_try_init(|| async {
                if entry.failed.load(Ordering::Acquire) {
                    return Err(BridgeError::session_creation_failed(
                        "Session initialization already failed",
                    ));
                }

                info!(session_id = %entry.session_id, "Initializing session");
                let outcome = AssertUnwindSafe(self.factory.make(&entry.credential))
                    .catch_unwind()
                    .await;

                match outcome {
                    Ok(Ok(resource)) => {
                        info!(session_id = %entry.session_id, "Session initialized successfully");
                        Ok(Arc::new(resource))
                    }
                    Ok(Err(err)) => {
                        entry.failed.store(true, Ordering::Release);
                        Err(into_creation_failure(err))
                    }
                    Err(panic) => {
                        entry.failed.store(true, Ordering::Release);
                        Err(BridgeError::session_creation_failed(format!(
                            "Resource factory panicked: {}",
                            panic_message(panic.as_ref())
                        )))
                    }
                }
            })
            .await;

        match result {
            Ok(resource) => Ok(Arc::clone(resource)),
            Err(err) => {
                warn!(
                    session_id = %entry.session_id,
                    error = %err,
                    "Failed to initialize session, rolling back"
                );
                self.remove(&entry.session_id).await;
                Err(err)
            }
        }
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn into_creation_failure(err: BridgeError) -> BridgeError {
    match err {
        err @ BridgeError::SessionCreationFailed { .. } => err,
        other => BridgeError::SessionCreationFailed {
            message: other.to_string(),
            source: Some(Box::new(other)),
            context: ErrorContext::new("session_registry")
                .with_operation("initialize")
                .with_suggestion("Retry later; a new session will be created"),
        },
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
