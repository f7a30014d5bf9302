//! Core data types shared by the registry, the resolvers and the web layer

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque session identifier handed to clients in the `Mcp-Session-Id` header
pub type SessionId = String;

/// Tenant credential produced by an [`AuthResolver`](crate::AuthResolver).
///
/// Points at the DID material that backs the tenant's resource. It is never
/// mutated after the resolver hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential {
    /// DID document JSON file
    pub did_document_path: PathBuf,
    /// DID private key PEM file
    pub private_key_path: PathBuf,
}

impl Credential {
    pub fn new(did_document_path: impl Into<PathBuf>, private_key_path: impl Into<PathBuf>) -> Self {
        Self {
            did_document_path: did_document_path.into(),
            private_key_path: private_key_path.into(),
        }
    }
}

/// Point-in-time view of a session, safe to serialize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub idle_secs: f64,
    pub initialized: bool,
}
