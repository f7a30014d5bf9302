//! ANP client: the per-session resource behind the bridge tools

use anpbridge_core::{BridgeError, BridgeResult, Credential, ResourceFactory};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{error, info};
use url::Url;

const USER_AGENT: &str = concat!("anpbridge/", env!("CARGO_PKG_VERSION"));
const DID_SUBJECT_HEADER: &str = "x-did-subject";

/// Failure of a single tool call. Reported to the client with `ok: false`
/// but does not affect the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ToolError {
    pub code: &'static str,
    pub message: String,
}

impl ToolError {
    fn fetch(message: impl Into<String>) -> Self {
        Self {
            code: "ANP_FETCH_ERROR",
            message: message.into(),
        }
    }

    fn rpc(message: impl Into<String>) -> Self {
        Self {
            code: "ANP_RPC_ERROR",
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            code: "INVALID_ARGUMENT",
            message: message.into(),
        }
    }
}

/// A fetched ANP document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedDoc {
    pub ok: bool,
    pub content_type: String,
    pub text: String,
}

/// Session-scoped client acting as one DID
#[derive(Debug)]
pub struct AnpClient {
    did: String,
    credential: Credential,
    http: reqwest::Client,
    next_rpc_id: AtomicU64,
}

impl AnpClient {
    pub fn did(&self) -> &str {
        &self.did
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Fetch a document (agent description, interface spec, ...) as text
    pub async fn fetch_doc(&self, url: &str) -> Result<FetchedDoc, ToolError> {
        let url = parse_http_url(url)?;
        info!(url = %url, did = %self.did, "Fetching document");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!(url = %url, error = %e, "Failed to fetch document");
                ToolError::fetch(e.to_string())
            })?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();

        let text = response
            .text()
            .await
            .map_err(|e| ToolError::fetch(e.to_string()))?;

        info!(url = %url, content_length = text.len(), "Document fetched successfully");
        Ok(FetchedDoc {
            ok: true,
            content_type,
            text,
        })
    }

    /// Invoke a JSON-RPC 2.0 method on an OpenRPC endpoint.
    ///
    /// Array params are wrapped as `{"args": [...]}` and scalars as
    /// `{"value": ...}`; a missing id is filled in from a per-client counter.
    pub async fn invoke_openrpc(
        &self,
        endpoint: &str,
        method: &str,
        params: Option<Value>,
        id: Option<String>,
    ) -> Result<Value, ToolError> {
        let endpoint = parse_http_url(endpoint)?;
        if method.trim().is_empty() {
            return Err(ToolError::invalid_argument("method must not be empty"));
        }

        let id = id.unwrap_or_else(|| {
            self.next_rpc_id
                .fetch_add(1, Ordering::Relaxed)
                .to_string()
        });
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": normalize_params(params),
            "id": id,
        });

        info!(endpoint = %endpoint, method = %method, "Invoking OpenRPC method");

        let reply: Value = self
            .http
            .post(endpoint.clone())
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!(endpoint = %endpoint, method = %method, error = %e, "Failed to invoke OpenRPC method");
                ToolError::rpc(e.to_string())
            })?
            .json()
            .await
            .map_err(|e| ToolError::rpc(format!("Invalid JSON-RPC response: {}", e)))?;

        if let Some(rpc_error) = reply.get("error") {
            let message = rpc_error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| rpc_error.to_string());
            return Err(ToolError::rpc(message));
        }

        let result = reply.get("result").cloned().unwrap_or(Value::Null);
        info!(method = %method, "OpenRPC method invoked successfully");
        Ok(json!({ "ok": true, "result": result }))
    }
}

fn parse_http_url(raw: &str) -> Result<Url, ToolError> {
    let url = Url::parse(raw)
        .map_err(|e| ToolError::invalid_argument(format!("Invalid URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ToolError::invalid_argument(format!(
            "Unsupported URL scheme '{}'",
            other
        ))),
    }
}

fn normalize_params(params: Option<Value>) -> Value {
    match params {
        None | Some(Value::Null) => json!({}),
        Some(Value::Object(map)) => Value::Object(map),
        Some(Value::Array(args)) => json!({ "args": args }),
        Some(other) => json!({ "value": other }),
    }
}

/// Builds an [`AnpClient`] from the DID document and private key a credential points at
#[derive(Debug, Clone)]
pub struct DidResourceFactory {
    request_timeout: Duration,
}

impl Default for DidResourceFactory {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl DidResourceFactory {
    pub fn with_timeout(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    async fn read_did(credential: &Credential) -> BridgeResult<String> {
        let path = &credential.did_document_path;
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            BridgeError::session_creation_failed(format!(
                "Cannot read DID document {}: {}",
                path.display(),
                e
            ))
        })?;

        let document: Value = serde_json::from_str(&raw).map_err(|e| {
            BridgeError::session_creation_failed(format!(
                "DID document {} is not valid JSON: {}",
                path.display(),
                e
            ))
        })?;

        document
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                BridgeError::session_creation_failed(format!(
                    "DID document {} has no id",
                    path.display()
                ))
            })
    }

    async fn check_private_key(credential: &Credential) -> BridgeResult<()> {
        let path = &credential.private_key_path;
        let pem = tokio::fs::read_to_string(path).await.map_err(|e| {
            BridgeError::session_creation_failed(format!(
                "Cannot read private key {}: {}",
                path.display(),
                e
            ))
        })?;

        if !pem.contains("PRIVATE KEY") {
            return Err(BridgeError::session_creation_failed(format!(
                "{} does not contain a PEM private key",
                path.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceFactory for DidResourceFactory {
    type Resource = AnpClient;

    async fn make(&self, credential: &Credential) -> BridgeResult<AnpClient> {
        let did = Self::read_did(credential).await?;
        Self::check_private_key(credential).await?;

        let mut headers = HeaderMap::new();
        let subject = HeaderValue::from_str(&did).map_err(|_| {
            BridgeError::session_creation_failed(format!("DID '{}' is not a valid header value", did))
        })?;
        headers.insert(DID_SUBJECT_HEADER, subject);

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| {
                BridgeError::session_creation_failed(format!("Failed to build HTTP client: {}", e))
            })?;

        info!(did = %did, "ANP client initialized successfully");
        Ok(AnpClient {
            did,
            credential: credential.clone(),
            http,
            next_rpc_id: AtomicU64::new(1),
        })
    }
}
