use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use super::http::HttpClient;
use crate::action::{ActionResponse, RawActionData};
use crate::connection::ConnectedAccount;

/// Default platform endpoint.
pub const DEFAULT_BASE_URL: &str = "https://backend.composio.dev";

/// Query for listing platform-hosted actions.
///
/// List-valued filters are already comma-joined, the way the platform expects
/// them on the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_case: Option<String>,
    #[serde(rename = "usecaseLimit", skip_serializing_if = "Option::is_none")]
    pub use_case_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_important_actions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Body of a remote execution request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionExecution {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_account_id: Option<String>,
    pub entity_id: String,
    pub app_name: String,
    pub input: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Query for listing connected accounts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectedAccountQuery {
    /// Entity the accounts belong to
    pub entity_id: Option<String>,
    /// Restrict to these apps
    pub app_names: Vec<String>,
    /// Ask the backend for active accounts only
    pub active_only: bool,
}

/// Toolkit metadata needed to decide whether execution needs credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppInfo {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub no_auth: bool,
    #[serde(default)]
    pub auth_schemes: Vec<Value>,
}

/// A file to place in the platform's object store.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub action: String,
    pub app: String,
    pub filename: String,
    pub mimetype: String,
    pub content: Vec<u8>,
}

/// Bytes fetched from a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedFile {
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

/// Where a proxied parameter goes on the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Header,
    Query,
}

/// An extra header or query parameter on a proxied request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyParameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub value: String,
}

/// An HTTP call the platform performs on behalf of a connected account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub endpoint: String,
    pub method: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ProxyParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ProxyRequest {
    /// Creates a proxied GET request.
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: "GET".to_string(),
            parameters: Vec::new(),
            body: None,
        }
    }

    /// Creates a proxied POST request with a JSON body.
    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: "POST".to_string(),
            parameters: Vec::new(),
            body: Some(body),
        }
    }

    /// Creates a proxied request with any method and no body.
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            method: method.into().to_uppercase(),
            ..Self::get(endpoint)
        }
    }

    /// Adds a header or query parameter.
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        location: ParameterLocation,
        value: impl Into<String>,
    ) -> Self {
        self.parameters.push(ProxyParameter {
            name: name.into(),
            location,
            value: value.into(),
        });
        self
    }
}

/// Errors that can occur when talking to the platform.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A network error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The platform answered with a non-success status
    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },
    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// The response could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// The client could not be configured
    #[error("Client configuration error: {0}")]
    Config(String),
}

/// The platform surface the toolset depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComposioApi: Send + Sync {
    /// Lists platform-hosted actions matching the query.
    async fn list_actions(&self, query: &ActionListQuery) -> Result<Vec<RawActionData>, ApiError>;
    /// Fetches a single action by name.
    async fn get_action(&self, name: &str) -> Result<RawActionData, ApiError>;
    /// Executes a platform-hosted action.
    async fn execute_action(
        &self,
        name: &str,
        request: &ActionExecution,
    ) -> Result<ActionResponse, ApiError>;
    /// Lists connected accounts.
    async fn list_connected_accounts(
        &self,
        query: &ConnectedAccountQuery,
    ) -> Result<Vec<ConnectedAccount>, ApiError>;
    /// Fetches a connected account by id.
    async fn get_connected_account(&self, id: &str) -> Result<ConnectedAccount, ApiError>;
    /// Fetches toolkit metadata.
    async fn get_app(&self, key: &str) -> Result<AppInfo, ApiError>;
    /// Uploads a file and returns its object-store key.
    async fn upload_file(&self, upload: &FileUpload) -> Result<String, ApiError>;
    /// Downloads the content behind a URL.
    async fn download_file(&self, url: &str) -> Result<DownloadedFile, ApiError>;
    /// Performs an authenticated HTTP call through the platform.
    async fn execute_proxy(
        &self,
        connected_account_id: &str,
        request: &ProxyRequest,
    ) -> Result<Value, ApiError>;
}

/// A builder for creating platform clients.
#[derive(Debug, Default)]
pub struct ComposioClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl ComposioClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Creates the HTTP client.
    pub fn build_http(self) -> Result<Arc<dyn ComposioApi>, ApiError> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("COMPOSIO_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ApiError::Config("Composio API key not provided".to_string()))?;
        let base_url = self
            .base_url
            .or_else(|| std::env::var("COMPOSIO_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Arc::new(HttpClient::new(api_key, base_url, self.timeout)?))
    }
}
