//! Error types for the composio toolset.

use thiserror::Error;

use crate::processor::ProcessorRole;

/// Unified error type for the toolset.
#[derive(Debug, Error)]
pub enum ComposioError {
    /// A processor was registered under the wrong role
    #[error("Invalid processor type: expected a {expected} processor, got a {actual} processor")]
    InvalidProcessorType {
        expected: ProcessorRole,
        actual: ProcessorRole,
    },

    /// The action is unknown to both the registry and the platform
    #[error("Action not found: {0}")]
    ActionNotFound(String),

    /// No usable credential for an action that needs one
    #[error("No connected account found for entity '{entity_id}' and app '{app}'")]
    NoConnectedAccount { entity_id: String, app: String },

    /// Mutually exclusive filter options were supplied together
    #[error("Invalid filter combination: {0}")]
    InvalidFilterCombination(String),

    /// The request is missing required information
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// A file parameter could not be read
    #[error("Failed to read file '{path}': {reason}")]
    FileReadError { path: String, reason: String },

    /// A platform call made on behalf of an action failed
    #[error("Action '{action}' failed: {source}")]
    ActionFailed {
        action: String,
        #[source]
        source: crate::client::ApiError,
    },

    /// Platform error
    #[error("API error: {0}")]
    Api(#[from] crate::client::ApiError),

    /// Schema conversion error
    #[error("Schema error: {0}")]
    Schema(#[from] crate::action::SchemaError),

    /// A custom action callback failed
    #[error("Callback error: {0}")]
    Callback(#[from] anyhow::Error),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
