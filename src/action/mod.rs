pub mod callback;
pub mod registry;
pub mod schema;

pub use callback::{ActionHandler, AuthCredentials, ExecuteRequest, StandaloneExecute, ToolkitExecute};
pub use registry::{ActionRegistry, CreateActionOptions, ExecuteMetadata, RegisteredAction};
pub use schema::{Field, ObjectSchema, ParamKind, ParamSchema, SchemaError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ComposioError;

/// Input and output parameter maps.
pub type Params = Map<String, Value>;

/// Entity used when the caller does not name one.
pub const DEFAULT_ENTITY_ID: &str = "default";

fn default_object_type() -> String {
    "object".to_string()
}

fn default_enabled() -> bool {
    true
}

/// JSON Schema describing an action's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionParameters {
    #[serde(rename = "type", default = "default_object_type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Required property names, in declaration order
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ActionParameters {
    fn default() -> Self {
        Self {
            schema_type: default_object_type(),
            title: None,
            description: None,
            required: Vec::new(),
            properties: Map::new(),
            extra: Map::new(),
        }
    }
}

/// Canonical description of an invocable action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawActionData {
    /// Unique identifier, matched case-insensitively
    pub name: String,
    #[serde(default, alias = "displayName")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "appKey", skip_serializing_if = "Option::is_none")]
    pub app_key: Option<String>,
    #[serde(default, rename = "appName", skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub parameters: ActionParameters,
    /// Result shape, informational only
    #[serde(default)]
    pub response: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawActionData {
    /// Creates an action description with empty parameters.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: None,
            app_key: None,
            app_name: None,
            tags: Vec::new(),
            enabled: true,
            parameters: ActionParameters::default(),
            response: Value::Null,
            extra: Map::new(),
        }
    }

    /// Owning toolkit, if any.
    pub fn app(&self) -> Option<&str> {
        self.app_name.as_deref().or(self.app_key.as_deref())
    }

    /// Whether the action carries the given tag (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// The result of executing an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    // The platform has shipped both spellings.
    #[serde(default, alias = "successfull")]
    pub successful: bool,
}

impl ActionResponse {
    /// Creates a successful response.
    pub fn success(data: Value) -> Self {
        Self {
            data,
            error: None,
            successful: true,
        }
    }

    /// Creates a failed response.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            data: Value::Object(Map::new()),
            error: Some(error.into()),
            successful: false,
        }
    }
}

/// A request to execute an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteActionParams {
    pub action: String,
    #[serde(default)]
    pub params: Params,
    /// Entity to run as; the toolset's entity when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_account_id: Option<String>,
    /// Natural-language instruction forwarded to the platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ExecuteActionParams {
    /// Creates a request with no parameters for the toolset's entity.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Params::new(),
            entity_id: None,
            connected_account_id: None,
            text: None,
        }
    }

    /// Sets the input parameters from a JSON object.
    ///
    /// Non-object values are ignored.
    pub fn with_params(mut self, params: Value) -> Self {
        if let Value::Object(map) = params {
            self.params = map;
        }
        self
    }

    /// Sets the entity.
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Pins execution to a connected account.
    pub fn with_connected_account_id(mut self, id: impl Into<String>) -> Self {
        self.connected_account_id = Some(id.into());
        self
    }

    /// Sets the natural-language instruction.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// The explicit account id, ignoring blanks.
    pub fn account_id(&self) -> Option<&str> {
        self.connected_account_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// The entity to run as, or `fallback` when none was named.
    pub fn entity_id_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.entity_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(fallback)
    }

    /// Checks that the request carries enough routing information.
    pub fn validate(&self) -> Result<(), ComposioError> {
        if self.action.trim().is_empty() {
            return Err(ComposioError::InvalidParams(
                "action name is required".to_string(),
            ));
        }
        let blank_entity = self
            .entity_id
            .as_deref()
            .is_some_and(|id| id.trim().is_empty());
        if blank_entity && self.account_id().is_none() {
            return Err(ComposioError::InvalidParams(
                "either entity_id or connected_account_id is required".to_string(),
            ));
        }
        Ok(())
    }
}
