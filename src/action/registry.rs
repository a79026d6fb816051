use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::callback::{ActionHandler, AuthCredentials, ExecuteRequest};
use super::schema::ObjectSchema;
use super::{ActionResponse, Params, RawActionData};
use crate::client::ComposioApi;
use crate::connection::resolve_connected_account;
use crate::error::ComposioError;

/// Tag carried by every custom action.
pub const CUSTOM_TAG: &str = "custom";

/// Options for registering a custom action.
#[derive(Debug, Clone, Default)]
pub struct CreateActionOptions {
    pub action_name: Option<String>,
    pub description: Option<String>,
    pub input_params: ObjectSchema,
    pub handler: Option<ActionHandler>,
}

impl CreateActionOptions {
    /// Starts options for the named action.
    pub fn new(action_name: impl Into<String>) -> Self {
        Self {
            action_name: Some(action_name.into()),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn input_params(mut self, input_params: ObjectSchema) -> Self {
        self.input_params = input_params;
        self
    }

    /// Sets a callback that needs no credentials.
    pub fn callback<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ActionResponse>> + Send + 'static,
    {
        self.handler = Some(ActionHandler::standalone(callback));
        self
    }

    /// Sets a callback that runs with the toolkit's credentials.
    pub fn toolkit_callback<F, Fut>(mut self, toolkit: impl Into<String>, callback: F) -> Self
    where
        F: Fn(Params, AuthCredentials, ExecuteRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ActionResponse>> + Send + 'static,
    {
        self.handler = Some(ActionHandler::toolkit(toolkit, callback));
        self
    }

    pub fn handler(mut self, handler: ActionHandler) -> Self {
        self.handler = Some(handler);
        self
    }
}

/// A custom action as stored in the registry.
#[derive(Debug, Clone)]
pub struct RegisteredAction {
    /// The typed input declaration
    pub schema: ObjectSchema,
    pub name: String,
    pub description: Option<String>,
    pub handler: ActionHandler,
    /// The platform-shaped description advertised to callers
    pub composio_schema: RawActionData,
}

impl RegisteredAction {
    /// The associated toolkit, if any.
    pub fn toolkit(&self) -> Option<&str> {
        self.handler.toolkit_name()
    }
}

/// Who an execution runs for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteMetadata {
    pub entity_id: String,
    pub connection_id: Option<String>,
}

/// A registry of locally-defined actions.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, RegisteredAction>,
    // Registration order of the keys in `actions`.
    order: Vec<String>,
}

impl ActionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action, replacing any action with the same name.
    pub fn register(&mut self, options: CreateActionOptions) -> Result<RawActionData, ComposioError> {
        let name = options
            .action_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ComposioError::InvalidParams("action_name is required".to_string()))?;
        let handler = options.handler.ok_or_else(|| {
            ComposioError::InvalidParams(format!("action '{}' has no callback", name))
        })?;

        let mut composio_schema = RawActionData::new(name.clone());
        composio_schema.description = options.description.clone();
        composio_schema.parameters = options
            .input_params
            .to_action_parameters(name.clone(), options.description.clone());
        composio_schema.tags = vec![CUSTOM_TAG.to_string()];
        if let Some(toolkit) = handler.toolkit_name() {
            composio_schema.app_name = Some(toolkit.to_string());
            composio_schema.app_key = Some(toolkit.to_string());
        }

        let key = name.to_lowercase();
        debug!(action = %name, toolkit = ?handler.toolkit_name(), "Registering custom action");

        let registered = RegisteredAction {
            schema: options.input_params,
            name,
            description: options.description,
            handler,
            composio_schema: composio_schema.clone(),
        };
        if self.actions.insert(key.clone(), registered).is_none() {
            self.order.push(key);
        }

        Ok(composio_schema)
    }

    /// Gets an action by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&RegisteredAction> {
        self.actions.get(&name.to_lowercase())
    }

    /// Whether an action with the name exists (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Schemas of the named actions; unknown names are skipped.
    pub fn get_actions<S: AsRef<str>>(&self, names: &[S]) -> Vec<RawActionData> {
        names
            .iter()
            .filter_map(|name| self.get(name.as_ref()))
            .map(|action| action.composio_schema.clone())
            .collect()
    }

    /// Schemas of all actions, in registration order.
    pub fn get_all_actions(&self) -> Vec<RawActionData> {
        self.order
            .iter()
            .filter_map(|key| self.actions.get(key))
            .map(|action| action.composio_schema.clone())
            .collect()
    }

    /// Returns the number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Runs a registered action.
    ///
    /// Toolkit actions receive the credentials of `metadata.connection_id`, or
    /// of the entity's resolved account when no id is given.
    pub async fn execute(
        &self,
        name: &str,
        params: Params,
        metadata: &ExecuteMetadata,
        api: &Arc<dyn ComposioApi>,
    ) -> Result<ActionResponse, ComposioError> {
        let action = self
            .get(name)
            .ok_or_else(|| ComposioError::ActionNotFound(name.to_string()))?;

        let response = match &action.handler {
            ActionHandler::Standalone(callback) => {
                debug!(action = %action.name, "Running standalone custom action");
                callback.call(params).await?
            }
            ActionHandler::Toolkit { toolkit, callback } => {
                let account = resolve_connected_account(
                    api.as_ref(),
                    &metadata.entity_id,
                    toolkit,
                    metadata.connection_id.as_deref(),
                )
                .await?;
                debug!(
                    action = %action.name,
                    toolkit = %toolkit,
                    connected_account_id = %account.id,
                    "Running toolkit custom action"
                );

                let credentials = AuthCredentials::from_account(&account);
                let execute_request = ExecuteRequest::new(api.clone(), account.id);
                callback.call(params, credentials, execute_request).await?
            }
        };

        Ok(response)
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.order)
            .finish()
    }
}
