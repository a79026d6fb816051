use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::{ActionResponse, Params};
use crate::client::{ComposioApi, ProxyRequest};
use crate::connection::ConnectedAccount;
use crate::error::ComposioError;

/// Credentials extracted from a connected account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthCredentials {
    pub headers: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    pub base_url: Option<String>,
}

impl AuthCredentials {
    /// Extracts headers, query parameters and base URL from the account's
    /// connection parameters.
    pub fn from_account(account: &ConnectedAccount) -> Self {
        let params = &account.connection_params;
        Self {
            headers: string_map(params.get("headers")),
            query_params: string_map(params.get("queryParams")),
            base_url: params
                .get("baseUrl")
                .or_else(|| params.get("base_url"))
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

fn string_map(value: Option<&Value>) -> HashMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Proxies authenticated HTTP calls through the platform for one account.
#[derive(Clone)]
pub struct ExecuteRequest {
    api: Arc<dyn ComposioApi>,
    connected_account_id: String,
}

impl ExecuteRequest {
    pub fn new(api: Arc<dyn ComposioApi>, connected_account_id: impl Into<String>) -> Self {
        Self {
            api,
            connected_account_id: connected_account_id.into(),
        }
    }

    /// The account requests are made as.
    pub fn connected_account_id(&self) -> &str {
        &self.connected_account_id
    }

    /// Sends the request and returns the platform's response body.
    pub async fn execute(&self, request: ProxyRequest) -> Result<Value, ComposioError> {
        Ok(self
            .api
            .execute_proxy(&self.connected_account_id, &request)
            .await?)
    }
}

impl fmt::Debug for ExecuteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteRequest")
            .field("connected_account_id", &self.connected_account_id)
            .finish()
    }
}

/// Callback of an action that needs no credentials.
#[async_trait]
pub trait StandaloneExecute: Send + Sync {
    async fn call(&self, params: Params) -> anyhow::Result<ActionResponse>;
}

#[async_trait]
impl<F, Fut> StandaloneExecute for F
where
    F: Fn(Params) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ActionResponse>> + Send + 'static,
{
    async fn call(&self, params: Params) -> anyhow::Result<ActionResponse> {
        (self)(params).await
    }
}

/// Callback of an action bound to a toolkit's credentials.
#[async_trait]
pub trait ToolkitExecute: Send + Sync {
    async fn call(
        &self,
        params: Params,
        credentials: AuthCredentials,
        execute_request: ExecuteRequest,
    ) -> anyhow::Result<ActionResponse>;
}

#[async_trait]
impl<F, Fut> ToolkitExecute for F
where
    F: Fn(Params, AuthCredentials, ExecuteRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ActionResponse>> + Send + 'static,
{
    async fn call(
        &self,
        params: Params,
        credentials: AuthCredentials,
        execute_request: ExecuteRequest,
    ) -> anyhow::Result<ActionResponse> {
        (self)(params, credentials, execute_request).await
    }
}

/// How a custom action runs. A toolkit association selects the callback shape.
#[derive(Clone)]
pub enum ActionHandler {
    Standalone(Arc<dyn StandaloneExecute>),
    Toolkit {
        toolkit: String,
        callback: Arc<dyn ToolkitExecute>,
    },
}

impl ActionHandler {
    /// Creates a handler that needs no credentials.
    pub fn standalone<F, Fut>(callback: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ActionResponse>> + Send + 'static,
    {
        Self::Standalone(Arc::new(callback))
    }

    /// Creates a handler that receives the toolkit's credentials.
    pub fn toolkit<F, Fut>(toolkit: impl Into<String>, callback: F) -> Self
    where
        F: Fn(Params, AuthCredentials, ExecuteRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ActionResponse>> + Send + 'static,
    {
        Self::Toolkit {
            toolkit: toolkit.into(),
            callback: Arc::new(callback),
        }
    }

    /// The associated toolkit, if any.
    pub fn toolkit_name(&self) -> Option<&str> {
        match self {
            Self::Standalone(_) => None,
            Self::Toolkit { toolkit, .. } => Some(toolkit),
        }
    }
}

impl fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone(_) => f.write_str("Standalone"),
            Self::Toolkit { toolkit, .. } => {
                f.debug_struct("Toolkit").field("toolkit", toolkit).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn account(connection_params: Value) -> ConnectedAccount {
        serde_json::from_value(json!({
            "id": "ca_1",
            "appName": "github",
            "status": "ACTIVE",
            "connectionParams": connection_params
        }))
        .unwrap()
    }

    #[test]
    fn test_credentials_from_connection_params() {
        let credentials = AuthCredentials::from_account(&account(json!({
            "headers": {"Authorization": "Bearer t", "X-Retry": 3},
            "queryParams": {"api_key": "k"},
            "base_url": "https://api.github.com"
        })));

        assert_eq!(credentials.headers["Authorization"], "Bearer t");
        assert_eq!(credentials.headers["X-Retry"], "3");
        assert_eq!(credentials.query_params["api_key"], "k");
        assert_eq!(credentials.base_url.as_deref(), Some("https://api.github.com"));
    }

    #[test]
    fn test_credentials_default_when_params_missing() {
        let credentials = AuthCredentials::from_account(&account(Value::Null));
        assert_eq!(credentials, AuthCredentials::default());
    }

    #[tokio::test]
    async fn test_closures_are_handlers() {
        let handler = ActionHandler::standalone(|params| async move {
            Ok(ActionResponse::success(Value::Object(params)))
        });
        assert!(handler.toolkit_name().is_none());

        let ActionHandler::Standalone(callback) = handler else {
            panic!("expected standalone handler");
        };
        let mut params = Params::new();
        params.insert("owner".to_string(), json!("a"));
        let response = callback.call(params).await.unwrap();
        assert_eq!(response.data, json!({"owner": "a"}));

        let toolkit = ActionHandler::toolkit(
            "github",
            |_params, credentials: AuthCredentials, _request| async move {
                Ok(ActionResponse::success(json!({"base": credentials.base_url})))
            },
        );
        assert_eq!(toolkit.toolkit_name(), Some("github"));
    }
}
