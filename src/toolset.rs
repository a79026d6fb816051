//! The toolset: one entry point for discovering and executing actions.
//!
//! Schemas come from the platform and the local registry, and every schema,
//! input and result passes through the processor chain on the way.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::action::{
    ActionRegistry, ActionResponse, CreateActionOptions, DEFAULT_ENTITY_ID, ExecuteActionParams,
    ExecuteMetadata, Params, RawActionData,
};
use crate::client::{ActionExecution, ActionListQuery, ApiError, ComposioApi, ComposioClientBuilder};
use crate::connection::{connected_apps, resolve_connected_account};
use crate::error::ComposioError;
use crate::processor::file::app_from_action;
use crate::processor::{ProcessContext, Processor, ProcessorChain, ProcessorRole};

/// Which actions `get_tools_schema` returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolsFilter {
    /// Toolkit slugs
    pub apps: Vec<String>,
    /// Explicit action names
    pub actions: Vec<String>,
    pub tags: Vec<String>,
    /// Free-text search phrase
    pub use_case: Option<String>,
    pub use_case_limit: Option<u32>,
    /// Restrict to toolkits the entity has an active account for
    pub filter_by_available_apps: bool,
}

impl ToolsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apps<I, S>(mut self, apps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apps = apps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_use_case(mut self, use_case: impl Into<String>, limit: Option<u32>) -> Self {
        self.use_case = Some(use_case.into());
        self.use_case_limit = limit;
        self
    }

    pub fn with_available_apps(mut self) -> Self {
        self.filter_by_available_apps = true;
        self
    }

    /// Platform query for the filter, with `apps` standing in for the
    /// filter's own list.
    fn to_query(&self, apps: &[String]) -> ActionListQuery {
        let joined = |values: &[String]| (!values.is_empty()).then(|| values.join(","));
        let important_only = !apps.is_empty()
            && self.tags.is_empty()
            && self.actions.is_empty()
            && self.use_case.is_none();

        ActionListQuery {
            apps: joined(apps),
            tags: joined(&self.tags),
            actions: joined(&self.actions),
            use_case: self.use_case.clone(),
            use_case_limit: self.use_case_limit,
            filter_important_actions: important_only.then_some(true),
            limit: None,
        }
    }

    fn matches_custom(&self, action: &RawActionData) -> bool {
        let named = self.actions.is_empty()
            || self
                .actions
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&action.name));
        let tagged = self.tags.is_empty() || self.tags.iter().any(|tag| action.has_tag(tag));
        named && tagged
    }
}

/// Where an execution is dispatched, decided once per call.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionTarget {
    /// A registry action, with its toolkit if it has one
    Custom { toolkit: Option<String> },
    /// A platform action
    Remote(RawActionData),
}

impl ActionTarget {
    /// The toolkit the action belongs to, when known.
    pub fn app(&self) -> Option<&str> {
        match self {
            Self::Custom { toolkit } => toolkit.as_deref(),
            Self::Remote(schema) => schema.app(),
        }
    }
}

/// Combines the platform client, custom actions and the processor chain.
pub struct ToolSet {
    api: Arc<dyn ComposioApi>,
    registry: ActionRegistry,
    processors: ProcessorChain,
    entity_id: String,
}

impl ToolSet {
    /// Creates a toolset over `api` with default settings.
    pub fn new(api: Arc<dyn ComposioApi>) -> Self {
        Self {
            api,
            registry: ActionRegistry::new(),
            processors: ProcessorChain::with_file_processors(default_output_dir()),
            entity_id: DEFAULT_ENTITY_ID.to_string(),
        }
    }

    pub fn builder() -> ToolSetBuilder {
        ToolSetBuilder::new()
    }

    pub fn api(&self) -> &Arc<dyn ComposioApi> {
        &self.api
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Entity used for listing available apps and for executions that name
    /// no entity.
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Lists remote and custom action schemas matching the filter, after the
    /// schema chain.
    ///
    /// Remote actions come first in backend order, then custom actions in
    /// registration order. A remote action sharing its name with a custom
    /// action is left out.
    pub async fn get_tools_schema(&self, filter: &ToolsFilter) -> Result<Vec<RawActionData>, ComposioError> {
        if filter.filter_by_available_apps && !filter.apps.is_empty() {
            return Err(ComposioError::InvalidFilterCombination(
                "apps cannot be combined with filter_by_available_apps".to_string(),
            ));
        }

        let apps = if filter.filter_by_available_apps {
            connected_apps(self.api.as_ref(), &self.entity_id).await?
        } else {
            filter.apps.clone()
        };

        let remote = if filter.filter_by_available_apps && apps.is_empty() {
            debug!(entity_id = %self.entity_id, "No connected apps, skipping remote actions");
            Vec::new()
        } else {
            self.api.list_actions(&filter.to_query(&apps)).await?
        };

        let remote: Vec<RawActionData> = remote
            .into_iter()
            .filter(|action| {
                let shadowed = self.registry.contains(&action.name);
                if shadowed {
                    warn!(action = %action.name, "Custom action shadows remote action");
                }
                !shadowed
            })
            .collect();
        let custom: Vec<RawActionData> = self
            .registry
            .get_all_actions()
            .into_iter()
            .filter(|action| filter.matches_custom(action))
            .collect();

        debug!(remote = remote.len(), custom = custom.len(), "Collected action schemas");

        remote
            .into_iter()
            .chain(custom)
            .map(|schema| self.processors.apply_schema(schema))
            .collect()
    }

    /// Decides where an action runs.
    pub async fn resolve_target(&self, action: &str) -> Result<ActionTarget, ComposioError> {
        if let Some(custom) = self.registry.get(action) {
            return Ok(ActionTarget::Custom {
                toolkit: custom.toolkit().map(str::to_string),
            });
        }

        match self.api.get_action(action).await {
            Ok(schema) => Ok(ActionTarget::Remote(schema)),
            Err(ApiError::NotFound(_)) => Err(ComposioError::ActionNotFound(action.to_string())),
            Err(source) => Err(ComposioError::ActionFailed {
                action: action.to_string(),
                source,
            }),
        }
    }

    /// Executes an action with its inputs and result run through the
    /// processor chain.
    pub async fn execute_action(&self, params: ExecuteActionParams) -> Result<ActionResponse, ComposioError> {
        params.validate()?;
        let account_id = params.account_id().map(str::to_string);
        let entity_id = params.entity_id_or(&self.entity_id).to_string();
        let ExecuteActionParams {
            action,
            params: input,
            text,
            ..
        } = params;

        let target = self.resolve_target(&action).await?;
        info!(action = %action, entity_id = %entity_id, app = ?target.app(), "Executing action");

        let ctx = ProcessContext {
            action: &action,
            app: target.app(),
            api: self.api.as_ref(),
        };
        let input = self.processors.apply_pre(ctx, input).await?;

        let response = match &target {
            ActionTarget::Custom { .. } => {
                let metadata = ExecuteMetadata {
                    entity_id,
                    connection_id: account_id,
                };
                self.registry
                    .execute(&action, input, &metadata, &self.api)
                    .await?
            }
            ActionTarget::Remote(schema) => {
                self.execute_remote(schema, input, &entity_id, account_id.as_deref(), text)
                    .await?
            }
        };

        self.processors.apply_post(ctx, response).await
    }

    async fn execute_remote(
        &self,
        schema: &RawActionData,
        input: Params,
        entity_id: &str,
        account_id: Option<&str>,
        text: Option<String>,
    ) -> Result<ActionResponse, ComposioError> {
        let failed = |source: ApiError| ComposioError::ActionFailed {
            action: schema.name.clone(),
            source,
        };

        let app = schema
            .app()
            .map(str::to_string)
            .unwrap_or_else(|| app_from_action(&schema.name));
        let info = self.api.get_app(&app).await.map_err(failed)?;

        let connected_account_id = if info.no_auth {
            debug!(action = %schema.name, app = %app, "App needs no auth, skipping account resolution");
            None
        } else {
            let account =
                resolve_connected_account(self.api.as_ref(), entity_id, &app, account_id).await?;
            Some(account.id)
        };

        let execution = ActionExecution {
            connected_account_id,
            entity_id: entity_id.to_string(),
            app_name: app,
            input,
            text,
        };
        self.api
            .execute_action(&schema.name, &execution)
            .await
            .map_err(failed)
    }

    /// Registers a custom action.
    pub fn create_action(&mut self, options: CreateActionOptions) -> Result<RawActionData, ComposioError> {
        self.registry.register(options)
    }

    pub fn add_schema_processor(&mut self, processor: Processor) -> Result<(), ComposioError> {
        self.processors.set(ProcessorRole::Schema, processor)
    }

    pub fn add_pre_processor(&mut self, processor: Processor) -> Result<(), ComposioError> {
        self.processors.set(ProcessorRole::Pre, processor)
    }

    pub fn add_post_processor(&mut self, processor: Processor) -> Result<(), ComposioError> {
        self.processors.set(ProcessorRole::Post, processor)
    }

    pub fn remove_schema_processor(&mut self) {
        self.processors.clear(ProcessorRole::Schema);
    }

    pub fn remove_pre_processor(&mut self) {
        self.processors.clear(ProcessorRole::Pre);
    }

    pub fn remove_post_processor(&mut self) {
        self.processors.clear(ProcessorRole::Post);
    }

    pub fn processors(&self) -> &ProcessorChain {
        &self.processors
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet")
            .field("entity_id", &self.entity_id)
            .field("registry", &self.registry)
            .field("processors", &self.processors)
            .finish()
    }
}

/// Where downloaded files land by default.
pub fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("composio").join("output")
}

/// A builder for creating toolsets.
#[derive(Default)]
pub struct ToolSetBuilder {
    client: ComposioClientBuilder,
    api: Option<Arc<dyn ComposioApi>>,
    entity_id: Option<String>,
    output_dir: Option<PathBuf>,
}

impl ToolSetBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `COMPOSIO_API_KEY`.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.client = self.client.with_api_key(api_key);
        self
    }

    /// Sets the base URL. Falls back to `COMPOSIO_BASE_URL`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(base_url);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.with_timeout(timeout);
        self
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    /// Uses `api` instead of building an HTTP client.
    pub fn with_api(mut self, api: Arc<dyn ComposioApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn build(self) -> Result<ToolSet, ComposioError> {
        let api = match self.api {
            Some(api) => api,
            None => self.client.build_http().map_err(|e| match e {
                ApiError::Config(message) => ComposioError::Config(message),
                other => other.into(),
            })?,
        };
        let output_dir = self.output_dir.unwrap_or_else(default_output_dir);

        Ok(ToolSet {
            api,
            registry: ActionRegistry::new(),
            processors: ProcessorChain::with_file_processors(output_dir),
            entity_id: self
                .entity_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ENTITY_ID.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ObjectSchema, ParamSchema};
    use crate::client::{AppInfo, FileUpload, MockComposioApi};
    use crate::connection::ConnectedAccount;
    use serde_json::{Value, json};

    fn toolset(api: MockComposioApi) -> ToolSet {
        ToolSet::builder()
            .with_api(Arc::new(api))
            .with_output_dir(std::env::temp_dir().join("composio-toolset-tests"))
            .build()
            .unwrap()
    }

    fn remote(name: &str, app: &str) -> RawActionData {
        let mut action = RawActionData::new(name);
        action.app_name = Some(app.to_string());
        action
    }

    fn account(id: &str, app: &str, created_at: &str, labels: &[&str]) -> ConnectedAccount {
        serde_json::from_value(json!({
            "id": id,
            "appName": app,
            "status": "ACTIVE",
            "createdAt": created_at,
            "labels": labels,
        }))
        .unwrap()
    }

    fn app(key: &str, no_auth: bool) -> AppInfo {
        AppInfo {
            key: key.to_string(),
            name: key.to_string(),
            no_auth,
            auth_schemes: Vec::new(),
        }
    }

    fn echo(name: &str) -> CreateActionOptions {
        CreateActionOptions::new(name)
            .callback(|params| async move { Ok(ActionResponse::success(Value::Object(params))) })
    }

    fn names(actions: &[RawActionData]) -> Vec<&str> {
        actions.iter().map(|a| a.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_apps_with_available_apps_is_rejected() {
        let toolset = toolset(MockComposioApi::new());
        let filter = ToolsFilter::new().with_apps(["github"]).with_available_apps();

        let result = toolset.get_tools_schema(&filter).await;
        assert!(matches!(result, Err(ComposioError::InvalidFilterCombination(_))));
    }

    #[tokio::test]
    async fn test_available_apps_replace_apps_filter() {
        let mut api = MockComposioApi::new();
        api.expect_list_connected_accounts().returning(|_| {
            Ok(vec![account("ca_1", "github", "2024-01-01T00:00:00Z", &[])])
        });
        api.expect_list_actions()
            .withf(|query: &ActionListQuery| {
                query.apps.as_deref() == Some("github")
                    && query.filter_important_actions == Some(true)
            })
            .times(1)
            .returning(|_| Ok(vec![remote("GITHUB_STAR_A_REPOSITORY", "github")]));

        let actions = toolset(api)
            .get_tools_schema(&ToolsFilter::new().with_available_apps())
            .await
            .unwrap();
        assert_eq!(names(&actions), vec!["GITHUB_STAR_A_REPOSITORY"]);
    }

    #[tokio::test]
    async fn test_no_available_apps_skips_remote_listing() {
        let mut api = MockComposioApi::new();
        api.expect_list_connected_accounts().returning(|_| Ok(Vec::new()));
        api.expect_list_actions().never();

        let mut toolset = toolset(api);
        toolset.create_action(echo("echo")).unwrap();

        let actions = toolset
            .get_tools_schema(&ToolsFilter::new().with_available_apps())
            .await
            .unwrap();
        assert_eq!(names(&actions), vec!["echo"]);
    }

    #[tokio::test]
    async fn test_custom_actions_follow_remote_and_shadow_them() {
        let mut api = MockComposioApi::new();
        api.expect_list_actions()
            .withf(|query: &ActionListQuery| *query == ActionListQuery::default())
            .returning(|_| {
                Ok(vec![
                    remote("GITHUB_STAR_A_REPOSITORY", "github"),
                    remote("GITHUB_CREATE_AN_ISSUE", "github"),
                ])
            });

        let mut toolset = toolset(api);
        toolset.create_action(echo("starRepo")).unwrap();
        toolset.create_action(echo("github_star_a_repository")).unwrap();

        let actions = toolset.get_tools_schema(&ToolsFilter::new()).await.unwrap();
        assert_eq!(
            names(&actions),
            vec!["GITHUB_CREATE_AN_ISSUE", "starRepo", "github_star_a_repository"]
        );
    }

    #[tokio::test]
    async fn test_custom_actions_match_by_name_and_custom_tag() {
        let mut api = MockComposioApi::new();
        api.expect_list_actions().returning(|_| Ok(Vec::new()));

        let mut toolset = toolset(api);
        toolset.create_action(echo("starRepo")).unwrap();
        toolset.create_action(echo("forkRepo")).unwrap();

        let by_name = toolset
            .get_tools_schema(&ToolsFilter::new().with_actions(["STARREPO"]))
            .await
            .unwrap();
        assert_eq!(names(&by_name), vec!["starRepo"]);

        let important = toolset
            .get_tools_schema(&ToolsFilter::new().with_tags(["important"]))
            .await
            .unwrap();
        assert!(important.is_empty());

        let custom = toolset
            .get_tools_schema(&ToolsFilter::new().with_tags(["important", "custom"]))
            .await
            .unwrap();
        assert_eq!(names(&custom), vec!["starRepo", "forkRepo"]);
    }

    #[tokio::test]
    async fn test_use_case_query_does_not_request_important_only() {
        let mut api = MockComposioApi::new();
        api.expect_list_actions()
            .withf(|query: &ActionListQuery| {
                query.apps.as_deref() == Some("github,slack")
                    && query.use_case.as_deref() == Some("star a repo")
                    && query.use_case_limit == Some(2)
                    && query.filter_important_actions.is_none()
            })
            .returning(|_| Ok(Vec::new()));

        let filter = ToolsFilter::new()
            .with_apps(["github", "slack"])
            .with_use_case("star a repo", Some(2));
        assert!(toolset(api).get_tools_schema(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_schema_processor_sees_builtin_output() {
        let mut api = MockComposioApi::new();
        api.expect_list_actions().returning(|_| Ok(Vec::new()));

        let mut toolset = toolset(api);
        toolset
            .create_action(
                echo("attach").input_params(
                    ObjectSchema::new().field("doc", ParamSchema::string().file_uploadable()),
                ),
            )
            .unwrap();
        toolset
            .add_schema_processor(Processor::schema_fn(|_, mut schema| {
                let renamed = schema.parameters.properties.contains_key("doc_file_uri_path");
                schema
                    .parameters
                    .extra
                    .insert("saw_renamed".to_string(), json!(renamed));
                Ok(schema)
            }))
            .unwrap();

        let actions = toolset.get_tools_schema(&ToolsFilter::new()).await.unwrap();
        assert_eq!(actions[0].parameters.extra["saw_renamed"], true);
        assert_eq!(actions[0].parameters.required, vec!["doc_file_uri_path"]);
    }

    #[tokio::test]
    async fn test_unknown_action_is_action_not_found() {
        let mut api = MockComposioApi::new();
        api.expect_get_action()
            .withf(|name: &str| name == "DOES_NOT_EXIST")
            .returning(|name| Err(ApiError::NotFound(name.to_string())));

        let result = toolset(api)
            .execute_action(ExecuteActionParams::new("DOES_NOT_EXIST").with_entity_id("default"))
            .await;
        assert!(matches!(result, Err(ComposioError::ActionNotFound(name)) if name == "DOES_NOT_EXIST"));
    }

    #[tokio::test]
    async fn test_missing_routing_information_is_invalid_params() {
        let result = toolset(MockComposioApi::new())
            .execute_action(ExecuteActionParams::new("starRepo").with_entity_id("  "))
            .await;
        assert!(matches!(result, Err(ComposioError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_custom_action_end_to_end() {
        let mut toolset = toolset(MockComposioApi::new());
        toolset
            .create_action(
                CreateActionOptions::new("starRepo")
                    .description("Star a repository")
                    .input_params(
                        ObjectSchema::new()
                            .field("owner", ParamSchema::string())
                            .field("repo", ParamSchema::string()),
                    )
                    .callback(|params| async move {
                        Ok(ActionResponse::success(json!({
                            "owner": params["owner"],
                            "repo": params["repo"],
                        })))
                    }),
            )
            .unwrap();

        let response = toolset
            .execute_action(
                ExecuteActionParams::new("starRepo")
                    .with_params(json!({"owner": "a", "repo": "b"}))
                    .with_entity_id("default"),
            )
            .await
            .unwrap();

        assert_eq!(
            response,
            ActionResponse {
                data: json!({"owner": "a", "repo": "b"}),
                error: None,
                successful: true,
            }
        );
    }

    #[tokio::test]
    async fn test_custom_action_routes_before_remote_lookup() {
        let mut api = MockComposioApi::new();
        api.expect_get_action().never();

        let mut toolset = toolset(api);
        toolset.create_action(echo("GITHUB_STAR_A_REPOSITORY")).unwrap();

        let response = toolset
            .execute_action(
                ExecuteActionParams::new("github_star_a_repository")
                    .with_params(json!({"owner": "a"})),
            )
            .await
            .unwrap();
        assert_eq!(response.data, json!({"owner": "a"}));
    }

    #[tokio::test]
    async fn test_toolkit_custom_action_resolves_account_lazily() {
        let mut api = MockComposioApi::new();
        api.expect_list_connected_accounts()
            .withf(|query| query.app_names == vec!["github".to_string()])
            .times(1)
            .returning(|_| Ok(vec![account("ca_gh", "github", "2024-01-01T00:00:00Z", &[])]));

        let mut toolset = toolset(api);
        toolset
            .create_action(CreateActionOptions::new("whoami").toolkit_callback(
                "github",
                |_params, _credentials, request| async move {
                    Ok(ActionResponse::success(json!({
                        "account": request.connected_account_id()
                    })))
                },
            ))
            .unwrap();

        let response = toolset
            .execute_action(ExecuteActionParams::new("whoami"))
            .await
            .unwrap();
        assert_eq!(response.data, json!({"account": "ca_gh"}));
    }

    #[tokio::test]
    async fn test_configured_entity_is_used_for_execution() {
        let mut api = MockComposioApi::new();
        api.expect_get_action()
            .returning(|name| Ok(remote(name, "github")));
        api.expect_get_app().returning(|key| Ok(app(key, false)));
        api.expect_list_connected_accounts()
            .withf(|query| query.entity_id.as_deref() == Some("alice"))
            .times(1)
            .returning(|_| Ok(vec![account("ca_alice", "github", "2024-01-01T00:00:00Z", &[])]));
        api.expect_execute_action()
            .withf(|_, execution: &ActionExecution| {
                execution.entity_id == "alice"
                    && execution.connected_account_id.as_deref() == Some("ca_alice")
            })
            .times(1)
            .returning(|_, _| Ok(ActionResponse::success(json!({}))));

        let toolset = ToolSet::builder()
            .with_api(Arc::new(api))
            .with_entity_id("alice")
            .build()
            .unwrap();
        toolset
            .execute_action(ExecuteActionParams::new("GITHUB_STAR_A_REPOSITORY"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_request_entity_overrides_configured_entity() {
        let mut api = MockComposioApi::new();
        api.expect_get_action()
            .returning(|name| Ok(remote(name, "github")));
        api.expect_get_app().returning(|key| Ok(app(key, true)));
        api.expect_execute_action()
            .withf(|_, execution: &ActionExecution| execution.entity_id == "bob")
            .times(1)
            .returning(|_, _| Ok(ActionResponse::success(json!({}))));

        let toolset = ToolSet::builder()
            .with_api(Arc::new(api))
            .with_entity_id("alice")
            .build()
            .unwrap();
        toolset
            .execute_action(ExecuteActionParams::new("GITHUB_STAR_A_REPOSITORY").with_entity_id("bob"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_remote_no_auth_app_skips_credentials() {
        let mut api = MockComposioApi::new();
        api.expect_get_action()
            .returning(|name| Ok(remote(name, "hackernews")));
        api.expect_get_app()
            .withf(|key: &str| key == "hackernews")
            .returning(|key| Ok(app(key, true)));
        api.expect_list_connected_accounts().never();
        api.expect_execute_action()
            .withf(|name: &str, execution: &ActionExecution| {
                name == "HACKERNEWS_GET_FRONTPAGE"
                    && execution.connected_account_id.is_none()
                    && execution.app_name == "hackernews"
                    && execution.entity_id == "default"
            })
            .returning(|_, _| Ok(ActionResponse::success(json!({"stories": []}))));

        let response = toolset(api)
            .execute_action(ExecuteActionParams::new("HACKERNEWS_GET_FRONTPAGE"))
            .await
            .unwrap();
        assert!(response.successful);
    }

    #[tokio::test]
    async fn test_remote_execution_prefers_primary_account() {
        let mut api = MockComposioApi::new();
        api.expect_get_action()
            .returning(|name| Ok(remote(name, "github")));
        api.expect_get_app().returning(|key| Ok(app(key, false)));
        api.expect_list_connected_accounts().returning(|_| {
            Ok(vec![
                account("ca_recent", "github", "2024-06-01T00:00:00Z", &[]),
                account("ca_primary", "github", "2023-01-01T00:00:00Z", &["primary"]),
            ])
        });
        api.expect_execute_action()
            .withf(|_, execution: &ActionExecution| {
                execution.connected_account_id.as_deref() == Some("ca_primary")
                    && execution.input["owner"] == "a"
                    && execution.text.as_deref() == Some("star it")
            })
            .times(1)
            .returning(|_, _| Ok(ActionResponse::success(json!({}))));

        toolset(api)
            .execute_action(
                ExecuteActionParams::new("GITHUB_STAR_A_REPOSITORY")
                    .with_params(json!({"owner": "a"}))
                    .with_text("star it"),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_remote_without_account_is_no_connected_account() {
        let mut api = MockComposioApi::new();
        api.expect_get_action()
            .returning(|name| Ok(remote(name, "github")));
        api.expect_get_app().returning(|key| Ok(app(key, false)));
        api.expect_list_connected_accounts().returning(|_| Ok(Vec::new()));
        api.expect_execute_action().never();

        let result = toolset(api)
            .execute_action(ExecuteActionParams::new("GITHUB_STAR_A_REPOSITORY"))
            .await;
        assert!(matches!(
            result,
            Err(ComposioError::NoConnectedAccount { entity_id, app }) if entity_id == "default" && app == "github"
        ));
    }

    #[tokio::test]
    async fn test_backend_failure_carries_action_name() {
        let mut api = MockComposioApi::new();
        api.expect_get_action()
            .returning(|name| Ok(remote(name, "github")));
        api.expect_get_app().returning(|key| Ok(app(key, true)));
        api.expect_execute_action().returning(|_, _| {
            Err(ApiError::Status {
                status: 500,
                body: "boom".to_string(),
            })
        });

        let result = toolset(api)
            .execute_action(ExecuteActionParams::new("GITHUB_STAR_A_REPOSITORY"))
            .await;
        assert!(matches!(
            result,
            Err(ComposioError::ActionFailed { action, source: ApiError::Status { status: 500, .. } })
                if action == "GITHUB_STAR_A_REPOSITORY"
        ));
    }

    #[tokio::test]
    async fn test_wrong_role_keeps_previous_processor() {
        let mut toolset = toolset(MockComposioApi::new());
        toolset.create_action(echo("echo")).unwrap();
        toolset
            .add_pre_processor(Processor::pre_fn(|_, mut params| {
                params.insert("tagged".to_string(), json!(true));
                Ok(params)
            }))
            .unwrap();

        let result = toolset.add_pre_processor(Processor::post_fn(|_, response| Ok(response)));
        assert!(matches!(
            result,
            Err(ComposioError::InvalidProcessorType {
                expected: ProcessorRole::Pre,
                actual: ProcessorRole::Post,
            })
        ));

        let response = toolset
            .execute_action(ExecuteActionParams::new("echo"))
            .await
            .unwrap();
        assert_eq!(response.data, json!({"tagged": true}));

        toolset.remove_pre_processor();
        toolset.remove_pre_processor();
        assert!(!toolset.processors().has_user(ProcessorRole::Pre));

        let response = toolset
            .execute_action(ExecuteActionParams::new("echo"))
            .await
            .unwrap();
        assert_eq!(response.data, json!({}));
    }

    #[tokio::test]
    async fn test_user_pre_processor_runs_after_file_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# notes").unwrap();

        let mut api = MockComposioApi::new();
        api.expect_upload_file()
            .withf(|upload: &FileUpload| upload.action == "echo" && upload.mimetype == "text/markdown")
            .returning(|_| Ok("uploads/notes.md".to_string()));

        let mut toolset = toolset(api);
        toolset.create_action(echo("echo")).unwrap();
        toolset
            .add_pre_processor(Processor::pre_fn(|_, mut params| {
                let uploaded = params.contains_key("doc") && !params.contains_key("doc_file_uri_path");
                params.insert("uploaded_first".to_string(), json!(uploaded));
                Ok(params)
            }))
            .unwrap();

        let response = toolset
            .execute_action(
                ExecuteActionParams::new("echo")
                    .with_params(json!({"doc_file_uri_path": path.display().to_string()})),
            )
            .await
            .unwrap();
        assert_eq!(response.data["uploaded_first"], true);
        assert_eq!(response.data["doc"]["s3key"], "uploads/notes.md");
    }

    #[tokio::test]
    async fn test_failing_post_processor_aborts_execution() {
        let mut toolset = toolset(MockComposioApi::new());
        toolset.create_action(echo("echo")).unwrap();
        toolset
            .add_post_processor(Processor::post_fn(|action, _| {
                Err(ComposioError::InvalidParams(format!("{} rejected", action)))
            }))
            .unwrap();

        let result = toolset.execute_action(ExecuteActionParams::new("echo")).await;
        assert!(matches!(result, Err(ComposioError::InvalidParams(message)) if message == "echo rejected"));
    }

    #[test]
    fn test_builder_defaults() {
        let toolset = tokio_test::assert_ok!(
            ToolSet::builder()
                .with_api(Arc::new(MockComposioApi::new()))
                .with_entity_id(" ")
                .build()
        );
        assert_eq!(toolset.entity_id(), DEFAULT_ENTITY_ID);
        assert!(toolset.registry().is_empty());
    }

    #[test]
    fn test_builder_requires_api_key() {
        let result = ToolSet::builder().with_api_key("").build();
        assert!(matches!(result, Err(ComposioError::Config(_))));
    }
}
