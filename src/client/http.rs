use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::api::{
    ActionExecution, ActionListQuery, ApiError, AppInfo, ComposioApi, ConnectedAccountQuery,
    DownloadedFile, FileUpload, ProxyRequest,
};
use crate::action::{ActionResponse, RawActionData};
use crate::connection::ConnectedAccount;

/// Paginated list envelope used by the platform.
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Presigned upload target.
#[derive(Debug, Deserialize)]
struct UploadTarget {
    #[serde(alias = "newPresignedUrl")]
    url: String,
    key: String,
}

/// A platform client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    // Presigned object-store URLs must not receive the API key.
    raw: Client,
    base_url: String,
}

impl HttpClient {
    /// Creates a new platform client.
    pub fn new(
        api_key: String,
        base_url: String,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            reqwest::header::HeaderValue::from_str(&api_key)
                .map_err(|e| ApiError::Config(format!("invalid API key header: {}", e)))?,
        );

        let mut client_builder = reqwest::Client::builder().default_headers(headers);
        let mut raw_builder = reqwest::Client::builder();

        if let Some(timeout) = timeout {
            client_builder = client_builder.timeout(timeout);
            raw_builder = raw_builder.timeout(timeout);
        }

        Ok(Self {
            client: client_builder.build()?,
            raw: raw_builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Appends percent-encoded segments to a fixed path.
    fn resource_url(&self, path: &str, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.url(path))
            .map_err(|e| ApiError::Config(format!("invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("base URL {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a request and decodes a JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, ApiError> {
        let response = check_status(request.send().await?, resource).await?;
        let text = response.text().await?;

        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", e, text)))
    }
}

/// Maps non-success statuses to errors.
async fn check_status(response: Response, resource: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(resource.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ComposioApi for HttpClient {
    async fn list_actions(&self, query: &ActionListQuery) -> Result<Vec<RawActionData>, ApiError> {
        debug!(?query, "Listing actions");

        let request = self.client.get(self.url("/api/v2/actions")).query(query);
        let response: ListResponse<RawActionData> = self.send_json(request, "actions").await?;
        Ok(response.items)
    }

    async fn get_action(&self, name: &str) -> Result<RawActionData, ApiError> {
        let request = self
            .client
            .get(self.resource_url("/api/v2/actions", &[name])?);
        self.send_json(request, name).await
    }

    async fn execute_action(
        &self,
        name: &str,
        request: &ActionExecution,
    ) -> Result<ActionResponse, ApiError> {
        debug!(action = %name, app = %request.app_name, "Executing remote action");

        let builder = self
            .client
            .post(self.resource_url("/api/v2/actions", &[name, "execute"])?)
            .json(request);
        self.send_json(builder, name).await
    }

    async fn list_connected_accounts(
        &self,
        query: &ConnectedAccountQuery,
    ) -> Result<Vec<ConnectedAccount>, ApiError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(entity_id) = &query.entity_id {
            params.push(("user_uuid", entity_id.clone()));
        }
        if !query.app_names.is_empty() {
            params.push(("appNames", query.app_names.join(",")));
        }
        if query.active_only {
            params.push(("showActiveOnly", "true".to_string()));
        }

        let request = self
            .client
            .get(self.url("/api/v1/connectedAccounts"))
            .query(&params);
        let response: ListResponse<ConnectedAccount> =
            self.send_json(request, "connected accounts").await?;
        Ok(response.items)
    }

    async fn get_connected_account(&self, id: &str) -> Result<ConnectedAccount, ApiError> {
        let request = self
            .client
            .get(self.resource_url("/api/v1/connectedAccounts", &[id])?);
        self.send_json(request, id).await
    }

    async fn get_app(&self, key: &str) -> Result<AppInfo, ApiError> {
        let request = self.client.get(self.resource_url("/api/v1/apps", &[key])?);
        self.send_json(request, key).await
    }

    async fn upload_file(&self, upload: &FileUpload) -> Result<String, ApiError> {
        debug!(filename = %upload.filename, mimetype = %upload.mimetype, "Requesting upload URL");

        let request = self
            .client
            .post(self.url("/api/v2/actions/files/upload/request"))
            .json(&serde_json::json!({
                "action": upload.action,
                "app": upload.app,
                "filename": upload.filename,
                "mimetype": upload.mimetype,
            }));
        let target: UploadTarget = self.send_json(request, &upload.filename).await?;

        let response = self
            .raw
            .put(&target.url)
            .header(reqwest::header::CONTENT_TYPE, upload.mimetype.as_str())
            .body(upload.content.clone())
            .send()
            .await?;
        check_status(response, &upload.filename).await?;

        Ok(target.key)
    }

    async fn download_file(&self, url: &str) -> Result<DownloadedFile, ApiError> {
        let response = check_status(self.raw.get(url).send().await?, url).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string());
        let content = response.bytes().await?.to_vec();

        Ok(DownloadedFile {
            content,
            content_type,
        })
    }

    async fn execute_proxy(
        &self,
        connected_account_id: &str,
        request: &ProxyRequest,
    ) -> Result<Value, ApiError> {
        debug!(endpoint = %request.endpoint, method = %request.method, "Proxying request");

        let mut body = serde_json::to_value(request)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        if let Value::Object(map) = &mut body {
            map.insert(
                "connectedAccountId".to_string(),
                Value::String(connected_account_id.to_string()),
            );
        }

        let builder = self
            .client
            .post(self.url("/api/v2/actions/proxy"))
            .json(&body);
        self.send_json(builder, &request.endpoint).await
    }
}
