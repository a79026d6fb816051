pub mod api;
pub mod http;

pub use api::{
    ActionExecution, ActionListQuery, ApiError, AppInfo, ComposioApi, ComposioClientBuilder,
    ConnectedAccountQuery, DownloadedFile, FileUpload, ParameterLocation, ProxyParameter,
    ProxyRequest, DEFAULT_BASE_URL,
};
pub use http::HttpClient;

#[cfg(test)]
pub use api::MockComposioApi;
