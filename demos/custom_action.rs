//! # Custom Action Example
//!
//! This example registers two custom actions, one standalone and one that
//! runs with a GitHub connected account, and executes them through the toolset.
//!
//! ## Usage
//!
//! ```bash
//! export COMPOSIO_API_KEY="your-api-key"
//! cargo run --example custom_action
//! ```

use composio_toolset::client::ProxyRequest;
use composio_toolset::prelude::*;
use serde::Deserialize;
use serde_json::json;

/// Input of the `star_repo` action.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[allow(dead_code)]
struct StarRepoInput {
    /// Repository owner
    owner: String,
    /// Repository name
    repo: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("composio_toolset=debug")
        .init();

    let mut toolset = ToolSet::builder().build()?;

    // A standalone action
    let schema = toolset.create_action(
        CreateActionOptions::new("word_count")
            .description("Count the words in a text")
            .input_params(ObjectSchema::new().field("text", ParamSchema::string().describe("Text to count")))
            .callback(|params| async move {
                let text = params.get("text").and_then(|v| v.as_str()).unwrap_or_default();
                Ok(ActionResponse::success(json!({"words": text.split_whitespace().count()})))
            }),
    );
    println!("Registered: {:?}", schema.map(|s| s.name));

    // A toolkit action, proxied through the connected GitHub account
    toolset.create_action(
        CreateActionOptions::new("star_repo")
            .description("Star a GitHub repository")
            .input_params(ObjectSchema::from_type::<StarRepoInput>()?)
            .toolkit_callback("github", |params, _credentials, request| async move {
                let owner = params["owner"].as_str().unwrap_or_default();
                let repo = params["repo"].as_str().unwrap_or_default();
                let body = request
                    .execute(ProxyRequest::new("put", format!("/user/starred/{}/{}", owner, repo)))
                    .await?;
                Ok(ActionResponse::success(body))
            }),
    )?;

    let response = toolset
        .execute_action(
            ExecuteActionParams::new("WORD_COUNT").with_params(json!({"text": "hello composio world"})),
        )
        .await?;
    println!("word_count: {}", response.data);

    let response = toolset
        .execute_action(
            ExecuteActionParams::new("star_repo").with_params(json!({"owner": "composiohq", "repo": "composio"})),
        )
        .await?;
    println!("star_repo: {:?}", response);

    Ok(())
}
