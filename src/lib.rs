//! # Composio ToolSet
//!
//! A type-safe Rust core for discovering and executing Composio actions.
//!
//! ## Features
//!
//! - **ToolSet**: One entry point that merges platform and custom action schemas
//! - **Custom Actions**: Register local actions with typed input parameters
//! - **Processors**: Rewrite schemas, inputs and results around every call
//! - **File Handling**: Built-in upload and download of file parameters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use composio_toolset::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut toolset = ToolSet::builder().with_entity_id("default").build()?;
//!
//!     toolset.create_action(
//!         CreateActionOptions::new("starRepo")
//!             .description("Star a repository")
//!             .input_params(
//!                 ObjectSchema::new()
//!                     .field("owner", ParamSchema::string())
//!                     .field("repo", ParamSchema::string()),
//!             )
//!             .callback(|params| async move {
//!                 Ok(ActionResponse::success(serde_json::Value::Object(params)))
//!             }),
//!     )?;
//!
//!     let tools = toolset
//!         .get_tools_schema(&ToolsFilter::new().with_apps(["github"]))
//!         .await?;
//!     println!("{} tools", tools.len());
//!
//!     let response = toolset
//!         .execute_action(
//!             ExecuteActionParams::new("starRepo")
//!                 .with_params(json!({"owner": "a", "repo": "b"})),
//!         )
//!         .await?;
//!     println!("{:?}", response);
//!
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod client;
pub mod connection;
pub mod error;
pub mod processor;
pub mod toolset;

// Re-exports for convenient usage
pub use action::{
    ActionHandler, ActionRegistry, ActionResponse, AuthCredentials, CreateActionOptions,
    ExecuteActionParams, ExecuteRequest, ObjectSchema, ParamSchema, Params, RawActionData,
};
pub use client::{ApiError, ComposioApi, ComposioClientBuilder, HttpClient, ProxyRequest};
pub use connection::{AccountStatus, ConnectedAccount};
pub use error::ComposioError;
pub use processor::{Processor, ProcessorChain, ProcessorRole};
pub use toolset::{ActionTarget, ToolSet, ToolSetBuilder, ToolsFilter};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::action::{
        ActionResponse, CreateActionOptions, ExecuteActionParams, ObjectSchema, ParamSchema, Params,
        RawActionData,
    };
    pub use crate::error::ComposioError;
    pub use crate::processor::Processor;
    pub use crate::toolset::{ToolSet, ToolsFilter};
}
