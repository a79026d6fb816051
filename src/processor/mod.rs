//! Hooks applied around every action invocation.
//!
//! Each role (schema, pre, post) runs its built-in processors in a fixed order
//! and then at most one user processor. Processor errors are not caught: the
//! first failure aborts the rest of the chain.

pub mod file;

pub use file::{
    FileDownloadProcessor, FileSchemaProcessor, FileUploadProcessor, FILE_SUFFIX,
};

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::action::{ActionResponse, Params, RawActionData};
use crate::client::ComposioApi;
use crate::error::ComposioError;

/// What a processor is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorRole {
    Schema,
    Pre,
    Post,
}

impl fmt::Display for ProcessorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema => write!(f, "schema"),
            Self::Pre => write!(f, "pre"),
            Self::Post => write!(f, "post"),
        }
    }
}

/// What processors know about the invocation they run in.
#[derive(Clone, Copy)]
pub struct ProcessContext<'a> {
    pub action: &'a str,
    /// Owning toolkit, when known
    pub app: Option<&'a str>,
    pub api: &'a dyn ComposioApi,
}

impl fmt::Debug for ProcessContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessContext")
            .field("action", &self.action)
            .field("app", &self.app)
            .finish()
    }
}

/// Rewrites an advertised action schema.
pub trait SchemaProcessor: Send + Sync {
    fn process(&self, action: &str, schema: RawActionData) -> Result<RawActionData, ComposioError>;
}

/// Rewrites input parameters before dispatch.
#[async_trait]
pub trait PreProcessor: Send + Sync {
    async fn process(&self, ctx: ProcessContext<'_>, params: Params) -> Result<Params, ComposioError>;
}

/// Rewrites a result after execution.
#[async_trait]
pub trait PostProcessor: Send + Sync {
    async fn process(
        &self,
        ctx: ProcessContext<'_>,
        response: ActionResponse,
    ) -> Result<ActionResponse, ComposioError>;
}

struct FnSchemaProcessor<F>(F);

impl<F> SchemaProcessor for FnSchemaProcessor<F>
where
    F: Fn(&str, RawActionData) -> Result<RawActionData, ComposioError> + Send + Sync,
{
    fn process(&self, action: &str, schema: RawActionData) -> Result<RawActionData, ComposioError> {
        (self.0)(action, schema)
    }
}

struct FnPreProcessor<F>(F);

#[async_trait]
impl<F> PreProcessor for FnPreProcessor<F>
where
    F: Fn(&str, Params) -> Result<Params, ComposioError> + Send + Sync,
{
    async fn process(&self, ctx: ProcessContext<'_>, params: Params) -> Result<Params, ComposioError> {
        (self.0)(ctx.action, params)
    }
}

struct FnPostProcessor<F>(F);

#[async_trait]
impl<F> PostProcessor for FnPostProcessor<F>
where
    F: Fn(&str, ActionResponse) -> Result<ActionResponse, ComposioError> + Send + Sync,
{
    async fn process(
        &self,
        ctx: ProcessContext<'_>,
        response: ActionResponse,
    ) -> Result<ActionResponse, ComposioError> {
        (self.0)(ctx.action, response)
    }
}

/// A processor tagged with its role.
#[derive(Clone)]
pub enum Processor {
    Schema(Arc<dyn SchemaProcessor>),
    Pre(Arc<dyn PreProcessor>),
    Post(Arc<dyn PostProcessor>),
}

impl Processor {
    pub fn schema(processor: impl SchemaProcessor + 'static) -> Self {
        Self::Schema(Arc::new(processor))
    }

    pub fn pre(processor: impl PreProcessor + 'static) -> Self {
        Self::Pre(Arc::new(processor))
    }

    pub fn post(processor: impl PostProcessor + 'static) -> Self {
        Self::Post(Arc::new(processor))
    }

    /// Wraps a closure `(action, schema) -> schema`.
    pub fn schema_fn<F>(f: F) -> Self
    where
        F: Fn(&str, RawActionData) -> Result<RawActionData, ComposioError> + Send + Sync + 'static,
    {
        Self::schema(FnSchemaProcessor(f))
    }

    /// Wraps a closure `(action, params) -> params`.
    pub fn pre_fn<F>(f: F) -> Self
    where
        F: Fn(&str, Params) -> Result<Params, ComposioError> + Send + Sync + 'static,
    {
        Self::pre(FnPreProcessor(f))
    }

    /// Wraps a closure `(action, response) -> response`.
    pub fn post_fn<F>(f: F) -> Self
    where
        F: Fn(&str, ActionResponse) -> Result<ActionResponse, ComposioError> + Send + Sync + 'static,
    {
        Self::post(FnPostProcessor(f))
    }

    pub fn role(&self) -> ProcessorRole {
        match self {
            Self::Schema(_) => ProcessorRole::Schema,
            Self::Pre(_) => ProcessorRole::Pre,
            Self::Post(_) => ProcessorRole::Post,
        }
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Processor::{:?}", self.role())
    }
}

/// Built-in processors plus one user slot per role.
#[derive(Clone)]
pub struct ProcessorChain {
    schema: Vec<Arc<dyn SchemaProcessor>>,
    pre: Vec<Arc<dyn PreProcessor>>,
    post: Vec<Arc<dyn PostProcessor>>,
    user_schema: Option<Arc<dyn SchemaProcessor>>,
    user_pre: Option<Arc<dyn PreProcessor>>,
    user_post: Option<Arc<dyn PostProcessor>>,
}

impl ProcessorChain {
    /// A chain with no built-ins.
    pub fn empty() -> Self {
        Self {
            schema: Vec::new(),
            pre: Vec::new(),
            post: Vec::new(),
            user_schema: None,
            user_pre: None,
            user_post: None,
        }
    }

    /// A chain with the file handling built-ins; downloads land in `output_dir`.
    pub fn with_file_processors(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema: vec![Arc::new(FileSchemaProcessor)],
            pre: vec![Arc::new(FileUploadProcessor)],
            post: vec![Arc::new(FileDownloadProcessor::new(output_dir))],
            ..Self::empty()
        }
    }

    /// Fills the user slot for `role`, replacing what was there.
    ///
    /// A processor of another role is rejected and the slot is left untouched.
    pub fn set(&mut self, role: ProcessorRole, processor: Processor) -> Result<(), ComposioError> {
        match (role, processor) {
            (ProcessorRole::Schema, Processor::Schema(p)) => self.user_schema = Some(p),
            (ProcessorRole::Pre, Processor::Pre(p)) => self.user_pre = Some(p),
            (ProcessorRole::Post, Processor::Post(p)) => self.user_post = Some(p),
            (expected, other) => {
                return Err(ComposioError::InvalidProcessorType {
                    expected,
                    actual: other.role(),
                });
            }
        }
        debug!(%role, "User processor set");
        Ok(())
    }

    /// Empties the user slot for `role`.
    pub fn clear(&mut self, role: ProcessorRole) {
        match role {
            ProcessorRole::Schema => self.user_schema = None,
            ProcessorRole::Pre => self.user_pre = None,
            ProcessorRole::Post => self.user_post = None,
        }
    }

    /// Whether a user processor is set for `role`.
    pub fn has_user(&self, role: ProcessorRole) -> bool {
        match role {
            ProcessorRole::Schema => self.user_schema.is_some(),
            ProcessorRole::Pre => self.user_pre.is_some(),
            ProcessorRole::Post => self.user_post.is_some(),
        }
    }

    pub fn apply_schema(&self, mut schema: RawActionData) -> Result<RawActionData, ComposioError> {
        let action = schema.name.clone();
        for processor in self.schema.iter().chain(self.user_schema.iter()) {
            schema = processor.process(&action, schema)?;
        }
        Ok(schema)
    }

    pub async fn apply_pre(
        &self,
        ctx: ProcessContext<'_>,
        mut params: Params,
    ) -> Result<Params, ComposioError> {
        for processor in self.pre.iter().chain(self.user_pre.iter()) {
            params = processor.process(ctx, params).await?;
        }
        Ok(params)
    }

    pub async fn apply_post(
        &self,
        ctx: ProcessContext<'_>,
        mut response: ActionResponse,
    ) -> Result<ActionResponse, ComposioError> {
        for processor in self.post.iter().chain(self.user_post.iter()) {
            response = processor.process(ctx, response).await?;
        }
        Ok(response)
    }
}

impl Default for ProcessorChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorChain")
            .field("builtin_schema", &self.schema.len())
            .field("builtin_pre", &self.pre.len())
            .field("builtin_post", &self.post.len())
            .field("user_schema", &self.user_schema.is_some())
            .field("user_pre", &self.user_pre.is_some())
            .field("user_post", &self.user_post.is_some())
            .finish()
    }
}
