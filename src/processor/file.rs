//! Built-in processors that move file content between callers and the
//! platform's object store.

use async_trait::async_trait;
use futures::future::try_join_all;
use regex::Regex;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{PostProcessor, PreProcessor, ProcessContext, SchemaProcessor};
use crate::action::{ActionResponse, Params, RawActionData};
use crate::client::FileUpload;
use crate::error::ComposioError;

/// Marks a parameter whose value is a local path or URL of file content.
pub const FILE_SUFFIX: &str = "_file_uri_path";

const OCTET_STREAM: &str = "application/octet-stream";

const MIME_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("mp4", "video/mp4"),
];

/// Guesses a mime type from a file name's extension.
pub fn mime_from_path(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| {
            MIME_TYPES
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        })
        .map(|(_, mime)| mime.to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// File extension for a mime type, `bin` when unknown.
pub fn extension_for_mime(mime: &str) -> &'static str {
    MIME_TYPES
        .iter()
        .find(|(_, known)| known.eq_ignore_ascii_case(mime))
        .map(|(ext, _)| *ext)
        .unwrap_or("bin")
}

static URL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://\S+$").ok());

fn is_url(value: &str) -> bool {
    URL_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

fn is_file_uploadable(property: &Value) -> bool {
    property.get("file_uploadable").and_then(Value::as_bool) == Some(true)
}

/// Toolkit slug encoded in a platform action name, e.g. `github` for
/// `GITHUB_STAR_A_REPOSITORY`.
pub(crate) fn app_from_action(action: &str) -> String {
    action
        .split('_')
        .next()
        .unwrap_or(action)
        .to_lowercase()
}

/// Exposes file-uploadable properties as plain path strings.
///
/// A property `file` marked `file_uploadable` becomes `file_file_uri_path`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSchemaProcessor;

impl SchemaProcessor for FileSchemaProcessor {
    fn process(&self, _action: &str, mut schema: RawActionData) -> Result<RawActionData, ComposioError> {
        let parameters = &mut schema.parameters;
        if !parameters.properties.values().any(is_file_uploadable) {
            return Ok(schema);
        }

        let mut properties = Map::new();
        for (key, property) in std::mem::take(&mut parameters.properties) {
            if !is_file_uploadable(&property) {
                properties.insert(key, property);
                continue;
            }

            let renamed = format!("{}{}", key, FILE_SUFFIX);
            let mut replacement = json!({"type": "string", "format": "path"});
            for field in ["title", "description"] {
                if let Some(value) = property.get(field) {
                    replacement[field] = value.clone();
                }
            }
            for required in parameters.required.iter_mut().filter(|r| **r == key) {
                *required = renamed.clone();
            }
            properties.insert(renamed, replacement);
        }
        parameters.properties = properties;

        Ok(schema)
    }
}

/// Uploads files named by suffixed parameters and swaps in their object-store
/// reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileUploadProcessor;

impl FileUploadProcessor {
    async fn upload(ctx: ProcessContext<'_>, value: &Value) -> Result<Value, ComposioError> {
        let location = value
            .as_str()
            .map(str::trim)
            .filter(|location| !location.is_empty())
            .ok_or_else(|| ComposioError::FileReadError {
                path: value.to_string(),
                reason: "expected a non-empty file path or URL".to_string(),
            })?;
        let read_error = |reason: String| ComposioError::FileReadError {
            path: location.to_string(),
            reason,
        };

        let (name, mimetype, content) = if is_url(location) {
            let file = ctx
                .api
                .download_file(location)
                .await
                .map_err(|e| read_error(e.to_string()))?;
            let name = location
                .split(['?', '#'])
                .next()
                .and_then(|url| url.rsplit('/').next())
                .filter(|name| !name.is_empty())
                .unwrap_or("file")
                .to_string();
            let mimetype = file
                .content_type
                .filter(|mime| !mime.is_empty())
                .unwrap_or_else(|| mime_from_path(&name));
            (name, mimetype, file.content)
        } else {
            let content = tokio::fs::read(location)
                .await
                .map_err(|e| read_error(e.to_string()))?;
            let name = Path::new(location)
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("file")
                .to_string();
            (name, mime_from_path(location), content)
        };

        debug!(action = %ctx.action, file = %name, %mimetype, bytes = content.len(), "Uploading file parameter");

        let upload = FileUpload {
            action: ctx.action.to_string(),
            app: ctx
                .app
                .map(str::to_string)
                .unwrap_or_else(|| app_from_action(ctx.action)),
            filename: name.clone(),
            mimetype: mimetype.clone(),
            content,
        };
        let s3key = ctx.api.upload_file(&upload).await?;

        Ok(json!({"name": name, "mimetype": mimetype, "s3key": s3key}))
    }
}

#[async_trait]
impl PreProcessor for FileUploadProcessor {
    async fn process(&self, ctx: ProcessContext<'_>, params: Params) -> Result<Params, ComposioError> {
        let keys: Vec<String> = params
            .keys()
            .filter(|key| key.ends_with(FILE_SUFFIX))
            .cloned()
            .collect();
        if keys.is_empty() {
            return Ok(params);
        }

        let files = try_join_all(keys.iter().map(|key| Self::upload(ctx, &params[key]))).await?;
        let mut uploaded: HashMap<String, Value> = keys.into_iter().zip(files).collect();
        let targets: Vec<String> = uploaded
            .keys()
            .map(|key| key.strip_suffix(FILE_SUFFIX).unwrap_or(key).to_string())
            .collect();

        // An uploaded file replaces any value the caller sent under its bare key.
        let mut output = Params::new();
        for (key, value) in params {
            if let Some(file) = uploaded.remove(&key) {
                let target = key.strip_suffix(FILE_SUFFIX).unwrap_or(&key).to_string();
                output.insert(target, file);
            } else if targets.contains(&key) {
                warn!(action = %ctx.action, param = %key, "Dropping value replaced by uploaded file");
            } else {
                output.insert(key, value);
            }
        }
        Ok(output)
    }
}

/// Saves files referenced by `s3url` fields of a result to local disk.
#[derive(Debug, Clone)]
pub struct FileDownloadProcessor {
    output_dir: PathBuf,
}

impl FileDownloadProcessor {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn save(
        &self,
        ctx: ProcessContext<'_>,
        s3url: &str,
        declared: Option<&str>,
    ) -> Result<(PathBuf, String), ComposioError> {
        let file = ctx.api.download_file(s3url).await?;
        let mime = declared
            .map(str::to_string)
            .or(file.content_type)
            .filter(|mime| !mime.is_empty())
            .unwrap_or_else(|| OCTET_STREAM.to_string());

        let stem: String = ctx
            .action
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let path = self.output_dir.join(format!(
            "{}_{}.{}",
            stem,
            Uuid::new_v4(),
            extension_for_mime(&mime)
        ));
        tokio::fs::write(&path, &file.content).await?;

        debug!(action = %ctx.action, path = %path.display(), %mime, "Saved downloaded file");
        Ok((path, mime))
    }
}

#[async_trait]
impl PostProcessor for FileDownloadProcessor {
    async fn process(
        &self,
        ctx: ProcessContext<'_>,
        mut response: ActionResponse,
    ) -> Result<ActionResponse, ComposioError> {
        let targets: Vec<(String, String, Option<String>)> = match &response.data {
            Value::Object(data) => data
                .iter()
                .filter_map(|(key, value)| {
                    let s3url = value.get("s3url")?.as_str()?;
                    let mime = value
                        .get("mimetype")
                        .or_else(|| value.get("mimeType"))
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    Some((key.clone(), s3url.to_string(), mime))
                })
                .collect(),
            _ => return Ok(response),
        };
        if targets.is_empty() {
            return Ok(response);
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let saved = try_join_all(
            targets
                .iter()
                .map(|(_, s3url, mime)| self.save(ctx, s3url, mime.as_deref())),
        )
        .await?;

        if let Value::Object(data) = &mut response.data {
            for ((key, s3url, _), (path, mime)) in targets.into_iter().zip(saved) {
                data.insert(
                    key,
                    json!({
                        "uri": path.display().to_string(),
                        "s3url": s3url,
                        "mimeType": mime,
                    }),
                );
            }
        }
        Ok(response)
    }
}
