//! `fetch-compose-file`: read the Compose file a container was started from.

use crate::container::ContainerDetails;
use crate::shell;
use crate::tools::{Result, Tool, ToolContext, ToolError, container_property, parse_params};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Label listing the Compose files, comma separated.
pub const CONFIG_FILES_LABEL: &str = "com.docker.compose.project.config_files";
/// Label holding the project directory on the host.
pub const WORKING_DIR_LABEL: &str = "com.docker.compose.project.working_dir";
const PROJECT_LABEL: &str = "com.docker.compose.project";
const SERVICE_LABEL: &str = "com.docker.compose.service";

/// Fetches the Compose file that defines a container.
pub struct FetchComposeFileTool;

#[derive(Debug, Deserialize)]
struct Params {
    container: Option<String>,
    path: Option<String>,
}

/// Host paths of the Compose files recorded on the container, absolute when
/// the working directory label allows it.
pub(crate) fn compose_files(details: &ContainerDetails) -> Vec<PathBuf> {
    let working_dir = details.label(WORKING_DIR_LABEL).map(Path::new);
    details
        .label(CONFIG_FILES_LABEL)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|f| match working_dir {
            Some(dir) if Path::new(f).is_relative() => dir.join(f),
            _ => PathBuf::from(f),
        })
        .collect()
}

fn header(details: &ContainerDetails, source: &str) -> String {
    let mut text = format!("# Compose file: {}\n", source);
    if let Some(project) = details.label(PROJECT_LABEL) {
        text.push_str(&format!("# Project: {}\n", project));
    }
    if let Some(service) = details.label(SERVICE_LABEL) {
        text.push_str(&format!("# Service: {}\n", service));
    }
    text.push('\n');
    text
}

#[async_trait]
impl Tool for FetchComposeFileTool {
    fn name(&self) -> &'static str {
        "fetch-compose-file"
    }

    fn description(&self) -> &'static str {
        "Fetch the Docker Compose file that defines a container, using its Compose labels. Pass \"path\" to read a Compose file from inside the container instead."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "container": container_property(),
                "path": { "type": "string", "description": "Compose file path inside the container" }
            }
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: Params = parse_params(args)?;
        let container = ctx.resolve_container(params.container.as_deref())?;

        if let Some(path) = params.path.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            let output = ctx
                .shell(&container, shell::read_file(path, None, None))
                .await?;
            return Ok(format!(
                "# Compose file: {} (in container {})\n\n{}",
                path, container, output.stdout
            ));
        }

        let details = ctx.runtime().inspect_container(&container).await?;
        let files = compose_files(&details);
        let Some(first) = files.first() else {
            return Err(ToolError::Other(format!(
                "Container {} has no {} label; it was not started by Docker Compose. Pass \"path\" to read a file from inside the container.",
                container, CONFIG_FILES_LABEL
            )));
        };

        debug!("Reading compose file {} for {}", first.display(), container);
        let content = tokio::fs::read_to_string(first).await.map_err(|e| {
            ToolError::Other(format!(
                "Failed to read compose file {} on this host: {}",
                first.display(),
                e
            ))
        })?;

        let mut text = header(&details, &first.display().to_string());
        if files.len() > 1 {
            let others: Vec<String> = files[1..].iter().map(|f| f.display().to_string()).collect();
            text.push_str(&format!("# Additional files: {}\n\n", others.join(", ")));
        }
        text.push_str(&content);
        Ok(text)
    }
}
