//! File tools backed by shell commands inside the container.

use crate::container::ExecConfig;
use crate::shell;
use crate::tools::{
    Result, Tool, ToolContext, ToolError, container_property, parse_params, require_non_empty,
};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};

/// Reads a text file.
pub struct ReadFileTool;

#[derive(Debug, Deserialize)]
struct ReadParams {
    path: String,
    container: Option<String>,
    start_line: Option<u64>,
    max_lines: Option<u64>,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read-file"
    }

    fn description(&self) -> &'static str {
        "Read a text file inside a container, optionally limited to a range of lines."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path inside the container" },
                "container": container_property(),
                "start_line": { "type": "integer", "minimum": 1, "description": "First line to return (1-based)" },
                "max_lines": { "type": "integer", "minimum": 1, "description": "Maximum number of lines to return" }
            },
            "required": ["path"]
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: ReadParams = parse_params(args)?;
        require_non_empty("path", &params.path)?;
        if params.max_lines == Some(0) {
            return Err(ToolError::InvalidParams("\"max_lines\" must be at least 1".to_string()));
        }

        let container = ctx.resolve_container(params.container.as_deref())?;
        let script = shell::read_file(&params.path, params.start_line, params.max_lines);
        let output = ctx.shell(&container, script).await?;

        if output.stdout.is_empty() {
            Ok(format!("(file {} is empty or the range has no lines)", params.path))
        } else {
            Ok(output.stdout)
        }
    }
}

/// Writes or appends a text file.
pub struct WriteFileTool;

#[derive(Debug, Deserialize)]
struct WriteParams {
    path: String,
    content: String,
    container: Option<String>,
    #[serde(default)]
    append: bool,
    #[serde(default = "default_true")]
    create_dirs: bool,
}

fn default_true() -> bool {
    true
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write-file"
    }

    fn description(&self) -> &'static str {
        "Write text to a file inside a container, replacing it or appending to it. Parent directories are created by default."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path inside the container" },
                "content": { "type": "string", "description": "Text to write" },
                "container": container_property(),
                "append": { "type": "boolean", "default": false, "description": "Append instead of overwrite" },
                "create_dirs": { "type": "boolean", "default": true, "description": "Create missing parent directories" }
            },
            "required": ["path", "content"]
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: WriteParams = parse_params(args)?;
        require_non_empty("path", &params.path)?;

        let container = ctx.resolve_container(params.container.as_deref())?;
        let bytes = params.content.len();
        write_via_stdin(
            ctx,
            &container,
            shell::write_file(&params.path, params.append, params.create_dirs),
            params.content,
        )
        .await?;

        let verb = if params.append { "Appended" } else { "Wrote" };
        Ok(format!("{} {} bytes to {}", verb, bytes, params.path))
    }
}

async fn write_via_stdin(
    ctx: &ToolContext,
    container: &str,
    script: String,
    content: String,
) -> Result<()> {
    let config = ExecConfig::builder()
        .shell(script)
        .stdin(content.into_bytes())
        .build();
    ctx.exec_checked(container, &config, None).await?;
    Ok(())
}

/// Replaces text in a file.
pub struct ReplaceTextTool;

#[derive(Debug, Deserialize)]
struct ReplaceParams {
    path: String,
    old_text: String,
    new_text: String,
    container: Option<String>,
    #[serde(default)]
    replace_all: bool,
    #[serde(default)]
    regex: bool,
}

#[async_trait]
impl Tool for ReplaceTextTool {
    fn name(&self) -> &'static str {
        "replace-text"
    }

    fn description(&self) -> &'static str {
        "Replace text in a file inside a container. The text must occur exactly once unless \"replace_all\" is true."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path inside the container" },
                "old_text": { "type": "string", "description": "Text to find" },
                "new_text": { "type": "string", "description": "Replacement text" },
                "container": container_property(),
                "replace_all": { "type": "boolean", "default": false, "description": "Replace every occurrence" },
                "regex": { "type": "boolean", "default": false, "description": "Treat old_text as a regular expression; new_text may use $1-style groups" }
            },
            "required": ["path", "old_text", "new_text"]
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: ReplaceParams = parse_params(args)?;
        require_non_empty("path", &params.path)?;
        if params.old_text.is_empty() {
            return Err(ToolError::InvalidParams("\"old_text\" must not be empty".to_string()));
        }

        let container = ctx.resolve_container(params.container.as_deref())?;
        let read = ctx
            .shell(&container, shell::read_file(&params.path, None, None))
            .await?;
        if read.stdout_lossy {
            return Err(ToolError::Other(format!(
                "{} is not valid UTF-8; refusing to rewrite it",
                params.path
            )));
        }
        let original = read.stdout;

        let replacement = if params.regex {
            let pattern = Regex::new(&params.old_text)
                .map_err(|e| ToolError::InvalidParams(format!("invalid regex: {}", e)))?;
            replace_regex(&original, &pattern, &params.new_text, params.replace_all)
        } else {
            replace_literal(&original, &params.old_text, &params.new_text, params.replace_all)
        };
        let (updated, count) = replacement.map_err(|e| match e {
            ReplaceError::NotFound => {
                ToolError::Other(format!("Text not found in {}", params.path))
            }
            ReplaceError::Ambiguous(n) => ToolError::Other(format!(
                "Found {} occurrences in {}; add surrounding context or set \"replace_all\"",
                n, params.path
            )),
        })?;

        write_via_stdin(
            ctx,
            &container,
            shell::write_file(&params.path, false, false),
            updated,
        )
        .await?;

        Ok(format!("Replaced {} occurrence(s) in {}", count, params.path))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ReplaceError {
    NotFound,
    Ambiguous(usize),
}

fn replace_literal(
    text: &str,
    old: &str,
    new: &str,
    replace_all: bool,
) -> std::result::Result<(String, usize), ReplaceError> {
    match text.matches(old).count() {
        0 => Err(ReplaceError::NotFound),
        1 => Ok((text.replacen(old, new, 1), 1)),
        n if replace_all => Ok((text.replace(old, new), n)),
        n => Err(ReplaceError::Ambiguous(n)),
    }
}

fn replace_regex(
    text: &str,
    pattern: &Regex,
    new: &str,
    replace_all: bool,
) -> std::result::Result<(String, usize), ReplaceError> {
    match pattern.find_iter(text).count() {
        0 => Err(ReplaceError::NotFound),
        1 => Ok((pattern.replacen(text, 1, new).into_owned(), 1)),
        n if replace_all => Ok((pattern.replace_all(text, new).into_owned(), n)),
        n => Err(ReplaceError::Ambiguous(n)),
    }
}

/// Lists a directory.
pub struct ListDirectoryTool;

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default = "default_dir")]
    path: String,
    container: Option<String>,
    #[serde(default)]
    show_hidden: bool,
}

fn default_dir() -> String {
    ".".to_string()
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list-directory"
    }

    fn description(&self) -> &'static str {
        "List the contents of a directory inside a container in long format."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "default": ".", "description": "Directory path inside the container" },
                "container": container_property(),
                "show_hidden": { "type": "boolean", "default": false, "description": "Include dotfiles" }
            }
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: ListParams = parse_params(args)?;
        require_non_empty("path", &params.path)?;

        let container = ctx.resolve_container(params.container.as_deref())?;
        let output = ctx
            .shell(&container, shell::list_directory(&params.path, params.show_hidden))
            .await?;
        Ok(output.stdout)
    }
}

/// Deletes a file or directory tree.
pub struct DeleteFileTool;

#[derive(Debug, Deserialize)]
struct DeleteParams {
    path: String,
    container: Option<String>,
    #[serde(default)]
    recursive: bool,
}

/// Paths that are never deleted, compared after trailing slashes are removed.
const PROTECTED_PATHS: &[&str] = &["", ".", "..", "/bin", "/etc", "/lib", "/proc", "/sys", "/usr"];

fn is_protected(path: &str) -> bool {
    let trimmed = path.trim();
    let normalized = trimmed.trim_end_matches('/');
    (trimmed.starts_with('/') && normalized.is_empty())
        || PROTECTED_PATHS.contains(&normalized)
        || normalized.ends_with("/..")
        || normalized.ends_with("/.")
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &'static str {
        "delete-file"
    }

    fn description(&self) -> &'static str {
        "Delete a file inside a container. Directories require \"recursive\": true."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path inside the container" },
                "container": container_property(),
                "recursive": { "type": "boolean", "default": false, "description": "Delete directories and their contents" }
            },
            "required": ["path"]
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: DeleteParams = parse_params(args)?;
        require_non_empty("path", &params.path)?;
        if is_protected(&params.path) {
            return Err(ToolError::InvalidParams(format!(
                "refusing to delete protected path {:?}",
                params.path
            )));
        }

        let container = ctx.resolve_container(params.container.as_deref())?;
        ctx.shell(&container, shell::delete_file(&params.path, params.recursive))
            .await?;
        Ok(format!("Deleted {}", params.path))
    }
}
