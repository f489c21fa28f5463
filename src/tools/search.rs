//! `search-text` and `find-files`.

use crate::container::ExecConfig;
use crate::shell::{self, FindOptions, SearchOptions};
use crate::tools::{
    Result, Tool, ToolContext, ToolError, container_property, format_output, parse_params,
    require_non_empty,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

const DEFAULT_MAX_RESULTS: usize = 100;

fn default_path() -> String {
    ".".to_string()
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

/// Keep the first `max` non-empty lines, noting how many were dropped.
fn limit_lines(text: &str, max: usize) -> (String, usize) {
    let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
    let total = lines.len();
    let mut kept = lines[..total.min(max)].join("\n");
    if total > max {
        kept.push_str(&format!(
            "\n... [{} more result(s) omitted; showing {} of {}]",
            total - max,
            max,
            total
        ));
    }
    (kept, total)
}

fn check_max_results(max: usize) -> Result<()> {
    if max == 0 {
        Err(ToolError::InvalidParams(
            "\"max_results\" must be at least 1".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Recursive text search with `grep`.
pub struct SearchTextTool;

#[derive(Debug, Deserialize)]
struct SearchParams {
    pattern: String,
    #[serde(default = "default_path")]
    path: String,
    container: Option<String>,
    #[serde(default)]
    ignore_case: bool,
    #[serde(default)]
    fixed_strings: bool,
    include: Option<String>,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

#[async_trait]
impl Tool for SearchTextTool {
    fn name(&self) -> &'static str {
        "search-text"
    }

    fn description(&self) -> &'static str {
        "Search files inside a container for a pattern (grep -rn). Returns matching lines as path:line:text."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Basic regular expression, or literal text with fixed_strings" },
                "path": { "type": "string", "default": ".", "description": "File or directory to search" },
                "container": container_property(),
                "ignore_case": { "type": "boolean", "default": false },
                "fixed_strings": { "type": "boolean", "default": false, "description": "Match the pattern literally" },
                "include": { "type": "string", "description": "Only search files whose name matches this glob, e.g. *.rs" },
                "max_results": { "type": "integer", "minimum": 1, "default": DEFAULT_MAX_RESULTS }
            },
            "required": ["pattern"]
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: SearchParams = parse_params(args)?;
        if params.pattern.is_empty() {
            return Err(ToolError::InvalidParams("\"pattern\" must not be empty".to_string()));
        }
        require_non_empty("path", &params.path)?;
        check_max_results(params.max_results)?;

        let container = ctx.resolve_container(params.container.as_deref())?;
        let options = SearchOptions {
            ignore_case: params.ignore_case,
            fixed_strings: params.fixed_strings,
            include: params.include.as_deref().filter(|g| !g.is_empty()),
        };
        let config = ExecConfig::builder()
            .shell(shell::search_text(&params.pattern, &params.path, &options))
            .build();
        let output = ctx.exec(&container, &config, None).await?;

        // grep: 0 = matches, 1 = none, 2 = error (possibly with partial matches)
        match output.exit_code {
            Some(1) if output.stderr.trim().is_empty() => {
                Ok(format!("No matches found for {:?} in {}", params.pattern, params.path))
            }
            Some(0) | Some(1) | Some(2) if !output.stdout.trim().is_empty() => {
                let (mut text, _) = limit_lines(&output.stdout, params.max_results);
                if !output.stderr.trim().is_empty() {
                    text.push_str("\n[stderr]\n");
                    text.push_str(output.stderr.trim_end());
                }
                Ok(text)
            }
            Some(0) => Ok(format!("No matches found for {:?} in {}", params.pattern, params.path)),
            code => Err(ToolError::CommandFailed {
                exit_code: code.unwrap_or(-1),
                output: format_output(&output),
            }),
        }
    }
}

/// File search with `find`.
pub struct FindFilesTool;

#[derive(Debug, Deserialize)]
struct FindParams {
    #[serde(default = "default_path")]
    path: String,
    container: Option<String>,
    name: Option<String>,
    file_type: Option<String>,
    max_depth: Option<u32>,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

fn parse_file_type(value: Option<&str>) -> Result<Option<char>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some("f") | Some("file") => Ok(Some('f')),
        Some("d") | Some("dir") | Some("directory") => Ok(Some('d')),
        Some("l") | Some("link") | Some("symlink") => Ok(Some('l')),
        Some(other) => Err(ToolError::InvalidParams(format!(
            "\"file_type\" must be one of f, d, l (got {:?})",
            other
        ))),
    }
}

#[async_trait]
impl Tool for FindFilesTool {
    fn name(&self) -> &'static str {
        "find-files"
    }

    fn description(&self) -> &'static str {
        "Find files inside a container by name pattern, type and depth."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "default": ".", "description": "Directory to start from" },
                "container": container_property(),
                "name": { "type": "string", "description": "Name glob, e.g. *.toml" },
                "file_type": { "type": "string", "enum": ["f", "d", "l"], "description": "f = file, d = directory, l = symlink" },
                "max_depth": { "type": "integer", "minimum": 0 },
                "max_results": { "type": "integer", "minimum": 1, "default": DEFAULT_MAX_RESULTS }
            }
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: FindParams = parse_params(args)?;
        require_non_empty("path", &params.path)?;
        check_max_results(params.max_results)?;
        let file_type = parse_file_type(params.file_type.as_deref())?;

        let container = ctx.resolve_container(params.container.as_deref())?;
        let options = FindOptions {
            name: params.name.as_deref().filter(|n| !n.is_empty()),
            file_type,
            max_depth: params.max_depth,
        };
        let config = ExecConfig::builder()
            .shell(shell::find_files(&params.path, &options))
            .build();
        let output = ctx.exec(&container, &config, None).await?;

        // find exits 1 on unreadable entries but still prints what it found
        if !output.stdout.trim().is_empty() {
            let (mut text, _) = limit_lines(&output.stdout, params.max_results);
            if !output.stderr.trim().is_empty() {
                text.push_str("\n[stderr]\n");
                text.push_str(output.stderr.trim_end());
            }
            return Ok(text);
        }

        match output.exit_code {
            Some(0) => Ok(format!("No files found in {}", params.path)),
            code => Err(ToolError::CommandFailed {
                exit_code: code.unwrap_or(-1),
                output: format_output(&output),
            }),
        }
    }
}
