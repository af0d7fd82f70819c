//! Built-in filesystem tools
//!
//! These operate on the real filesystem. Relative paths resolve against the
//! [`ToolContext`] working directory. Writes and edits require approval.

use async_trait::async_trait;
use deepagents_core::tools::{Tool, ToolBox, ToolContext, ToolParameterSchema, ToolResult, ToolSchema};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Arc;

/// List directory entries; directories carry a trailing `/`
pub struct LsTool;

#[derive(Deserialize)]
struct LsArgs {
    #[serde(default = "default_dir")]
    path: String,
}

fn default_dir() -> String {
    ".".to_string()
}

#[async_trait]
impl Tool for LsTool {
    fn schema(&self) -> ToolSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "path".to_string(),
            ToolParameterSchema::string("Directory to list (default: working directory)"),
        );
        ToolSchema::new(
            "ls",
            "List files and directories",
            ToolParameterSchema::object("List parameters", properties, Vec::new()),
        )
    }

    async fn execute(&self, args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult> {
        let args: LsArgs = serde_json::from_value(args)?;
        let dir = ctx.resolve_path(&args.path);

        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(ToolResult::error(
                    &ctx,
                    format!("Directory '{}' not found", args.path),
                ));
            }
            Err(err) => return Ok(ToolResult::error(&ctx, err)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();

        Ok(ToolResult::json(&ctx, serde_json::json!(entries)))
    }
}

/// Read a file with numbered lines
pub struct ReadFileTool;

#[derive(Deserialize)]
struct ReadFileArgs {
    #[serde(rename = "file_path")]
    path: String,
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

const fn default_limit() -> usize {
    2000
}

/// Longest line returned before truncation
const MAX_LINE_CHARS: usize = 2000;

#[async_trait]
impl Tool for ReadFileTool {
    fn schema(&self) -> ToolSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "file_path".to_string(),
            ToolParameterSchema::string("Path to the file to read"),
        );
        properties.insert(
            "offset".to_string(),
            ToolParameterSchema::integer("Line number to start reading from (default: 0)"),
        );
        properties.insert(
            "limit".to_string(),
            ToolParameterSchema::integer("Maximum number of lines to read (default: 2000)"),
        );

        ToolSchema::new(
            "read_file",
            "Read the contents of a file with optional line offset and limit",
            ToolParameterSchema::object(
                "Read file parameters",
                properties,
                vec!["file_path".to_string()],
            ),
        )
    }

    async fn execute(&self, args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult> {
        let args: ReadFileArgs = serde_json::from_value(args)?;

        let contents = match tokio::fs::read_to_string(ctx.resolve_path(&args.path)).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(ToolResult::error(
                    &ctx,
                    format!("File '{}' not found", args.path),
                ));
            }
            Err(err) => return Ok(ToolResult::error(&ctx, err)),
        };

        if contents.trim().is_empty() {
            return Ok(ToolResult::text(
                &ctx,
                "System reminder: File exists but has empty contents",
            ));
        }

        let lines: Vec<&str> = contents.lines().collect();
        if args.offset >= lines.len() {
            return Ok(ToolResult::error(
                &ctx,
                format!(
                    "Line offset {} exceeds file length ({} lines)",
                    args.offset,
                    lines.len()
                ),
            ));
        }

        let end = args.offset.saturating_add(args.limit).min(lines.len());
        let mut formatted = String::new();
        for (idx, line) in lines[args.offset..end].iter().enumerate() {
            let line_number = args.offset + idx + 1;
            let content: String = line.chars().take(MAX_LINE_CHARS).collect();
            formatted.push_str(&format!("{:6}\t{}\n", line_number, content));
        }

        Ok(ToolResult::text(&ctx, formatted.trim_end().to_string()))
    }
}

/// Create or overwrite a file, creating parent directories as needed
pub struct WriteFileTool;

#[derive(Deserialize)]
struct WriteFileArgs {
    #[serde(rename = "file_path")]
    path: String,
    content: String,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn schema(&self) -> ToolSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "file_path".to_string(),
            ToolParameterSchema::string("Path to the file to write"),
        );
        properties.insert(
            "content".to_string(),
            ToolParameterSchema::string("Content to write to the file"),
        );

        ToolSchema::new(
            "write_file",
            "Write content to a file (creates new or overwrites existing)",
            ToolParameterSchema::object(
                "Write file parameters",
                properties,
                vec!["file_path".to_string(), "content".to_string()],
            ),
        )
    }

    async fn execute(&self, args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult> {
        let args: WriteFileArgs = serde_json::from_value(args)?;
        let target = ctx.resolve_path(&args.path);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &args.content).await?;
        tracing::debug!(path = %target.display(), bytes = args.content.len(), "Wrote file");

        Ok(ToolResult::text(&ctx, format!("Updated file {}", args.path)))
    }

    fn requires_approval(&self) -> bool {
        true
    }
}

/// Exact string replacement within a file
pub struct EditFileTool;

#[derive(Deserialize)]
struct EditFileArgs {
    #[serde(rename = "file_path")]
    path: String,
    #[serde(rename = "old_string")]
    old: String,
    #[serde(rename = "new_string")]
    new: String,
    #[serde(default)]
    replace_all: bool,
}

#[async_trait]
impl Tool for EditFileTool {
    fn schema(&self) -> ToolSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "file_path".to_string(),
            ToolParameterSchema::string("Path to the file to edit"),
        );
        properties.insert(
            "old_string".to_string(),
            ToolParameterSchema::string("String to find and replace"),
        );
        properties.insert(
            "new_string".to_string(),
            ToolParameterSchema::string("Replacement string"),
        );
        properties.insert(
            "replace_all".to_string(),
            ToolParameterSchema::boolean(
                "Replace all occurrences (default: false, requires unique match)",
            ),
        );

        ToolSchema::new(
            "edit_file",
            "Edit a file by replacing old_string with new_string",
            ToolParameterSchema::object(
                "Edit file parameters",
                properties,
                vec![
                    "file_path".to_string(),
                    "old_string".to_string(),
                    "new_string".to_string(),
                ],
            ),
        )
    }

    async fn execute(&self, args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult> {
        let args: EditFileArgs = serde_json::from_value(args)?;
        let target = ctx.resolve_path(&args.path);

        let existing = match tokio::fs::read_to_string(&target).await {
            Ok(existing) => existing,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(ToolResult::error(
                    &ctx,
                    format!("File '{}' not found", args.path),
                ));
            }
            Err(err) => return Ok(ToolResult::error(&ctx, err)),
        };

        if args.old.is_empty() || !existing.contains(&args.old) {
            return Ok(ToolResult::error(
                &ctx,
                format!("String not found in file: '{}'", args.old),
            ));
        }

        let occurrences = existing.matches(&args.old).count();
        if !args.replace_all && occurrences > 1 {
            return Ok(ToolResult::error(
                &ctx,
                format!(
                    "String '{}' appears {} times in file. Use replace_all=true to replace all instances, or provide a more specific string with surrounding context.",
                    args.old, occurrences
                ),
            ));
        }

        let updated = if args.replace_all {
            existing.replace(&args.old, &args.new)
        } else {
            existing.replacen(&args.old, &args.new, 1)
        };
        tokio::fs::write(&target, updated).await?;

        let message = if args.replace_all {
            format!(
                "Successfully replaced {} instance(s) of the string in '{}'",
                occurrences, args.path
            )
        } else {
            format!("Successfully replaced string in '{}'", args.path)
        };
        Ok(ToolResult::text(&ctx, message))
    }

    fn requires_approval(&self) -> bool {
        true
    }
}

/// All built-in filesystem tools
pub fn create_filesystem_tools() -> Vec<ToolBox> {
    vec![
        Arc::new(LsTool),
        Arc::new(ReadFileTool),
        Arc::new(WriteFileTool),
        Arc::new(EditFileTool),
    ]
}
