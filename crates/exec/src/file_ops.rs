//! `file_operations` handler (spec.md §4.3) — sandbox-root containment
//! follows the grounding repo's `ReadFileTool`/`WriteFileTool` pattern:
//! canonicalize both the target and the root, then require `starts_with`.

use std::path::PathBuf;

use aiq_core::{CancelToken, ErrorType, ToolResult};
use async_trait::async_trait;
use aiq_tools::ToolHandler;

const READ_CAP_BYTES: usize = 65_536;

pub struct FileOpsHandler {
    pub sandbox_root: PathBuf,
}

#[async_trait]
impl ToolHandler for FileOpsHandler {
    async fn call(&self, args: &serde_json::Map<String, serde_json::Value>, _cancel: &CancelToken) -> anyhow::Result<ToolResult> {
        let Some(operation) = args.get("operation").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::error(ErrorType::Unknown, "file_operations requires an \"operation\" argument"));
        };
        let Some(rel_path) = args.get("path").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::error(ErrorType::Unknown, "file_operations requires a \"path\" argument"));
        };

        match operation {
            "read" => self.read(rel_path),
            "list" => self.list(rel_path),
            "exists" => self.exists(rel_path),
            "write" => {
                let content = args.get("content").and_then(|v| v.as_str()).unwrap_or_default();
                self.write(rel_path, content)
            }
            other => Ok(ToolResult::error(ErrorType::Unknown, format!("unknown file operation: {other}"))),
        }
    }
}

impl FileOpsHandler {
    fn contain(&self, rel_path: &str) -> Result<PathBuf, ToolResult> {
        let root_canonical = self.sandbox_root.canonicalize().map_err(|err| {
            ToolResult::error(ErrorType::Unknown, format!("sandbox root unavailable: {err}"))
        })?;
        let candidate = self.sandbox_root.join(rel_path);

        let canonical = if candidate.exists() {
            candidate.canonicalize().map_err(|err| ToolResult::error(ErrorType::Unknown, err.to_string()))?
        } else {
            let parent = candidate.parent().unwrap_or(&self.sandbox_root);
            std::fs::create_dir_all(parent).ok();
            let parent_canonical =
                parent.canonicalize().map_err(|err| ToolResult::error(ErrorType::Unknown, err.to_string()))?;
            if !parent_canonical.starts_with(&root_canonical) {
                return Err(permission_denied(rel_path));
            }
            return Ok(candidate);
        };

        if !canonical.starts_with(&root_canonical) {
            return Err(permission_denied(rel_path));
        }
        Ok(canonical)
    }

    fn read(&self, rel_path: &str) -> anyhow::Result<ToolResult> {
        let path = match self.contain(rel_path) {
            Ok(path) => path,
            Err(result) => return Ok(result),
        };
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => return Ok(io_error(rel_path, &err)),
        };
        let truncated = truncate_byte_boundary(&content, READ_CAP_BYTES);
        Ok(ToolResult::ok(serde_json::json!({"content": truncated}), false))
    }

    fn write(&self, rel_path: &str, content: &str) -> anyhow::Result<ToolResult> {
        let path = match self.contain(rel_path) {
            Ok(path) => path,
            Err(result) => return Ok(result),
        };
        if let Err(err) = std::fs::write(&path, content) {
            return Ok(io_error(rel_path, &err));
        }
        Ok(ToolResult::ok(serde_json::json!({"bytes_written": content.len()}), false))
    }

    fn list(&self, rel_path: &str) -> anyhow::Result<ToolResult> {
        let path = match self.contain(rel_path) {
            Ok(path) => path,
            Err(result) => return Ok(result),
        };
        let entries = match std::fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(err) => return Ok(io_error(rel_path, &err)),
        };
        let names: Vec<String> =
            entries.flatten().filter_map(|entry| entry.file_name().into_string().ok()).collect();
        Ok(ToolResult::ok(serde_json::json!({"entries": names}), false))
    }

    fn exists(&self, rel_path: &str) -> anyhow::Result<ToolResult> {
        let path = match self.contain(rel_path) {
            Ok(path) => path,
            Err(result) => return Ok(result),
        };
        Ok(ToolResult::ok(serde_json::json!({"exists": path.exists()}), false))
    }
}

fn permission_denied(rel_path: &str) -> ToolResult {
    ToolResult::error(ErrorType::PermissionDenied, format!("path escapes sandbox root: {rel_path}"))
}

fn io_error(rel_path: &str, err: &std::io::Error) -> ToolResult {
    let error_type = if err.kind() == std::io::ErrorKind::NotFound {
        ErrorType::ResourceNotFound
    } else if err.kind() == std::io::ErrorKind::PermissionDenied {
        ErrorType::PermissionDenied
    } else {
        ErrorType::Unknown
    };
    ToolResult::error(error_type, format!("{rel_path}: {err}"))
}

/// Largest byte offset ≤ `max` that falls on a UTF-8 character boundary.
fn truncate_byte_boundary(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…[truncated at {} bytes]", &s[..end], max)
}

#[cfg(test)]
fn map_args(operation: &str, rel_path: &str, content: Option<&str>) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    map.insert("operation".to_string(), serde_json::Value::String(operation.to_string()));
    map.insert("path".to_string(), serde_json::Value::String(rel_path.to_string()));
    if let Some(content) = content {
        map.insert("content".to_string(), serde_json::Value::String(content.to_string()));
    }
    map
}
