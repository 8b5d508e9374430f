//! Default File-Inspection Tools
//!
//! The agent core consumes tools through the registry contract; these are
//! the concrete tools the CLI wires up. All paths are sandboxed to the
//! repository root: a resolved path escaping the root becomes a tool error
//! the model can read, never a panic.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use ignore::WalkBuilder;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::tools::{StaticRegistry, Tool, ToolOutput};

/// Content cap per read, in bytes
const MAX_READ_BYTES: usize = 64 * 1024;
/// Listing cap per call
const MAX_LIST_ENTRIES: usize = 200;
/// Matching-line cap per search
const MAX_SEARCH_HITS: usize = 50;

/// Registry with the standard repository-inspection tool set
pub fn default_registry(repo_root: &Path) -> StaticRegistry {
    let sandbox = Sandbox::new(repo_root);
    let mut registry = StaticRegistry::new();
    registry.register(Arc::new(ReadFileTool {
        sandbox: sandbox.clone(),
    }));
    registry.register(Arc::new(ListFilesTool {
        sandbox: sandbox.clone(),
    }));
    registry.register(Arc::new(SearchTool { sandbox }));
    registry
}

/// Confines tool paths to the repository root
#[derive(Clone)]
struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    fn new(root: &Path) -> Self {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        Self { root }
    }

    fn resolve(&self, relative: &str) -> std::result::Result<PathBuf, String> {
        let joined = self.root.join(relative.trim_start_matches('/'));
        let canonical = joined
            .canonicalize()
            .map_err(|e| format!("cannot resolve '{}': {}", relative, e))?;
        if canonical.starts_with(&self.root) {
            Ok(canonical)
        } else {
            Err(format!("path '{}' escapes the repository root", relative))
        }
    }
}

// =============================================================================
// read_file
// =============================================================================

struct ReadFileTool {
    sandbox: Sandbox,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file from the repository. Large files are truncated."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path relative to the repository root"}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, _cancel: &CancellationToken) -> ToolOutput {
        let Some(path) = args["path"].as_str() else {
            return ToolOutput::error("missing 'path' argument");
        };

        let resolved = match self.sandbox.resolve(path) {
            Ok(p) => p,
            Err(e) => return ToolOutput::error(e),
        };

        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) if content.len() > MAX_READ_BYTES => {
                let truncated: String = content.chars().take(MAX_READ_BYTES).collect();
                ToolOutput::ok(format!("{}\n... [truncated]", truncated))
            }
            Ok(content) => ToolOutput::ok(content),
            Err(e) => ToolOutput::error(format!("cannot read '{}': {}", path, e)),
        }
    }
}

// =============================================================================
// list_files
// =============================================================================

struct ListFilesTool {
    sandbox: Sandbox,
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and directories under a path, honoring gitignore rules."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Directory relative to the repository root, default root"},
                "depth": {"type": "integer", "description": "Recursion depth, default 2"}
            }
        })
    }

    async fn execute(&self, args: Value, cancel: &CancellationToken) -> ToolOutput {
        let path = args["path"].as_str().unwrap_or(".");
        let depth = args["depth"].as_u64().unwrap_or(2).min(8) as usize;

        let base = match self.sandbox.resolve(path) {
            Ok(p) => p,
            Err(e) => return ToolOutput::error(e),
        };

        let walker = WalkBuilder::new(&base)
            .max_depth(Some(depth))
            .require_git(false)
            .build();
        let mut entries = Vec::new();
        for entry in walker.flatten() {
            if cancel.is_cancelled() {
                return ToolOutput::error("listing cancelled");
            }
            if entry.path() == base {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.sandbox.root) else {
                continue;
            };
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            entries.push(if is_dir {
                format!("{}/", relative.display())
            } else {
                relative.display().to_string()
            });
            if entries.len() >= MAX_LIST_ENTRIES {
                entries.push("... [truncated]".to_string());
                break;
            }
        }

        entries.sort();
        if entries.is_empty() {
            ToolOutput::ok("(empty)")
        } else {
            ToolOutput::ok(entries.join("\n"))
        }
    }
}

// =============================================================================
// search_code
// =============================================================================

struct SearchTool {
    sandbox: Sandbox,
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search_code"
    }

    fn description(&self) -> &str {
        "Find lines containing a literal string across the repository."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Literal text to search for"},
                "path": {"type": "string", "description": "Directory to search, default root"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, cancel: &CancellationToken) -> ToolOutput {
        let Some(query) = args["query"].as_str() else {
            return ToolOutput::error("missing 'query' argument");
        };
        let path = args["path"].as_str().unwrap_or(".");

        let base = match self.sandbox.resolve(path) {
            Ok(p) => p,
            Err(e) => return ToolOutput::error(e),
        };

        let mut hits = Vec::new();
        let walker = WalkBuilder::new(&base).require_git(false).build();
        'files: for entry in walker.flatten() {
            if cancel.is_cancelled() {
                return ToolOutput::error("search cancelled");
            }
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Ok(content) = tokio::fs::read_to_string(entry.path()).await else {
                continue; // binary or unreadable
            };
            let relative = entry
                .path()
                .strip_prefix(&self.sandbox.root)
                .unwrap_or(entry.path());
            for (line_no, line) in content.lines().enumerate() {
                if line.contains(query) {
                    hits.push(format!("{}:{}: {}", relative.display(), line_no + 1, line.trim()));
                    if hits.len() >= MAX_SEARCH_HITS {
                        hits.push("... [truncated]".to_string());
                        break 'files;
                    }
                }
            }
        }

        if hits.is_empty() {
            ToolOutput::ok(format!("no matches for '{}'", query))
        } else {
            ToolOutput::ok(hits.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;
    use tempfile::TempDir;

    fn repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "fn main() {\n    run();\n}\n").unwrap();
        std::fs::write(dir.path().join("README.md"), "# Demo\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_read_file_within_root() {
        let dir = repo();
        let registry = default_registry(dir.path());
        let tool = registry.get_tool("read_file").unwrap();

        let out = tool
            .execute(json!({"path": "src/main.rs"}), &CancellationToken::new())
            .await;
        assert!(out.success);
        assert!(out.content.contains("fn main"));
    }

    #[tokio::test]
    async fn test_read_file_escape_rejected() {
        let dir = repo();
        let registry = default_registry(dir.path());
        let tool = registry.get_tool("read_file").unwrap();

        let out = tool
            .execute(json!({"path": "../../etc/passwd"}), &CancellationToken::new())
            .await;
        assert!(!out.success);
    }

    #[tokio::test]
    async fn test_list_files() {
        let dir = repo();
        let registry = default_registry(dir.path());
        let tool = registry.get_tool("list_files").unwrap();

        let out = tool.execute(json!({}), &CancellationToken::new()).await;
        assert!(out.success);
        assert!(out.content.contains("src/"));
        assert!(out.content.contains("README.md"));
    }

    #[tokio::test]
    async fn test_search_code_finds_line() {
        let dir = repo();
        let registry = default_registry(dir.path());
        let tool = registry.get_tool("search_code").unwrap();

        let out = tool
            .execute(json!({"query": "run()"}), &CancellationToken::new())
            .await;
        assert!(out.success);
        assert!(out.content.contains("src/main.rs:2"));
    }
}
