//! Local filesystem backend: real I/O against the host environment
//!
//! Trades the virtual backend's reproducibility for the ability to work on
//! an actual project tree. Result formatting is shared with the virtual
//! backend so observable output does not depend on the mode.

use super::{
    compile_glob, file_not_found, number_lines, parse_args, render_glob, render_grep,
    replace_in_content, FsBackend, GlobRequest, GrepRequest,
};
use crate::prompts;
use crate::schema::SchemaBuilder;
use crate::tool::ToolHandler;
use async_trait::async_trait;
use fennec_core::{ToolDef, ToolError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Backend performing real filesystem I/O
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

fn read_to_string(path: &Path) -> Result<String, ToolError> {
    if !path.exists() {
        return Err(file_not_found(&path.display().to_string()));
    }
    if !path.is_file() {
        return Err(ToolError::execution_failed(format!(
            "'{}' is not a file",
            path.display()
        )));
    }
    match std::fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => Err(ToolError::execution_failed(format!(
            "Error reading file: {e}"
        ))),
    }
}

fn write_string(path: &Path, content: &str) -> Result<(), ToolError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolError::execution_failed(format!("Error writing file: {e}")))?;
        }
    }
    std::fs::write(path, content)
        .map_err(|e| ToolError::execution_failed(format!("Error writing file: {e}")))
}

/// Collect files (and optionally directories) under `base`
fn walk(
    base: &Path,
    recursive: bool,
    include_dirs: bool,
    out: &mut Vec<PathBuf>,
) -> Result<(), ToolError> {
    let entries = std::fs::read_dir(base)
        .map_err(|e| ToolError::execution_failed(format!("Error listing directory: {e}")))?;
    for entry in entries {
        let entry =
            entry.map_err(|e| ToolError::execution_failed(format!("Error listing directory: {e}")))?;
        let path = entry.path();
        if path.is_dir() {
            if include_dirs {
                out.push(path.clone());
            }
            if recursive {
                walk(&path, recursive, include_dirs, out)?;
            }
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn require_dir(path: &Path) -> Result<(), ToolError> {
    if !path.exists() {
        return Err(ToolError::execution_failed(format!(
            "Path '{}' does not exist",
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(ToolError::execution_failed(format!(
            "Path '{}' is not a directory",
            path.display()
        )));
    }
    Ok(())
}

#[async_trait]
impl FsBackend for LocalFs {
    async fn ls(&self, path: &str) -> Result<Vec<String>, ToolError> {
        let dir = Path::new(path);
        require_dir(dir)?;
        let entries = std::fs::read_dir(dir)
            .map_err(|e| ToolError::execution_failed(format!("Error listing directory: {e}")))?;
        let mut names: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| ToolError::execution_failed(format!("Error listing directory: {e}")))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, ToolError> {
        let content = read_to_string(Path::new(path))?;
        number_lines(&content, offset, limit)
    }

    async fn write(&self, path: &str, content: &str) -> Result<String, ToolError> {
        write_string(Path::new(path), content)?;
        Ok(format!("Updated file '{path}'"))
    }

    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> Result<String, ToolError> {
        let file = Path::new(path);
        let content = read_to_string(file)?;
        let (updated, message) = replace_in_content(&content, path, old, new, replace_all)?;
        write_string(file, &updated)?;
        Ok(message)
    }

    async fn glob(&self, req: &GlobRequest) -> Result<String, ToolError> {
        let matcher = compile_glob(&req.pattern)?;
        let base = Path::new(&req.path);
        require_dir(base)?;

        let mut paths: Vec<PathBuf> = Vec::new();
        walk(base, req.recursive, req.include_dirs, &mut paths)?;

        let mut results: Vec<String> = Vec::new();
        for path in paths {
            if results.len() >= req.max_results {
                break;
            }
            let relative = path.strip_prefix(base).unwrap_or(&path);
            let relative = relative.to_string_lossy();
            let name_match = req.recursive
                && relative
                    .rsplit('/')
                    .next()
                    .is_some_and(|name| matcher.is_match(name));
            if matcher.is_match(relative.as_ref()) || name_match {
                if path.is_dir() {
                    results.push(format!("{}/", path.display()));
                } else {
                    results.push(path.display().to_string());
                }
            }
        }

        Ok(render_glob(results, req))
    }

    async fn grep(&self, req: &GrepRequest) -> Result<String, ToolError> {
        let mut sources: Vec<(String, String)> = Vec::new();

        if let Some(files) = &req.files {
            for path in files {
                let content = read_to_string(Path::new(path))?;
                sources.push((path.clone(), content));
            }
        } else if let Some(path) = &req.path {
            let base = Path::new(path);
            require_dir(base)?;
            let matcher = compile_glob(&req.file_pattern)?;

            let mut paths: Vec<PathBuf> = Vec::new();
            walk(base, req.recursive, false, &mut paths)?;
            paths.sort();
            for file in paths {
                let matches = file
                    .file_name()
                    .map(|n| matcher.is_match(n.to_string_lossy().as_ref()))
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
                // Binary files are skipped rather than reported.
                if let Ok(bytes) = std::fs::read(&file) {
                    if let Ok(content) = String::from_utf8(bytes) {
                        sources.push((file.display().to_string(), content));
                    }
                }
            }
        }

        if sources.is_empty() {
            return Ok("No files found to search".to_string());
        }
        render_grep(&sources, req)
    }
}

// ---------------------------------------------------------------------------
// Consolidated editor (local mode only)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct StrReplaceParams {
    command: String,
    path: String,
    #[serde(default)]
    file_text: Option<String>,
    #[serde(default)]
    old_str: Option<String>,
    #[serde(default)]
    new_str: Option<String>,
    #[serde(default)]
    insert_line: Option<usize>,
    #[serde(default)]
    view_range: Option<(usize, usize)>,
}

/// The `str_replace_based_edit_tool` built-in.
///
/// Folds view/create/replace/insert into one tool so local-mode agents edit
/// files through a single consolidated surface. Only registered when the
/// composer selects the local backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrReplaceEditTool;

impl StrReplaceEditTool {
    pub fn new() -> Self {
        Self
    }

    fn view(&self, params: &StrReplaceParams) -> Result<String, ToolError> {
        let path = Path::new(&params.path);
        if path.is_dir() {
            let mut names: Vec<String> = std::fs::read_dir(path)
                .map_err(|e| ToolError::execution_failed(format!("Error listing directory: {e}")))?
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            return Ok(names.join("\n"));
        }

        let content = read_to_string(path)?;
        match params.view_range {
            Some((start, end)) => {
                let offset = start.saturating_sub(1);
                let limit = end.saturating_sub(offset);
                number_lines(&content, offset, limit)
            }
            None => number_lines(&content, 0, usize::MAX),
        }
    }

    fn create(&self, params: &StrReplaceParams) -> Result<String, ToolError> {
        let text = params.file_text.as_deref().ok_or_else(|| {
            ToolError::invalid_arguments("str_replace_based_edit_tool", "'create' requires file_text")
        })?;
        write_string(Path::new(&params.path), text)?;
        Ok(format!("Created file '{}'", params.path))
    }

    fn str_replace(&self, params: &StrReplaceParams) -> Result<String, ToolError> {
        let old = params.old_str.as_deref().ok_or_else(|| {
            ToolError::invalid_arguments(
                "str_replace_based_edit_tool",
                "'str_replace' requires old_str",
            )
        })?;
        let new = params.new_str.as_deref().unwrap_or("");
        let path = Path::new(&params.path);
        let content = read_to_string(path)?;
        let (updated, message) = replace_in_content(&content, &params.path, old, new, false)?;
        write_string(path, &updated)?;
        Ok(message)
    }

    fn insert(&self, params: &StrReplaceParams) -> Result<String, ToolError> {
        let line = params.insert_line.ok_or_else(|| {
            ToolError::invalid_arguments(
                "str_replace_based_edit_tool",
                "'insert' requires insert_line",
            )
        })?;
        let new = params.new_str.as_deref().ok_or_else(|| {
            ToolError::invalid_arguments("str_replace_based_edit_tool", "'insert' requires new_str")
        })?;

        let path = Path::new(&params.path);
        let content = read_to_string(path)?;
        let mut lines: Vec<&str> = content.lines().collect();
        if line > lines.len() {
            return Err(ToolError::execution_failed(format!(
                "Insert line {line} exceeds file length ({} lines)",
                lines.len()
            )));
        }
        lines.insert(line, new);
        write_string(path, &(lines.join("\n") + "\n"))?;
        Ok(format!("Inserted text after line {line} in '{}'", params.path))
    }
}

#[async_trait]
impl ToolHandler for StrReplaceEditTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "str_replace_based_edit_tool".to_string(),
            description: prompts::STR_REPLACE_EDIT_DESCRIPTION.to_string(),
            input_schema: SchemaBuilder::new()
                .property(
                    "command",
                    json!({
                        "type": "string",
                        "enum": ["view", "create", "str_replace", "insert"],
                        "description": "Operation to perform"
                    }),
                )
                .string("path", "File or directory to operate on")
                .string("file_text", "Content for 'create'")
                .string("old_str", "Existing unique text for 'str_replace'")
                .string("new_str", "Replacement or inserted text")
                .integer("insert_line", "Line after which to insert for 'insert'")
                .property(
                    "view_range",
                    json!({
                        "type": "array",
                        "items": {"type": "integer"},
                        "description": "Inclusive [start, end] line range for 'view'"
                    }),
                )
                .required("command")
                .required("path")
                .build(),
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let params: StrReplaceParams = parse_args("str_replace_based_edit_tool", args)?;
        let out = match params.command.as_str() {
            "view" => self.view(&params)?,
            "create" => self.create(&params)?,
            "str_replace" => self.str_replace(&params)?,
            "insert" => self.insert(&params)?,
            other => {
                return Err(ToolError::invalid_arguments(
                    "str_replace_based_edit_tool",
                    format!("Unknown command '{other}'"),
                ))
            }
        };
        Ok(Value::String(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_file(dir: &TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("notes.md").display().to_string();

        let fs = LocalFs::new();
        fs.write(&path, "line one\nline two").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line one\nline two");

        let rendered = fs.read(&path, 0, 2000).await.unwrap();
        assert_eq!(rendered, "     1\tline one\n     2\tline two");
    }

    #[tokio::test]
    async fn read_missing_file_matches_virtual_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.md").display().to_string();
        let err = LocalFs::new().read(&path, 0, 2000).await.unwrap_err();
        assert!(err.to_string().contains(&format!("File '{path}' not found")));
    }

    #[tokio::test]
    async fn ls_sorts_entries() {
        let dir = TempDir::new().unwrap();
        temp_file(&dir, "b.txt", "");
        temp_file(&dir, "a.txt", "");
        let entries = LocalFs::new().ls(&dir.path().display().to_string()).await.unwrap();
        assert_eq!(entries, ["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn edit_enforces_uniqueness() {
        let dir = TempDir::new().unwrap();
        let path = temp_file(&dir, "f.txt", "old old");
        let fs = LocalFs::new();

        let err = fs.edit(&path, "old", "new", false).await.unwrap_err();
        assert!(err.to_string().contains("appears 2 times"));

        fs.edit(&path, "old", "new", true).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new new");
    }

    #[tokio::test]
    async fn glob_and_grep_walk_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.rs"), "fn alpha() {}").unwrap();
        std::fs::write(dir.path().join("top.md"), "alpha notes").unwrap();

        let fs = LocalFs::new();
        let glob = fs
            .glob(&GlobRequest {
                pattern: "*.rs".to_string(),
                path: dir.path().display().to_string(),
                max_results: 100,
                include_dirs: false,
                recursive: true,
            })
            .await
            .unwrap();
        assert!(glob.starts_with("Found 1 matches"));
        assert!(glob.contains("a.rs"));

        let grep = fs
            .grep(&GrepRequest {
                pattern: "ALPHA".to_string(),
                files: None,
                path: Some(dir.path().display().to_string()),
                file_pattern: "*".to_string(),
                max_results: 50,
                case_sensitive: false,
                context_lines: 0,
                regex: false,
                recursive: true,
            })
            .await
            .unwrap();
        assert!(grep.starts_with("Found matches in 2 files"));
    }

    #[tokio::test]
    async fn editor_commands() {
        let dir = TempDir::new().unwrap();
        let path = temp_file(&dir, "f.txt", "one\ntwo\nthree");
        let tool = StrReplaceEditTool::new();

        let view = tool
            .call(serde_json::json!({"command": "view", "path": path}))
            .await
            .unwrap();
        assert!(view.as_str().unwrap().contains("     2\ttwo"));

        tool.call(serde_json::json!({
            "command": "str_replace", "path": path, "old_str": "two", "new_str": "2"
        }))
        .await
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\n2\nthree");

        tool.call(serde_json::json!({
            "command": "insert", "path": path, "insert_line": 1, "new_str": "1.5"
        }))
        .await
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\n1.5\n2\nthree\n");

        let created = dir.path().join("new.txt").display().to_string();
        tool.call(serde_json::json!({
            "command": "create", "path": created, "file_text": "fresh"
        }))
        .await
        .unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("new.txt")).unwrap(), "fresh");
    }
}
