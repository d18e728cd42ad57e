//! Filesystem backend abstraction and the built-in filesystem tools
//!
//! Two interchangeable backends expose one operation contract: [`StateFs`]
//! over the session state's file table (deterministic, no I/O) and
//! [`LocalFs`] over the host filesystem. The tool wrappers and all result
//! formatting are shared, so for the same operations and equivalent paths
//! both backends produce byte-identical observable results.

mod local_fs;
mod state_fs;

pub use local_fs::{LocalFs, StrReplaceEditTool};
pub use state_fs::StateFs;

use crate::prompts;
use crate::schema::SchemaBuilder;
use crate::tool::ToolHandler;
use async_trait::async_trait;
use fennec_core::{ToolDef, ToolError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const MAX_LINE_CHARS: usize = 2000;
const DEFAULT_READ_LIMIT: usize = 2000;

fn default_read_limit() -> usize {
    DEFAULT_READ_LIMIT
}

fn default_path() -> String {
    ".".to_string()
}

fn default_glob_max_results() -> usize {
    100
}

fn default_grep_max_results() -> usize {
    50
}

fn default_file_pattern() -> String {
    "*".to_string()
}

fn default_true() -> bool {
    true
}

/// Parameters for a glob search
#[derive(Clone, Debug, Deserialize)]
pub struct GlobRequest {
    /// Glob pattern to match
    pub pattern: String,
    /// Directory (or key prefix, in virtual mode) to search under
    #[serde(default = "default_path")]
    pub path: String,
    /// Cap on returned matches
    #[serde(default = "default_glob_max_results")]
    pub max_results: usize,
    /// Whether to report directories as well as files
    #[serde(default)]
    pub include_dirs: bool,
    /// Whether to descend into subdirectories
    #[serde(default = "default_true")]
    pub recursive: bool,
}

/// Parameters for a content search
#[derive(Clone, Debug, Deserialize)]
pub struct GrepRequest {
    /// Pattern to search for (fixed string unless `regex`)
    pub pattern: String,
    /// Explicit files to search; mutually preferred over `path`
    #[serde(default)]
    pub files: Option<Vec<String>>,
    /// Directory (or key prefix) to search under when `files` is absent
    #[serde(default)]
    pub path: Option<String>,
    /// Filename pattern filter applied under `path`
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    /// Cap on total matches
    #[serde(default = "default_grep_max_results")]
    pub max_results: usize,
    /// Case-sensitive matching (default insensitive)
    #[serde(default)]
    pub case_sensitive: bool,
    /// Lines of context around each match
    #[serde(default)]
    pub context_lines: usize,
    /// Treat `pattern` as a regular expression
    #[serde(default)]
    pub regex: bool,
    /// Whether to descend into subdirectories
    #[serde(default = "default_true")]
    pub recursive: bool,
}

/// Operation contract both backends implement.
///
/// Errors carry the same message text across backends so prompts never need
/// to branch by mode.
#[async_trait]
pub trait FsBackend: Send + Sync {
    /// List entries: all file-table keys in virtual mode, directory entries locally
    async fn ls(&self, path: &str) -> Result<Vec<String>, ToolError>;

    /// Read a file as numbered lines
    async fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, ToolError>;

    /// Write full content to a path
    async fn write(&self, path: &str, content: &str) -> Result<String, ToolError>;

    /// Replace `old` with `new` in a file
    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> Result<String, ToolError>;

    /// Find paths by name pattern
    async fn glob(&self, req: &GlobRequest) -> Result<String, ToolError>;

    /// Find content by pattern
    async fn grep(&self, req: &GrepRequest) -> Result<String, ToolError>;
}

// ---------------------------------------------------------------------------
// Shared formatting and edit semantics
// ---------------------------------------------------------------------------

pub(crate) fn file_not_found(path: &str) -> ToolError {
    ToolError::execution_failed(format!("File '{path}' not found"))
}

/// Render content as numbered lines (cat -n format) honoring offset/limit
pub(crate) fn number_lines(content: &str, offset: usize, limit: usize) -> Result<String, ToolError> {
    if content.trim().is_empty() {
        return Ok("System reminder: File exists but has empty contents".to_string());
    }

    let lines: Vec<&str> = content.lines().collect();
    if offset >= lines.len() {
        return Err(ToolError::execution_failed(format!(
            "Line offset {offset} exceeds file length ({} lines)",
            lines.len()
        )));
    }

    let end = (offset + limit).min(lines.len());
    let rendered: Vec<String> = lines[offset..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            // The cap counts characters, not bytes, so multibyte lines are
            // not truncated early.
            let line = match line.char_indices().nth(MAX_LINE_CHARS) {
                Some((cut, _)) => &line[..cut],
                None => line,
            };
            format!("{:6}\t{line}", offset + i + 1)
        })
        .collect();

    Ok(rendered.join("\n"))
}

/// Apply the search/replace edit semantics to content.
///
/// Returns the new content and the confirmation message. The old string must
/// be present and, without `replace_all`, unique.
pub(crate) fn replace_in_content(
    content: &str,
    path: &str,
    old: &str,
    new: &str,
    replace_all: bool,
) -> Result<(String, String), ToolError> {
    let occurrences = content.matches(old).count();
    if occurrences == 0 {
        return Err(ToolError::execution_failed(format!(
            "String not found in file: '{old}'"
        )));
    }

    if replace_all {
        let updated = content.replace(old, new);
        let message =
            format!("Successfully replaced {occurrences} instance(s) of the string in '{path}'");
        Ok((updated, message))
    } else {
        if occurrences > 1 {
            return Err(ToolError::execution_failed(format!(
                "String '{old}' appears {occurrences} times in file. Use replace_all=true to \
                 replace all instances, or provide a more specific string with surrounding context"
            )));
        }
        let updated = content.replacen(old, new, 1);
        let message = format!("Successfully replaced string in '{path}'");
        Ok((updated, message))
    }
}

/// Render a sorted glob result list with the shared header
pub(crate) fn render_glob(mut results: Vec<String>, req: &GlobRequest) -> String {
    results.sort();
    if results.is_empty() {
        let search_type = if req.recursive { "recursive" } else { "non-recursive" };
        let dirs_note = if req.include_dirs { " (including directories)" } else { "" };
        return format!(
            "No matches found for pattern '{}' at '{}' ({search_type} search{dirs_note})",
            req.pattern, req.path
        );
    }

    let mut header = format!("Found {} matches for pattern '{}'", results.len(), req.pattern);
    if results.len() >= req.max_results {
        header.push_str(&format!(" (limited to {} results)", req.max_results));
    }
    header.push_str(":\n\n");
    header + &results.join("\n")
}

/// Compile the grep matcher: fixed string unless regex mode
pub(crate) fn grep_matcher(req: &GrepRequest) -> Result<regex::Regex, ToolError> {
    let pattern = if req.regex {
        req.pattern.clone()
    } else {
        regex::escape(&req.pattern)
    };
    regex::RegexBuilder::new(&pattern)
        .case_insensitive(!req.case_sensitive)
        .build()
        .map_err(|e| ToolError::execution_failed(format!("Invalid regex pattern: {e}")))
}

/// Search (path, content) sources and render grouped per-file matches.
///
/// Sources must already be resolved by the backend (explicit files, or a
/// path scan filtered by `file_pattern`).
pub(crate) fn render_grep(
    sources: &[(String, String)],
    req: &GrepRequest,
) -> Result<String, ToolError> {
    let matcher = grep_matcher(req)?;
    let mut results: Vec<String> = Vec::new();
    let mut total_matches = 0usize;

    for (path, content) in sources {
        if total_matches >= req.max_results {
            break;
        }
        let lines: Vec<&str> = content.lines().collect();
        let mut file_lines: Vec<String> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if !matcher.is_match(line) {
                continue;
            }
            let line_num = idx + 1;

            if req.context_lines > 0 {
                let start = idx.saturating_sub(req.context_lines);
                let end = (idx + req.context_lines + 1).min(lines.len());
                for ctx in start..end {
                    let prefix = if ctx == idx { ">" } else { " " };
                    file_lines.push(format!("{prefix} {:4}: {}", ctx + 1, lines[ctx]));
                }
                file_lines.push(String::new());
            } else {
                file_lines.push(format!("  {line_num:4}: {line}"));
            }

            total_matches += 1;
            if total_matches >= req.max_results {
                break;
            }
        }

        if !file_lines.is_empty() {
            results.push(format!("{path}\n{}", file_lines.join("\n")));
        }
    }

    if results.is_empty() {
        let pattern_desc = if req.regex {
            format!("regex pattern '{}'", req.pattern)
        } else {
            format!("text '{}'", req.pattern)
        };
        let case_desc = if req.case_sensitive {
            " (case-sensitive)"
        } else {
            " (case-insensitive)"
        };
        return Ok(format!("No matches found for {pattern_desc}{case_desc}"));
    }

    let mut header = format!("Found matches in {} files", results.len());
    if total_matches >= req.max_results {
        header.push_str(&format!(" (limited to {} total matches)", req.max_results));
    }
    header.push_str(":\n");
    Ok(header + "\n" + &results.join("\n\n"))
}

/// Compile a glob pattern into a matcher
pub(crate) fn compile_glob(pattern: &str) -> Result<globset::GlobMatcher, ToolError> {
    globset::Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| ToolError::execution_failed(format!("Invalid glob pattern: {e}")))
}

// ---------------------------------------------------------------------------
// Tool wrappers over a backend
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LsParams {
    #[serde(default = "default_path")]
    path: String,
}

/// The `ls` built-in
pub struct LsTool {
    backend: Arc<dyn FsBackend>,
}

impl LsTool {
    pub fn new(backend: Arc<dyn FsBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for LsTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "ls".to_string(),
            description: prompts::LS_DESCRIPTION.to_string(),
            input_schema: SchemaBuilder::new()
                .string("path", "Directory to list (defaults to '.')")
                .build(),
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let params: LsParams = parse_args("ls", args)?;
        let entries = self.backend.ls(&params.path).await?;
        serde_json::to_value(entries)
            .map_err(|e| ToolError::execution_failed(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ReadParams {
    file_path: String,
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_read_limit")]
    limit: usize,
}

/// The `read_file` built-in
pub struct ReadFileTool {
    backend: Arc<dyn FsBackend>,
}

impl ReadFileTool {
    pub fn new(backend: Arc<dyn FsBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for ReadFileTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "read_file".to_string(),
            description: prompts::READ_FILE_DESCRIPTION.to_string(),
            input_schema: SchemaBuilder::new()
                .string("file_path", "Path of the file to read")
                .integer("offset", "Line offset to start reading from")
                .integer("limit", "Maximum number of lines to return")
                .required("file_path")
                .build(),
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let params: ReadParams = parse_args("read_file", args)?;
        let content = self
            .backend
            .read(&params.file_path, params.offset, params.limit)
            .await?;
        Ok(Value::String(content))
    }
}

#[derive(Deserialize)]
struct WriteParams {
    file_path: String,
    content: String,
}

/// The `write_file` built-in
pub struct WriteFileTool {
    backend: Arc<dyn FsBackend>,
}

impl WriteFileTool {
    pub fn new(backend: Arc<dyn FsBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for WriteFileTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "write_file".to_string(),
            description: prompts::WRITE_FILE_DESCRIPTION.to_string(),
            input_schema: SchemaBuilder::new()
                .string("file_path", "Path of the file to write")
                .string("content", "Full content to store")
                .required("file_path")
                .required("content")
                .build(),
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let params: WriteParams = parse_args("write_file", args)?;
        let message = self.backend.write(&params.file_path, &params.content).await?;
        Ok(Value::String(message))
    }
}

#[derive(Deserialize)]
struct EditParams {
    file_path: String,
    old_string: String,
    new_string: String,
    #[serde(default)]
    replace_all: bool,
}

/// The `edit_file` built-in
pub struct EditFileTool {
    backend: Arc<dyn FsBackend>,
}

impl EditFileTool {
    pub fn new(backend: Arc<dyn FsBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for EditFileTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "edit_file".to_string(),
            description: prompts::EDIT_DESCRIPTION.to_string(),
            input_schema: SchemaBuilder::new()
                .string("file_path", "Path of the file to edit")
                .string("old_string", "Existing text to replace")
                .string("new_string", "Replacement text")
                .boolean("replace_all", "Replace every occurrence instead of requiring uniqueness")
                .required("file_path")
                .required("old_string")
                .required("new_string")
                .build(),
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let params: EditParams = parse_args("edit_file", args)?;
        let message = self
            .backend
            .edit(
                &params.file_path,
                &params.old_string,
                &params.new_string,
                params.replace_all,
            )
            .await?;
        Ok(Value::String(message))
    }
}

/// The `glob` built-in
pub struct GlobTool {
    backend: Arc<dyn FsBackend>,
}

impl GlobTool {
    pub fn new(backend: Arc<dyn FsBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for GlobTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "glob".to_string(),
            description: prompts::GLOB_DESCRIPTION.to_string(),
            input_schema: SchemaBuilder::new()
                .string("pattern", "Glob pattern to match")
                .string("path", "Directory to search under (defaults to '.')")
                .integer("max_results", "Cap on returned matches")
                .boolean("include_dirs", "Also report directories")
                .boolean("recursive", "Descend into subdirectories (default true)")
                .required("pattern")
                .build(),
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let req: GlobRequest = parse_args("glob", args)?;
        let result = self.backend.glob(&req).await?;
        Ok(Value::String(result))
    }
}

/// The `grep` built-in
pub struct GrepTool {
    backend: Arc<dyn FsBackend>,
}

impl GrepTool {
    pub fn new(backend: Arc<dyn FsBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for GrepTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "grep".to_string(),
            description: prompts::GREP_DESCRIPTION.to_string(),
            input_schema: SchemaBuilder::new()
                .string("pattern", "Pattern to search for")
                .property(
                    "files",
                    json!({
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Explicit files to search"
                    }),
                )
                .string("path", "Directory to search under when files is absent")
                .string("file_pattern", "Filename filter applied under path")
                .integer("max_results", "Cap on total matches")
                .boolean("case_sensitive", "Match case exactly (default false)")
                .integer("context_lines", "Lines of context around each match")
                .boolean("regex", "Treat pattern as a regular expression")
                .boolean("recursive", "Descend into subdirectories (default true)")
                .required("pattern")
                .build(),
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let req: GrepRequest = parse_args("grep", args)?;
        if req.files.is_none() && req.path.is_none() {
            return Err(ToolError::invalid_arguments(
                "grep",
                "Must provide either 'files' or 'path'",
            ));
        }
        let result = self.backend.grep(&req).await?;
        Ok(Value::String(result))
    }
}

pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(
    tool: &str,
    args: Value,
) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::invalid_arguments(tool, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_lines_formats_cat_n() {
        let out = number_lines("alpha\nbeta\ngamma", 0, 2000).unwrap();
        assert_eq!(out, "     1\talpha\n     2\tbeta\n     3\tgamma");
    }

    #[test]
    fn number_lines_pages_with_offset() {
        let out = number_lines("a\nb\nc\nd", 2, 1).unwrap();
        assert_eq!(out, "     3\tc");
    }

    #[test]
    fn number_lines_empty_file_reminder() {
        let out = number_lines("  \n", 0, 10).unwrap();
        assert!(out.starts_with("System reminder"));
    }

    #[test]
    fn number_lines_caps_lines_at_2000_chars() {
        let long = "x".repeat(2500);
        let out = number_lines(&long, 0, 10).unwrap();
        let rendered = out.split('\t').nth(1).unwrap();
        assert_eq!(rendered.chars().count(), MAX_LINE_CHARS);
    }

    #[test]
    fn number_lines_counts_chars_not_bytes() {
        // 1500 two-byte chars exceed the cap in bytes but not in chars, so
        // the line must come through whole.
        let line = "é".repeat(1500);
        let out = number_lines(&line, 0, 10).unwrap();
        let rendered = out.split('\t').nth(1).unwrap();
        assert_eq!(rendered.chars().count(), 1500);
        assert_eq!(rendered, line);

        // Past the cap, the cut lands on a char boundary at exactly 2000 chars.
        let long = "é".repeat(2500);
        let out = number_lines(&long, 0, 10).unwrap();
        let rendered = out.split('\t').nth(1).unwrap();
        assert_eq!(rendered, "é".repeat(2000));
    }

    #[test]
    fn number_lines_offset_past_end() {
        let err = number_lines("one line", 5, 10).unwrap_err();
        assert!(err.to_string().contains("exceeds file length (1 lines)"));
    }

    #[test]
    fn replace_requires_presence_and_uniqueness() {
        let err = replace_in_content("abc", "f.txt", "zzz", "x", false).unwrap_err();
        assert!(err.to_string().contains("String not found"));

        let err = replace_in_content("aa aa", "f.txt", "aa", "x", false).unwrap_err();
        assert!(err.to_string().contains("appears 2 times"));

        let (content, msg) = replace_in_content("aa aa", "f.txt", "aa", "x", true).unwrap();
        assert_eq!(content, "x x");
        assert!(msg.contains("2 instance(s)"));

        let (content, msg) = replace_in_content("hello world", "f.txt", "world", "rust", false)
            .unwrap();
        assert_eq!(content, "hello rust");
        assert!(msg.contains("Successfully replaced string"));
    }

    #[test]
    fn grep_matcher_escapes_fixed_strings() {
        let req = GrepRequest {
            pattern: "a.b".to_string(),
            files: None,
            path: Some(".".to_string()),
            file_pattern: "*".to_string(),
            max_results: 50,
            case_sensitive: false,
            context_lines: 0,
            regex: false,
            recursive: true,
        };
        let matcher = grep_matcher(&req).unwrap();
        assert!(matcher.is_match("a.b"));
        assert!(!matcher.is_match("axb"));
        assert!(matcher.is_match("A.B"));
    }
}
