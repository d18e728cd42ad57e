//! Virtual filesystem backend over the session state's file table
//!
//! Fully deterministic: every operation reads and writes the shared state,
//! never the host. Keys are plain strings; a `/` in a key is only honored by
//! the prefix filters of glob and grep, there is no directory tree.

use super::{
    compile_glob, file_not_found, number_lines, render_glob, render_grep, replace_in_content,
    FsBackend, GlobRequest, GrepRequest,
};
use async_trait::async_trait;
use fennec_core::{DeepState, Shared, ToolError};
use std::collections::BTreeSet;

/// Backend reading and writing the state file table
pub struct StateFs<S: DeepState> {
    state: Shared<S>,
}

impl<S: DeepState> StateFs<S> {
    pub fn new(state: Shared<S>) -> Self {
        Self { state }
    }
}

/// Normalize a search path: "." and trailing slashes mean no prefix filter
fn search_prefix(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed == "." {
        ""
    } else {
        trimmed
    }
}

/// Key remainder after the prefix, with a leading slash stripped
fn relative_key<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(key);
    }
    key.strip_prefix(prefix)
        .map(|rest| rest.strip_prefix('/').unwrap_or(rest))
}

#[async_trait]
impl<S: DeepState> FsBackend for StateFs<S> {
    async fn ls(&self, _path: &str) -> Result<Vec<String>, ToolError> {
        // Virtual mode lists the whole table; keys have no directory semantics.
        let state = self.state.read().await;
        Ok(state.files().keys().cloned().collect())
    }

    async fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, ToolError> {
        let state = self.state.read().await;
        let content = state.files().get(path).ok_or_else(|| file_not_found(path))?;
        number_lines(content, offset, limit)
    }

    async fn write(&self, path: &str, content: &str) -> Result<String, ToolError> {
        let mut state = self.state.write().await;
        state.files_mut().insert(path.to_string(), content.to_string());
        Ok(format!("Updated file '{path}'"))
    }

    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> Result<String, ToolError> {
        let mut state = self.state.write().await;
        let content = state.files().get(path).ok_or_else(|| file_not_found(path))?;
        let (updated, message) = replace_in_content(content, path, old, new, replace_all)?;
        state.files_mut().insert(path.to_string(), updated);
        Ok(message)
    }

    async fn glob(&self, req: &GlobRequest) -> Result<String, ToolError> {
        let matcher = compile_glob(&req.pattern)?;
        let state = self.state.read().await;
        if state.files().is_empty() {
            return Ok("No files available in the virtual filesystem".to_string());
        }

        let prefix = search_prefix(&req.path);
        let mut candidates: Vec<String> = Vec::new();
        for key in state.files().keys() {
            let Some(relative) = relative_key(key, prefix) else {
                continue;
            };
            if !req.recursive && relative.contains('/') {
                continue;
            }
            candidates.push(key.clone());
        }

        // Directory "entries" only exist as key prefixes in virtual mode.
        let mut dirs: BTreeSet<String> = BTreeSet::new();
        if req.include_dirs {
            for key in &candidates {
                let parts: Vec<&str> = key.split('/').collect();
                for i in 1..parts.len() {
                    let dir = parts[..i].join("/");
                    if relative_key(&dir, prefix).is_some() {
                        dirs.insert(format!("{dir}/"));
                    }
                }
            }
        }
        candidates.extend(dirs);

        let mut results: Vec<String> = Vec::new();
        for key in candidates {
            if results.len() >= req.max_results {
                break;
            }
            let Some(relative) = relative_key(&key, prefix) else {
                continue;
            };
            let name_match = req.recursive
                && relative
                    .rsplit('/')
                    .next()
                    .is_some_and(|name| matcher.is_match(name));
            if matcher.is_match(relative) || name_match {
                results.push(key);
            }
        }

        Ok(render_glob(results, req))
    }

    async fn grep(&self, req: &GrepRequest) -> Result<String, ToolError> {
        let state = self.state.read().await;
        if state.files().is_empty() {
            return Ok("No files available in the virtual filesystem".to_string());
        }

        let mut sources: Vec<(String, String)> = Vec::new();
        if let Some(files) = &req.files {
            for path in files {
                let content = state
                    .files()
                    .get(path)
                    .ok_or_else(|| file_not_found(path))?;
                sources.push((path.clone(), content.clone()));
            }
        } else if let Some(path) = &req.path {
            let matcher = compile_glob(&req.file_pattern)?;
            let prefix = search_prefix(path);
            for (key, content) in state.files() {
                let Some(relative) = relative_key(key, prefix) else {
                    continue;
                };
                if !req.recursive && relative.contains('/') {
                    continue;
                }
                let name = key.rsplit('/').next().unwrap_or(key);
                if matcher.is_match(name) {
                    sources.push((key.clone(), content.clone()));
                }
            }
        }

        if sources.is_empty() {
            return Ok("No files found to search".to_string());
        }
        render_grep(&sources, req)
    }
}
