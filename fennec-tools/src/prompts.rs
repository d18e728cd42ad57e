//! Prompt text for built-in tools and the fixed operational suffix.
//!
//! Tool names appear verbatim in these strings and in agent prompts, so the
//! names are part of the external contract and must stay stable.

/// Operational guidance appended verbatim after the caller's instructions.
///
/// Caller instructions come first so domain guidance takes precedence;
/// these universal operating rules always follow.
pub const BASE_PROMPT_SUFFIX: &str = r#"

You have access to a number of standard tools.

## `write_todos`

Use the `write_todos` tool frequently to plan tasks and to give the user
visibility into your progress. Break larger tasks into smaller steps and
track every step; if you skip planning you may forget important work.
Mark todos as completed as soon as a task is done. Do not batch up
multiple finished tasks before updating their status.

## `task`

Use the `task` tool to delegate bounded sub-tasks to a sub-agent. The
sub-agent works in isolation and only its final result comes back into
this conversation, which keeps your context small. Prefer delegation for
research-heavy work.
"#;

pub const WRITE_TODOS_DESCRIPTION: &str = "\
Replace the entire todo list with a new ordered list of items. \
Each item has `content` and a `status` of pending, in_progress, or completed. \
Every call is a full rewrite: items omitted from the new list are dropped.";

pub const LS_DESCRIPTION: &str = "\
List files. In virtual mode this lists every path in the session's file table; \
with a local filesystem it lists the entries of the given directory.";

pub const READ_FILE_DESCRIPTION: &str = "\
Read a file and return its content with line numbers (cat -n format). \
Use `offset` and `limit` to page through long files; lines longer than \
2000 characters are truncated.";

pub const WRITE_FILE_DESCRIPTION: &str = "\
Write content to a file, creating it if needed and replacing any existing content.";

pub const EDIT_DESCRIPTION: &str = "\
Edit a file by replacing `old_string` with `new_string`. The old string must \
exist in the file and, unless `replace_all` is set, must appear exactly once; \
include surrounding context to disambiguate repeated strings.";

pub const GLOB_DESCRIPTION: &str = "\
Find files whose paths match a glob pattern (for example `*.rs` or `src/**/*.md`). \
Scope the search with `path`, cap output with `max_results`, and disable \
`recursive` to match only direct children.";

pub const GREP_DESCRIPTION: &str = "\
Search for a text pattern inside files. Target either an explicit `files` list \
or a `path` filtered by `file_pattern`. Supports case-insensitive search (the \
default), `regex` mode, and `context_lines` around each match.";

pub const STR_REPLACE_EDIT_DESCRIPTION: &str = "\
Consolidated file editor for the local filesystem. `command` selects the \
operation: `view` shows a file with line numbers, `create` writes a new file, \
`str_replace` replaces a unique string, and `insert` adds text after a given line.";

/// Prefix of the delegation tool's description; the registered sub-agents
/// and their descriptions are appended at compose time.
pub const TASK_DESCRIPTION_PREFIX: &str = "\
Delegate a bounded sub-task to an isolated sub-agent. The sub-agent runs \
with its own instructions and tool subset, shares this session's todo list \
and files, and returns a single result message. Provide `subagent_type` to \
pick a sub-agent and `description` with complete, self-contained task \
instructions; the sub-agent cannot see this conversation or ask follow-up \
questions.

Available sub-agents:
";
