//! System prompt assembly
//!
//! The base prompt is followed by the working directory and, when present,
//! the user's long-term memory file (`~/.deepagents/agent.md`).

use std::path::{Path, PathBuf};

pub const MEMORY_FILE: &str = "agent.md";

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a deep agent: a capable coding and research assistant working in the user's terminal.

## Working style
- Use the available tools to inspect and change the workspace instead of guessing.
- Read a file before editing it. Prefer small, targeted edits with `edit_file`.
- Break multi-step requests into steps and carry them through to completion.
- When a tool call is rejected, do not retry it; ask the user how to proceed.
- Keep answers concise. Summarize what you changed when you finish.

## Tools
- `ls`, `read_file`: inspect the filesystem. Paths are relative to the working directory.
- `write_file`, `edit_file`: modify files. The user may be asked to approve these.
- Tools named `<server>_<tool>` come from MCP servers the user configured."#;

/// `~/.deepagents/agent.md`, if a home directory is known.
pub fn default_memory_path() -> Option<PathBuf> {
    directories::UserDirs::new().map(|dirs| dirs.home_dir().join(".deepagents").join(MEMORY_FILE))
}

/// Read the memory file; missing or blank files yield `None`.
pub fn load_memory(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::debug!(path = %path.display(), "Loaded agent memory");
            Some(text.trim().to_string())
        }
        Ok(_) => None,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Failed to read agent memory");
            None
        }
    }
}

pub fn build_system_prompt(working_dir: &Path, memory: Option<&str>) -> String {
    let mut prompt = format!(
        "{DEFAULT_SYSTEM_PROMPT}\n\nCurrent working directory: {}",
        working_dir.display()
    );
    if let Some(memory) = memory {
        prompt.push_str("\n\n## Long-term memory\nNotes the user asked you to remember across sessions:\n\n");
        prompt.push_str(memory);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_working_dir_and_memory() {
        let prompt = build_system_prompt(Path::new("/work/project"), Some("Prefer tabs."));
        assert!(prompt.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(prompt.contains("Current working directory: /work/project"));
        assert!(prompt.ends_with("Prefer tabs."));

        let bare = build_system_prompt(Path::new("/work"), None);
        assert!(!bare.contains("Long-term memory"));
    }

    #[test]
    fn memory_file_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MEMORY_FILE);
        assert_eq!(load_memory(&path), None);

        std::fs::write(&path, "\n\n").unwrap();
        assert_eq!(load_memory(&path), None);

        std::fs::write(&path, "  User likes Rust.\n").unwrap();
        assert_eq!(load_memory(&path).as_deref(), Some("User likes Rust."));
    }
}
