//! Environment Preamble
//!
//! Builds the environment block prepended to the system message when an
//! agent runs with `with_env`: current date, OS, working directory, and a
//! gitignore-aware top-level listing of the repository. Best-effort; a
//! listing failure degrades to an empty section rather than failing the run.

use std::path::Path;

use chrono::Utc;
use ignore::WalkBuilder;
use tracing::debug;

use crate::constants::agent::MAX_ENV_LISTING_ENTRIES;

/// Render the environment preamble for a repository root
pub fn build_preamble(repo_root: &Path) -> String {
    let mut listing = top_level_listing(repo_root);
    listing.sort();
    listing.truncate(MAX_ENV_LISTING_ENTRIES);

    let entries = if listing.is_empty() {
        "(empty or unreadable)".to_string()
    } else {
        listing.join("\n")
    };

    format!(
        "## Environment\n\
         Date: {}\n\
         OS: {}\n\
         Working directory: {}\n\
         \n\
         Top-level contents:\n{}\n",
        Utc::now().format("%Y-%m-%d"),
        std::env::consts::OS,
        repo_root.display(),
        entries
    )
}

/// Gitignore-aware listing of the repository's top level
fn top_level_listing(repo_root: &Path) -> Vec<String> {
    // Ignore rules apply even when the checkout is not a git repository
    let walker = WalkBuilder::new(repo_root)
        .max_depth(Some(1))
        .hidden(true)
        .require_git(false)
        .build();

    let mut entries = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        if path == repo_root {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        entries.push(if is_dir {
            format!("{}/", name)
        } else {
            name.to_string()
        });
    }

    debug!("Environment listing: {} entries", entries.len());
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_preamble_lists_top_level() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();

        let preamble = build_preamble(dir.path());
        assert!(preamble.contains("Cargo.toml"));
        assert!(preamble.contains("src/"));
        assert!(preamble.contains("## Environment"));
    }

    #[test]
    fn test_preamble_on_missing_dir() {
        let preamble = build_preamble(Path::new("/definitely/not/a/path"));
        assert!(preamble.contains("(empty or unreadable)"));
    }

    #[test]
    fn test_gitignored_entries_excluded() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target/\n").unwrap();
        std::fs::create_dir(dir.path().join("target")).unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();

        let preamble = build_preamble(dir.path());
        assert!(preamble.contains("src/"));
        assert!(!preamble.contains("target/"));
    }
}
