//! Repository snapshot reader.
//!
//! Walks a working tree with ignore-rule filtering and returns a [`FileSet`]
//! of the eligible text files. Ignore rules come from the repository's
//! `.gitignore` at (or below) the root, compiled once per walk by the
//! `ignore` crate; hidden entries (including `.git`) are skipped.

use std::path::Path;

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::error::SnapshotError;
use crate::fileset::FileSet;

/// Snapshot the tree under `root`, keeping files whose extension is in
/// `allowed_extensions` (compared without the dot, case-insensitively).
///
/// A file that cannot be read as UTF-8 text is logged and skipped; the
/// snapshot never fails because of a single unreadable file. The output
/// never contains a path excluded by the ignore rules.
pub fn snapshot(root: &Path, allowed_extensions: &[String]) -> Result<FileSet, SnapshotError> {
    if !root.is_dir() {
        return Err(SnapshotError::RootNotFound(root.to_path_buf()));
    }

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        // Honor .gitignore rules even for trees that are not git repositories.
        .require_git(false)
        .build();

    let mut files = FileSet::new();
    for entry in walker {
        let entry = entry.map_err(SnapshotError::Walk)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if !has_allowed_extension(path, allowed_extensions) {
            continue;
        }

        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        match std::fs::read_to_string(path) {
            Ok(content) => {
                // Walker paths are root-relative, so insertion only fails on
                // pathological names; those are skipped like unreadable files.
                if let Err(e) = files.insert(rel_str.clone(), content) {
                    warn!("Skipping snapshot entry {rel_str}: {e}");
                }
            }
            Err(e) => {
                warn!("Skipping unreadable file {rel_str}: {e}");
            }
        }
    }

    debug!(root = %root.display(), files = files.len(), "Snapshot complete");
    Ok(files)
}

fn has_allowed_extension(path: &Path, allowed: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}
