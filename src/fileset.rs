//! FileSet: a path -> content mapping for a project's text files.
//!
//! Used both as the snapshot of an existing repository and as the parsed
//! result of a generation call. Paths are relative, forward-slash
//! normalized, and never escape the project root.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// An ordered-irrelevant mapping from relative file path to file content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSet(BTreeMap<String, String>);

impl FileSet {
    pub fn new() -> Self {
        FileSet(BTreeMap::new())
    }

    /// Insert a file, normalizing separators and enforcing the path-safety
    /// invariant: relative, no `..` segments, no drive/root prefix.
    pub fn insert(
        &mut self,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), GenerationError> {
        let normalized = normalize_path(&path.into())?;
        self.0.insert(normalized, content.into());
        Ok(())
    }

    /// Build a FileSet from an already-parsed map, validating every path.
    pub fn from_map(map: BTreeMap<String, String>) -> Result<Self, GenerationError> {
        let mut set = FileSet::new();
        for (path, content) in map {
            set.insert(path, content)?;
        }
        Ok(set)
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Serialize as the JSON object text block embedded in prompts.
    pub fn to_json(&self) -> String {
        // A map of strings cannot fail to serialize.
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    /// Materialize every entry under `root`, creating parent directories.
    pub fn write_to(&self, root: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.0.len());
        for (rel, content) in &self.0 {
            let target = root.join(rel);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, content)?;
            written.push(target);
        }
        Ok(written)
    }
}

impl IntoIterator for FileSet {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Normalize a path to forward slashes and reject anything that could
/// escape the project root.
fn normalize_path(raw: &str) -> Result<String, GenerationError> {
    let unified = raw.replace('\\', "/");
    let trimmed = unified.trim_start_matches("./");

    if trimmed.is_empty() {
        return Err(GenerationError::UnsafePath(raw.to_string()));
    }

    let path = Path::new(trimmed);
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            // `..`, `/`, `C:\`, or a lone `.` all make the path unsafe or
            // meaningless as a project-relative file name.
            _ => return Err(GenerationError::UnsafePath(raw.to_string())),
        }
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_normalizes_separators() {
        let mut set = FileSet::new();
        set.insert("src\\models\\user.py", "pass").unwrap();
        assert!(set.contains("src/models/user.py"));
    }

    #[test]
    fn insert_strips_leading_dot_slash() {
        let mut set = FileSet::new();
        set.insert("./main.py", "print('hi')").unwrap();
        assert_eq!(set.get("main.py"), Some("print('hi')"));
    }

    #[test]
    fn rejects_parent_traversal() {
        let mut set = FileSet::new();
        let err = set.insert("../escape.py", "").unwrap_err();
        assert!(matches!(err, GenerationError::UnsafePath(_)));

        let err = set.insert("src/../../escape.py", "").unwrap_err();
        assert!(matches!(err, GenerationError::UnsafePath(_)));
    }

    #[test]
    fn rejects_absolute_paths() {
        let mut set = FileSet::new();
        assert!(set.insert("/etc/passwd", "").is_err());
        assert!(set.insert("", "").is_err());
    }

    #[test]
    fn from_map_validates_all_paths() {
        let mut map = BTreeMap::new();
        map.insert("ok.py".to_string(), "pass".to_string());
        map.insert("../bad.py".to_string(), "pass".to_string());
        assert!(FileSet::from_map(map).is_err());
    }

    #[test]
    fn write_to_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = FileSet::new();
        set.insert("src/app/main.py", "print('hi')").unwrap();
        set.insert("README.md", "# demo").unwrap();

        let written = set.write_to(dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        let content = std::fs::read_to_string(dir.path().join("src/app/main.py")).unwrap();
        assert_eq!(content, "print('hi')");
    }

    #[test]
    fn json_round_trip() {
        let mut set = FileSet::new();
        set.insert("main.py", "print('hi')").unwrap();
        let json = set.to_json();
        let parsed: FileSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, set);
    }
}
