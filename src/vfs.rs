// The workspace file state. A workspace is a flat map from
// slash-delimited paths to text content; it is the single source of
// truth. The folder tree and the sandbox mount descriptor are derived
// from it on demand and never stored.

use crate::errors::{CoderoomError, CoderoomErrorType, Result};
use crate::paths;
use crate::templates;
use std::collections::BTreeMap;

use ciborium::{from_reader, into_writer};
use serde::{Deserialize, Serialize};
use sled::Db;

pub(crate) type FlatFileMap = BTreeMap<String, String>;

#[derive(Serialize, Deserialize)]
struct DbWorkspace {
    name: String,
    files: FlatFileMap,
    #[serde(default)]
    created: String,
}

#[derive(Debug)]
pub(crate) struct Workspace {
    name: String,
    files: FlatFileMap,
    created: String,
    db: Db,
}

impl Workspace {
    pub(crate) fn new(name: &str, seed: FlatFileMap, db: Db) -> Result<Workspace> {
        if db.contains_key(name.as_bytes())? {
            return Err(CoderoomError::new(
                CoderoomErrorType::AlreadyExists,
                format!("Workspace {} already exists", name),
            ));
        }
        let mut workspace = Workspace {
            name: name.to_string(),
            files: seed,
            created: chrono::Utc::now().to_rfc3339(),
            db,
        };
        workspace.save()?;
        Ok(workspace)
    }

    pub(crate) fn load(name: &str, db: Db) -> Result<Workspace> {
        let record = db.get(name.as_bytes())?;
        let record = match record {
            None => {
                return Err(CoderoomError::new(
                    CoderoomErrorType::NotFound,
                    format!("Workspace {} does not exist", name),
                ))
            }
            Some(record) => record,
        };
        let record: DbWorkspace = from_reader(record.as_ref()).map_err(|e| {
            CoderoomError::new(
                CoderoomErrorType::InternalError,
                format!("Workspace {} record is corrupt: {}", name, e),
            )
        })?;
        Ok(Workspace {
            name: record.name,
            files: record.files,
            created: record.created,
            db,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn files(&self) -> &FlatFileMap {
        &self.files
    }

    pub(crate) fn exists(&self, path: &str) -> bool {
        match paths::normalize(path) {
            Ok(normalized) => self.files.contains_key(&normalized),
            Err(_) => false,
        }
    }

    pub(crate) fn get_file(&self, path: &str) -> Result<&str> {
        let normalized = paths::normalize(path)?;
        match self.files.get(&normalized) {
            Some(content) => Ok(content),
            None => Err(CoderoomError::new(
                CoderoomErrorType::NotFound,
                format!("No file at `{}`", normalized),
            )),
        }
    }

    /// Add a file. When no content is given, a stub matching the file
    /// extension is used, the way the editor seeds new files.
    pub(crate) fn add_file(&mut self, path: &str, content: Option<String>) -> Result<()> {
        let normalized = paths::normalize(path)?;
        if self.files.contains_key(&normalized) {
            return Err(CoderoomError::new(
                CoderoomErrorType::AlreadyExists,
                format!("`{}` already exists", normalized),
            ));
        }
        let prefix = format!("{}/", normalized);
        if self.files.keys().any(|key| key.starts_with(&prefix)) {
            // A file here would shadow the folder's entries in the
            // mount descriptor.
            return Err(CoderoomError::new(
                CoderoomErrorType::AlreadyExists,
                format!("`{}` already exists as a folder", normalized),
            ));
        }
        self.check_file_ancestor(&normalized)?;
        let content =
            content.unwrap_or_else(|| templates::default_content(paths::file_name(&normalized)));
        self.files.insert(normalized, content);
        self.save()?;
        Ok(())
    }

    pub(crate) fn write_file(&mut self, path: &str, content: String) -> Result<()> {
        let normalized = paths::normalize(path)?;
        if !self.files.contains_key(&normalized) {
            return Err(CoderoomError::new(
                CoderoomErrorType::NotFound,
                format!("No file at `{}`", normalized),
            ));
        }
        self.files.insert(normalized, content);
        self.save()?;
        Ok(())
    }

    /// Create an empty folder by inserting its placeholder entry.
    pub(crate) fn add_folder(&mut self, path: &str) -> Result<()> {
        let normalized = paths::normalize(path)?;
        let prefix = format!("{}/", normalized);
        let occupied = self.files.contains_key(&normalized)
            || self.files.keys().any(|key| key.starts_with(&prefix));
        if occupied {
            return Err(CoderoomError::new(
                CoderoomErrorType::AlreadyExists,
                format!("`{}` already exists", normalized),
            ));
        }
        self.check_file_ancestor(&normalized)?;
        let placeholder = format!("{}/{}", normalized, paths::PLACEHOLDER_NAME);
        self.files.insert(placeholder, String::new());
        self.save()?;
        Ok(())
    }

    /// Remove a file, returning every key that was dropped. Removing
    /// the last real file in the workspace is refused silently: the map
    /// is left unchanged and the returned list is empty. After a real
    /// removal, placeholder entries whose folder no longer holds any
    /// real file are swept as well.
    pub(crate) fn remove_file(&mut self, path: &str) -> Result<Vec<String>> {
        let normalized = paths::normalize(path)?;
        if !self.files.contains_key(&normalized) {
            return Err(CoderoomError::new(
                CoderoomErrorType::NotFound,
                format!("No file at `{}`", normalized),
            ));
        }
        let is_real = !paths::is_placeholder(&normalized);
        if is_real && self.real_file_count() <= 1 {
            // The workspace must always keep at least one real file.
            tracing::warn!(
                "Refused to remove `{}`: it is the last file in workspace {}",
                normalized,
                self.name
            );
            return Ok(Vec::new());
        }
        self.files.remove(&normalized);
        let mut removed = vec![normalized];
        if is_real {
            removed.extend(self.sweep_placeholders());
        }
        self.save()?;
        Ok(removed)
    }

    /// Glob search over the flat map keys.
    pub(crate) fn files_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = fnmatch_regex::glob_to_regex(pattern).map_err(|e| {
            CoderoomError::new(
                CoderoomErrorType::InvalidPath,
                format!("Bad glob pattern {}: {}", pattern, e),
            )
        })?;
        Ok(self
            .files
            .keys()
            .filter(|key| !paths::is_placeholder(key))
            .filter(|key| matcher.is_match(key))
            .cloned()
            .collect())
    }

    /// No segment prefix of a new path may name an existing file; the
    /// mount descriptor cannot represent a file with children.
    fn check_file_ancestor(&self, path: &str) -> Result<()> {
        let mut ancestor = paths::parent(path);
        while let Some(dir) = ancestor {
            if self.files.contains_key(dir) {
                return Err(CoderoomError::new(
                    CoderoomErrorType::InvalidPath,
                    format!("`{}` is a file, not a folder", dir),
                ));
            }
            ancestor = paths::parent(dir);
        }
        Ok(())
    }

    fn real_file_count(&self) -> usize {
        self.files
            .keys()
            .filter(|key| !paths::is_placeholder(key))
            .count()
    }

    /// Drop placeholder entries for folders with no real file anywhere
    /// below them. Ancestor folders that still hold real descendants
    /// keep theirs.
    fn sweep_placeholders(&mut self) -> Vec<String> {
        let stale: Vec<String> = self
            .files
            .keys()
            .filter(|key| paths::is_placeholder(key))
            .filter(|key| {
                let folder_prefix = match paths::parent(key) {
                    Some(folder) => format!("{}/", folder),
                    None => String::new(),
                };
                !self.files.keys().any(|other| {
                    !paths::is_placeholder(other) && other.starts_with(&folder_prefix)
                })
            })
            .cloned()
            .collect();
        for key in &stale {
            self.files.remove(key);
        }
        stale
    }

    fn save(&mut self) -> Result<()> {
        let record = DbWorkspace {
            name: self.name.clone(),
            files: self.files.clone(),
            created: self.created.clone(),
        };
        let mut bytes = Vec::new();
        into_writer(&record, &mut bytes).map_err(|e| {
            CoderoomError::new(
                CoderoomErrorType::InternalError,
                format!("Could not serialize workspace {}: {}", self.name, e),
            )
        })?;
        self.db.insert(self.name.as_bytes(), bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoderoomErrorType;

    fn scratch_db() -> (tempfile::TempDir, Db) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("ws")).unwrap();
        (dir, db)
    }

    fn workspace_with(entries: &[(&str, &str)]) -> (tempfile::TempDir, Workspace) {
        let (dir, db) = scratch_db();
        let mut seed = FlatFileMap::new();
        for (path, content) in entries {
            seed.insert(path.to_string(), content.to_string());
        }
        let workspace = Workspace::new("room", seed, db).unwrap();
        (dir, workspace)
    }

    #[test]
    fn create_then_reload_round_trips() {
        let (_dir, db) = scratch_db();
        let mut seed = FlatFileMap::new();
        seed.insert("a.js".to_string(), "x".to_string());
        {
            let workspace = Workspace::new("room", seed.clone(), db.clone()).unwrap();
            assert_eq!(workspace.files(), &seed);
        }
        let reloaded = Workspace::load("room", db).unwrap();
        assert_eq!(reloaded.files(), &seed);
        assert_eq!(reloaded.name(), "room");
    }

    #[test]
    fn duplicate_workspace_is_rejected() {
        let (_dir, db) = scratch_db();
        let mut seed = FlatFileMap::new();
        seed.insert("a.js".to_string(), "x".to_string());
        Workspace::new("room", seed.clone(), db.clone()).unwrap();
        let err = Workspace::new("room", seed, db).unwrap_err();
        assert_eq!(err.error_type, CoderoomErrorType::AlreadyExists);
    }

    #[test]
    fn add_file_normalizes_and_defaults_content() {
        let (_dir, mut workspace) = workspace_with(&[("a.js", "x")]);
        workspace.add_file("/src/b.js/", None).unwrap();
        assert!(workspace.exists("src/b.js"));
        assert!(workspace.get_file("src/b.js").unwrap().contains("JavaScript"));
        let err = workspace.add_file("src/b.js", None).unwrap_err();
        assert_eq!(err.error_type, CoderoomErrorType::AlreadyExists);
    }

    #[test]
    fn file_cannot_shadow_a_folder() {
        let (_dir, mut workspace) = workspace_with(&[("a.js", "x"), ("src/b.js", "y")]);
        let err = workspace
            .add_file("src", Some("i am a file".to_string()))
            .unwrap_err();
        assert_eq!(err.error_type, CoderoomErrorType::AlreadyExists);
        assert!(workspace.exists("src/b.js"));
        let flat = workspace.files();
        assert_eq!(
            crate::mount::flatten_mount(&crate::mount::build_mount(flat)),
            *flat
        );
    }

    #[test]
    fn nothing_nests_under_a_file() {
        let (_dir, mut workspace) = workspace_with(&[("a.js", "x")]);
        let err = workspace.add_file("a.js/nested.js", None).unwrap_err();
        assert_eq!(err.error_type, CoderoomErrorType::InvalidPath);
        let err = workspace.add_folder("a.js/sub").unwrap_err();
        assert_eq!(err.error_type, CoderoomErrorType::InvalidPath);
        assert_eq!(workspace.files().len(), 1);
    }

    #[test]
    fn write_file_requires_existing_path() {
        let (_dir, mut workspace) = workspace_with(&[("a.js", "x")]);
        workspace.write_file("a.js", "y".to_string()).unwrap();
        assert_eq!(workspace.get_file("a.js").unwrap(), "y");
        let err = workspace.write_file("b.js", "z".to_string()).unwrap_err();
        assert_eq!(err.error_type, CoderoomErrorType::NotFound);
    }

    #[test]
    fn add_folder_inserts_placeholder() {
        let (_dir, mut workspace) = workspace_with(&[("a.js", "x")]);
        workspace.add_folder("src").unwrap();
        assert!(workspace.files().contains_key("src/.placeholder"));
        let err = workspace.add_folder("src").unwrap_err();
        assert_eq!(err.error_type, CoderoomErrorType::AlreadyExists);
    }

    #[test]
    fn removing_the_only_file_is_a_silent_no_op() {
        let (_dir, mut workspace) = workspace_with(&[("only.js", "x")]);
        let removed = workspace.remove_file("only.js").unwrap();
        assert!(removed.is_empty());
        assert!(workspace.exists("only.js"));
    }

    #[test]
    fn placeholder_does_not_count_as_a_real_file() {
        let (_dir, mut workspace) =
            workspace_with(&[("a.js", "x"), ("src/.placeholder", "p")]);
        let removed = workspace.remove_file("a.js").unwrap();
        assert!(removed.is_empty());
        assert!(workspace.exists("a.js"));
    }

    #[test]
    fn removal_sweeps_placeholders_of_emptied_folders() {
        let (_dir, mut workspace) =
            workspace_with(&[("a.js", "x"), ("b.js", "y"), ("src/.placeholder", "p")]);
        let removed = workspace.remove_file("b.js").unwrap();
        assert!(removed.contains(&"b.js".to_string()));
        assert!(removed.contains(&"src/.placeholder".to_string()));
        assert!(!workspace.files().contains_key("src/.placeholder"));
        assert!(workspace.exists("a.js"));
    }

    #[test]
    fn sweep_spares_folders_with_real_descendants() {
        let (_dir, mut workspace) = workspace_with(&[
            ("a.js", "x"),
            ("src/b.js", "y"),
            ("src/.placeholder", "p"),
        ]);
        let removed = workspace.remove_file("a.js").unwrap();
        assert_eq!(removed, vec!["a.js".to_string()]);
        assert!(workspace.files().contains_key("src/.placeholder"));
        assert!(workspace.exists("src/b.js"));
    }

    #[test]
    fn glob_search_skips_placeholders() {
        let (_dir, mut workspace) =
            workspace_with(&[("a.js", "x"), ("src/b.js", "y"), ("src/c.ts", "z")]);
        workspace.add_folder("docs").unwrap();
        let mut hits = workspace.files_matching("src/*").unwrap();
        hits.sort();
        assert_eq!(hits, vec!["src/b.js".to_string(), "src/c.ts".to_string()]);
        assert!(workspace.files_matching("docs/*").unwrap().is_empty());
    }
}
