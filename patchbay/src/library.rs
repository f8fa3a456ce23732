//! Library Store
//!
//! Durable keeping of patches and a queryable index. One JSON file per patch
//! under `<root>/patches`, one index file at `<root>/index.json`, and a
//! `<root>/backups` directory receiving pre-overwrite and pre-delete
//! snapshots with millisecond timestamp suffixes.
//!
//! The store is an explicit object with load-or-create construction; all of
//! its state sits behind one mutex, so mutations are serialized by
//! construction rather than by caller convention. Index persistence is an
//! all-or-nothing rewrite through a temp file, so a failed write leaves the
//! previous on-disk index untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::model::{normalize_id, Patch, PatchMetadata, ValidationIssue};

/// Errors from the store's I/O-facing operations. The pure engines never
/// raise; only these calls can fail outright.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("patch file not found: {0}")]
    NotFound(PathBuf),

    #[error("unknown patch id: {0}")]
    UnknownId(String),

    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<ValidationIssue>),
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// How `import_file` derives index entry ids.
///
/// `save` always derives the id from the patch name; timestamp-based import
/// ids let repeated imports of same-named patches coexist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportIdScheme {
    #[default]
    Timestamp,
    NameDerived,
}

/// Store construction options.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub import_ids: ImportIdScheme,
}

/// Lightweight index record, one per persisted patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub metadata: PatchMetadata,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LibraryIndex {
    #[serde(default)]
    entries: Vec<LibraryEntry>,
}

/// Load a patch file, applying the model's lossless defaulting.
pub fn load_patch(path: &Path) -> Result<Patch, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let json = fs::read_to_string(path)?;
    Patch::from_json(&json).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Serialize to a temp file in the same directory, then rename over the
/// target, so readers never observe a half-written file.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// The patch library: durable storage plus an in-memory index.
pub struct PatchStore {
    patches_dir: PathBuf,
    backups_dir: PathBuf,
    index_path: PathBuf,
    config: StoreConfig,
    index: Mutex<HashMap<String, LibraryEntry>>,
}

impl PatchStore {
    /// Open (or create) a store rooted at `root` with default configuration.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with(root, StoreConfig::default())
    }

    /// Open (or create) a store rooted at `root`.
    pub fn open_with(root: impl AsRef<Path>, config: StoreConfig) -> Result<Self, StoreError> {
        let root = root.as_ref();
        let patches_dir = root.join("patches");
        let backups_dir = root.join("backups");
        let index_path = root.join("index.json");

        fs::create_dir_all(&patches_dir)?;
        fs::create_dir_all(&backups_dir)?;

        let index = if index_path.exists() {
            let json = fs::read_to_string(&index_path)?;
            let parsed: LibraryIndex =
                serde_json::from_str(&json).map_err(|source| StoreError::Parse {
                    path: index_path.clone(),
                    source,
                })?;
            parsed
                .entries
                .into_iter()
                .map(|e| (e.id.clone(), e))
                .collect()
        } else {
            HashMap::new()
        };

        tracing::info!(root = %root.display(), entries = index.len(), "opened patch library");

        Ok(Self {
            patches_dir,
            backups_dir,
            index_path,
            config,
            index: Mutex::new(index),
        })
    }

    fn lock_index(&self) -> MutexGuard<'_, HashMap<String, LibraryEntry>> {
        self.index.lock().unwrap()
    }

    /// Persist a patch.
    ///
    /// Rejects with the complete list of Error-severity issues if validation
    /// fails, refreshes the modification timestamp, and snapshots any file
    /// being overwritten into the backup directory first. The index entry is
    /// keyed by an id derived from the patch name.
    pub fn save(&self, patch: &mut Patch, filename: Option<&str>) -> Result<PathBuf, StoreError> {
        let entry_id = normalize_id(&patch.metadata.name);
        let mut index = self.lock_index();
        let entry = self.save_locked(&mut index, patch, filename, entry_id)?;
        Ok(entry.path)
    }

    fn save_locked(
        &self,
        index: &mut HashMap<String, LibraryEntry>,
        patch: &mut Patch,
        filename: Option<&str>,
        entry_id: String,
    ) -> Result<LibraryEntry, StoreError> {
        let blocking: Vec<ValidationIssue> = patch
            .validate()
            .into_iter()
            .filter(ValidationIssue::is_blocking)
            .collect();
        if !blocking.is_empty() {
            return Err(StoreError::Validation(blocking));
        }

        patch.metadata.modified_at = Utc::now();

        let filename = match filename {
            Some(name) => name.to_string(),
            None => format!("{}.json", patch.id),
        };
        let path = self.patches_dir.join(filename);

        if path.exists() {
            self.backup_file(&path, None)?;
        }
        write_json_atomic(&path, patch)?;

        let last_used = index.get(&entry_id).and_then(|e| e.last_used);
        let entry = LibraryEntry {
            id: entry_id.clone(),
            name: patch.metadata.name.clone(),
            path,
            metadata: patch.metadata.clone(),
            last_used,
        };
        index.insert(entry_id, entry.clone());
        self.persist_index(index)?;

        tracing::info!(id = %entry.id, path = %entry.path.display(), "saved patch");
        Ok(entry)
    }

    /// Copy a patch file into the backup directory with a millisecond
    /// timestamp suffix (and an optional prefix, e.g. "deleted").
    fn backup_file(&self, path: &Path, prefix: Option<&str>) -> Result<PathBuf, StoreError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("patch");
        let name = match prefix {
            Some(prefix) => format!("{}_{}_{}.json", prefix, millis(), stem),
            None => format!("{}_{}.json", stem, millis()),
        };
        let backup = self.backups_dir.join(name);
        fs::copy(path, &backup)?;
        Ok(backup)
    }

    /// Load a patch file from an arbitrary location. Fatal if missing.
    pub fn load(&self, path: &Path) -> Result<Patch, StoreError> {
        load_patch(path)
    }

    /// Fetch a stored patch by index id and touch its last-used timestamp.
    pub fn fetch(&self, id: &str) -> Result<Patch, StoreError> {
        let mut index = self.lock_index();
        let path = index
            .get(id)
            .map(|e| e.path.clone())
            .ok_or_else(|| StoreError::UnknownId(id.to_string()))?;
        let patch = load_patch(&path)?;

        if let Some(entry) = index.get_mut(id) {
            entry.last_used = Some(Utc::now());
        }
        self.persist_index(&index)?;
        Ok(patch)
    }

    /// All index entries, sorted by name.
    pub fn library(&self) -> Vec<LibraryEntry> {
        let index = self.lock_index();
        let mut entries: Vec<LibraryEntry> = index.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn entry(&self, id: &str) -> Option<LibraryEntry> {
        self.lock_index().get(id).cloned()
    }

    /// Case-insensitive substring match over entry names and tags.
    pub fn search(&self, query: &str) -> Vec<LibraryEntry> {
        let needle = query.to_lowercase();
        let mut hits: Vec<LibraryEntry> = self
            .lock_index()
            .values()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.metadata
                        .tags
                        .iter()
                        .any(|t| t.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        hits
    }

    /// Soft-delete: snapshot the patch file into the backup directory and
    /// remove only the index entry. An unknown id is benign, not an error.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut index = self.lock_index();
        let Some(entry) = index.get(id) else {
            return Ok(false);
        };

        if entry.path.exists() {
            self.backup_file(&entry.path, Some("deleted"))?;
        }
        index.remove(id);
        self.persist_index(&index)?;

        tracing::info!(id, "deleted patch from library index");
        Ok(true)
    }

    /// Import an external patch file: load it, re-save it into the managed
    /// storage directory (same validation and backup rules as `save`), and
    /// index it under the configured id scheme.
    pub fn import_file(&self, path: &Path) -> Result<LibraryEntry, StoreError> {
        let mut patch = load_patch(path)?;

        let entry_id = match self.config.import_ids {
            ImportIdScheme::Timestamp => format!("import-{}", millis()),
            ImportIdScheme::NameDerived => normalize_id(&patch.metadata.name),
        };

        let mut index = self.lock_index();
        let entry = self.save_locked(&mut index, &mut patch, None, entry_id)?;
        tracing::info!(id = %entry.id, source = %path.display(), "imported patch");
        Ok(entry)
    }

    /// Rewrite the whole index record. All-or-nothing by construction.
    fn persist_index(&self, index: &HashMap<String, LibraryEntry>) -> Result<(), StoreError> {
        let mut entries: Vec<LibraryEntry> = index.values().cloned().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        write_json_atomic(&self.index_path, &LibraryIndex { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, Net};
    use tempfile::TempDir;

    fn test_store() -> (PatchStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = PatchStore::open(temp.path()).unwrap();
        (store, temp)
    }

    fn valid_patch(name: &str) -> Patch {
        let mut patch = Patch::new(name);
        patch.add_component(Component::new("r1", "R1").with_property("pin1", ""));
        patch.add_component(Component::new("r2", "R2").with_property("pin1", ""));
        let mut net = Net::new("n1");
        net.add_endpoint("R1", "pin1");
        net.add_endpoint("R2", "pin1");
        patch.add_net(net);
        patch
    }

    fn broken_patch(name: &str) -> Patch {
        let mut patch = Patch::new(name);
        patch.add_component(
            Component::new("r1", "R1")
                .with_property("pin1", "")
                .with_property("pin2", ""),
        );
        patch
    }

    #[test]
    fn test_save_and_fetch_round_trip() {
        let (store, _temp) = test_store();
        let mut patch = valid_patch("Divider");

        let path = store.save(&mut patch, None).unwrap();
        assert!(path.exists());

        let loaded = store.fetch("divider").unwrap();
        assert_eq!(loaded.components, patch.components);
        assert_eq!(loaded.nets, patch.nets);
        assert_eq!(loaded.metadata.name, "Divider");
    }

    #[test]
    fn test_save_refreshes_modified_timestamp() {
        let (store, _temp) = test_store();
        let mut patch = valid_patch("Divider");
        let before = patch.metadata.modified_at;
        store.save(&mut patch, None).unwrap();
        assert!(patch.metadata.modified_at >= before);
    }

    #[test]
    fn test_save_rejects_blocking_errors_with_full_list() {
        let (store, _temp) = test_store();
        let mut patch = broken_patch("Broken");

        match store.save(&mut patch, None) {
            Err(StoreError::Validation(issues)) => {
                // Both open pins reported in one round-trip.
                assert_eq!(issues.len(), 2);
                assert!(issues.iter().all(|i| i.is_blocking()));
            }
            other => panic!("expected validation failure, got {:?}", other.map(|p| p.display().to_string())),
        }
        // Nothing was written and nothing was indexed.
        assert!(store.library().is_empty());
    }

    #[test]
    fn test_overwrite_creates_backup() {
        let (store, temp) = test_store();
        let mut patch = valid_patch("Divider");
        store.save(&mut patch, None).unwrap();
        store.save(&mut patch, None).unwrap();

        let backups: Vec<_> = fs::read_dir(temp.path().join("backups"))
            .unwrap()
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_delete_is_soft_and_idempotent() {
        let (store, temp) = test_store();
        let mut patch = valid_patch("Divider");
        let path = store.save(&mut patch, None).unwrap();

        assert!(store.delete("divider").unwrap());
        assert!(store.entry("divider").is_none());
        // The patch file itself survives; a stamped copy lands in backups.
        assert!(path.exists());
        let deleted: Vec<String> = fs::read_dir(temp.path().join("backups"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(deleted.iter().any(|n| n.starts_with("deleted_")));

        // Unknown id: benign false, index unchanged.
        assert!(!store.delete("divider").unwrap());
        assert!(!store.delete("never-existed").unwrap());
    }

    #[test]
    fn test_search_is_case_insensitive_over_name_and_tags() {
        let (store, _temp) = test_store();
        let mut a = valid_patch("Power Stage");
        a.metadata.tags = vec!["buck".to_string(), "regulator".to_string()];
        store.save(&mut a, None).unwrap();
        let mut b = valid_patch("LED Driver");
        store.save(&mut b, None).unwrap();

        assert_eq!(store.search("power").len(), 1);
        assert_eq!(store.search("REGULATOR").len(), 1);
        assert_eq!(store.search("driver").len(), 1);
        assert_eq!(store.search("e").len(), 2);
        assert!(store.search("missing").is_empty());
    }

    #[test]
    fn test_import_uses_timestamp_ids_by_default() {
        let (store, temp) = test_store();

        let external = temp.path().join("external.json");
        fs::write(&external, valid_patch("Imported").to_json().unwrap()).unwrap();

        let entry = store.import_file(&external).unwrap();
        assert!(entry.id.starts_with("import-"));
        // The managed copy lives under the store, not at the source path.
        assert!(entry.path.starts_with(temp.path().join("patches")));
        assert!(store.entry(&entry.id).is_some());
    }

    #[test]
    fn test_import_name_derived_scheme() {
        let temp = TempDir::new().unwrap();
        let store = PatchStore::open_with(
            temp.path(),
            StoreConfig {
                import_ids: ImportIdScheme::NameDerived,
            },
        )
        .unwrap();

        let external = temp.path().join("external.json");
        fs::write(&external, valid_patch("My Import").to_json().unwrap()).unwrap();

        let entry = store.import_file(&external).unwrap();
        assert_eq!(entry.id, "my-import");
    }

    #[test]
    fn test_import_missing_file_is_fatal() {
        let (store, temp) = test_store();
        let missing = temp.path().join("nope.json");
        assert!(matches!(
            store.import_file(&missing),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_index_survives_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let store = PatchStore::open(temp.path()).unwrap();
            let mut patch = valid_patch("Divider");
            store.save(&mut patch, None).unwrap();
        }

        let reopened = PatchStore::open(temp.path()).unwrap();
        let entries = reopened.library();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "divider");
        assert_eq!(entries[0].name, "Divider");
    }

    #[test]
    fn test_fetch_touches_last_used() {
        let (store, _temp) = test_store();
        let mut patch = valid_patch("Divider");
        store.save(&mut patch, None).unwrap();

        assert!(store.entry("divider").unwrap().last_used.is_none());
        store.fetch("divider").unwrap();
        assert!(store.entry("divider").unwrap().last_used.is_some());

        // The touch persists across reopen, and re-saving keeps it.
        store.save(&mut patch, None).unwrap();
        assert!(store.entry("divider").unwrap().last_used.is_some());
    }

    #[test]
    fn test_fetch_unknown_id() {
        let (store, _temp) = test_store();
        assert!(matches!(
            store.fetch("ghost"),
            Err(StoreError::UnknownId(_))
        ));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let (store, temp) = test_store();
        let mut patch = valid_patch("Divider");
        store.save(&mut patch, None).unwrap();

        for dir in ["patches", "."] {
            for entry in fs::read_dir(temp.path().join(dir)).unwrap() {
                let name = entry.unwrap().file_name().to_string_lossy().into_owned();
                assert!(!name.ends_with(".tmp"), "leftover temp file: {}", name);
            }
        }
    }
}
