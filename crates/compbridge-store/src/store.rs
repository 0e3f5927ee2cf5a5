//! JSON-file snippet store.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use compbridge_types::Snippet;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};

/// Fields supplied when saving a snippet.
#[derive(Debug, Clone, Default)]
pub struct NewSnippet {
    pub name: String,
    pub code: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub input_data: Option<String>,
}

/// Snippets kept in memory and written through to one JSON file.
#[derive(Debug)]
pub struct SnippetStore {
    path: PathBuf,
    snippets: Vec<Snippet>,
}

impl SnippetStore {
    /// Open the store at `path`. A missing file is an empty store; a file
    /// that does not parse is moved aside to `<path>.corrupt` and the store
    /// starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snippets = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<Snippet>>(&content) {
                Ok(snippets) => snippets,
                Err(e) => {
                    let backup = set_aside(&path)?;
                    warn!(
                        path = %path.display(),
                        backup = %backup.display(),
                        error = %e,
                        "moved corrupt snippet store aside"
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        debug!(path = %path.display(), count = snippets.len(), "opened snippet store");
        Ok(Self { path, snippets })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All snippets in creation order.
    pub fn list(&self) -> &[Snippet] {
        &self.snippets
    }

    pub fn get(&self, id: u64) -> Option<&Snippet> {
        self.snippets.iter().find(|s| s.id == id)
    }

    /// Validate and append a snippet, then persist.
    pub fn save(&mut self, draft: NewSnippet) -> Result<Snippet> {
        if draft.name.trim().is_empty() {
            return Err(StoreError::Validation("snippet name is required".into()));
        }
        if draft.code.trim().is_empty() {
            return Err(StoreError::Validation("snippet code is required".into()));
        }
        let now = Utc::now();
        let snippet = Snippet {
            id: self.next_id(now.timestamp_millis().max(0) as u64),
            name: draft.name,
            code: draft.code,
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            category: draft.category,
            tags: draft.tags,
            description: draft.description,
            input_data: draft.input_data,
        };
        let mut next = self.snippets.clone();
        next.push(snippet.clone());
        self.persist(&next)?;
        self.snippets = next;
        info!(id = snippet.id, name = %snippet.name, "saved snippet");
        Ok(snippet)
    }

    /// Remove a snippet. Returns whether it existed.
    pub fn delete(&mut self, id: u64) -> Result<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let next: Vec<Snippet> = self.snippets.iter().filter(|s| s.id != id).cloned().collect();
        self.persist(&next)?;
        self.snippets = next;
        info!(id, "deleted snippet");
        Ok(true)
    }

    /// Case-insensitive match over name, category, tags and description.
    pub fn search(&self, query: &str) -> Vec<&Snippet> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.snippets.iter().collect();
        }
        let hit = |text: &str| text.to_lowercase().contains(&needle);
        self.snippets
            .iter()
            .filter(|s| {
                hit(&s.name)
                    || s.category.as_deref().is_some_and(hit)
                    || s.tags.iter().any(|t| hit(t))
                    || s.description.as_deref().is_some_and(hit)
            })
            .collect()
    }

    /// Epoch millis, bumped past the newest existing id.
    fn next_id(&self, now_ms: u64) -> u64 {
        match self.snippets.iter().map(|s| s.id).max() {
            Some(last) if last >= now_ms => last + 1,
            _ => now_ms,
        }
    }

    /// Write `snippets` to disk. Callers commit to memory only on success.
    fn persist(&self, snippets: &[Snippet]) -> Result<()> {
        let json = serde_json::to_string_pretty(snippets)?;
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, json)
        };
        write().map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Rename an unreadable store to the first free `<path>.corrupt[.N]`.
fn set_aside(path: &Path) -> Result<PathBuf> {
    let mut backup = PathBuf::from(format!("{}.corrupt", path.display()));
    let mut n = 1;
    while backup.exists() {
        backup = PathBuf::from(format!("{}.corrupt.{n}", path.display()));
        n += 1;
    }
    std::fs::rename(path, &backup).map_err(|source| StoreError::Write {
        path: backup.clone(),
        source,
    })?;
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> NewSnippet {
        NewSnippet {
            name: name.into(),
            code: format!("const {name} = () => <div/>;"),
            ..NewSnippet::default()
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnippetStore::open(dir.path().join("snippets.json")).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snippets.json");
        let backup = dir.path().join("snippets.json.corrupt");
        std::fs::write(&path, "{not json").unwrap();

        let mut store = SnippetStore::open(&path).unwrap();
        assert!(store.list().is_empty());
        assert!(!path.exists());
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "{not json");

        store.save(draft("Card")).unwrap();
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "{not json");

        std::fs::write(&path, "[oops").unwrap();
        SnippetStore::open(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "{not json");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("snippets.json.corrupt.1")).unwrap(),
            "[oops"
        );
    }

    #[test]
    fn test_failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("nested");
        let mut store = SnippetStore::open(parent.join("snippets.json")).unwrap();
        // A plain file where the store's directory should go.
        std::fs::write(&parent, "").unwrap();

        let err = store.save(draft("Card"));
        assert!(matches!(err, Err(StoreError::Write { .. })));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_failed_delete_keeps_snippet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("snippets.json");
        let mut store = SnippetStore::open(&path).unwrap();
        let id = store.save(draft("Card")).unwrap().id;

        // Replace the store file with a directory so the next write fails.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        assert!(store.delete(id).is_err());
        assert_eq!(store.list().len(), 1);
        assert!(store.get(id).is_some());
    }

    #[test]
    fn test_save_rejects_blank_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnippetStore::open(dir.path().join("s.json")).unwrap();
        let err = store.save(NewSnippet {
            name: "  ".into(),
            code: "const X = 1".into(),
            ..NewSnippet::default()
        });
        assert!(matches!(err, Err(StoreError::Validation(_))));
        let err = store.save(NewSnippet {
            name: "X".into(),
            code: "\n".into(),
            ..NewSnippet::default()
        });
        assert!(matches!(err, Err(StoreError::Validation(_))));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnippetStore::open(dir.path().join("s.json")).unwrap();
        let ids: Vec<u64> = (0..5)
            .map(|i| store.save(draft(&format!("C{i}"))).unwrap().id)
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_created_at_is_rfc3339() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnippetStore::open(dir.path().join("s.json")).unwrap();
        let snippet = store.save(draft("Card")).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&snippet.created_at).is_ok());
        assert!(snippet.created_at.ends_with('Z'));
    }

    #[test]
    fn test_search_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnippetStore::open(dir.path().join("s.json")).unwrap();
        store
            .save(NewSnippet {
                category: Some("Button".into()),
                ..draft("Primary")
            })
            .unwrap();
        store
            .save(NewSnippet {
                tags: vec!["Auth".into()],
                description: Some("Sign-in form".into()),
                ..draft("Login")
            })
            .unwrap();

        let names = |q: &str| -> Vec<String> {
            store.search(q).iter().map(|s| s.name.clone()).collect()
        };
        assert_eq!(names("button"), ["Primary"]);
        assert_eq!(names("auth"), ["Login"]);
        assert_eq!(names("SIGN-IN"), ["Login"]);
        assert_eq!(names("prim"), ["Primary"]);
        assert!(names("nothing").is_empty());
        assert_eq!(names("").len(), 2);
    }
}
