//! JSON sidecar persistence
//!
//! Stores every annotation of a document in `<document>.markup.json` next to
//! it, for offline use when no persistence API is available.

use markup_model::{AnnotationId, FileId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::record::AnnotationRecord;
use crate::store::{AnnotationStore, StoreError};

/// Get the sidecar path for a document.
///
/// ```
/// use std::path::Path;
/// use markup_store::file::sidecar_path;
///
/// assert_eq!(
///     sidecar_path(Path::new("/plans/level-1.pdf")),
///     Path::new("/plans/level-1.pdf.markup.json"),
/// );
/// ```
pub fn sidecar_path(document: &Path) -> PathBuf {
    let mut path = document.as_os_str().to_owned();
    path.push(".markup.json");
    PathBuf::from(path)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Sidecar {
    #[serde(default)]
    next_id: i64,
    #[serde(default)]
    annotations: Vec<AnnotationRecord>,
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    sidecar: Sidecar,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let sidecar = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            Sidecar::default()
        };
        Ok(Self { path, sidecar })
    }

    /// Open the sidecar belonging to `document`.
    pub fn for_document(document: &Path) -> Result<Self, StoreError> {
        Self::open(sidecar_path(document))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in the file, whatever its file id.
    pub fn records(&self) -> &[AnnotationRecord] {
        &self.sidecar.annotations
    }

    /// Write `next` atomically through a temporary file, then adopt it.
    ///
    /// On failure the in-memory state stays what is on disk.
    fn commit(&mut self, next: Sidecar) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&next)?;
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;
        self.sidecar = next;
        Ok(())
    }
}

impl AnnotationStore for JsonFileStore {
    fn create(&mut self, record: &AnnotationRecord) -> Result<AnnotationRecord, StoreError> {
        let mut next = self.sidecar.clone();
        let highest = next.annotations.iter().filter_map(|r| r.id).map(|id| id.0).max();
        next.next_id = next.next_id.max(highest.unwrap_or(0)) + 1;
        let stored = record.with_id(AnnotationId(next.next_id));
        next.annotations.push(stored.clone());
        self.commit(next)?;
        Ok(stored)
    }

    fn update(&mut self, id: AnnotationId, record: &AnnotationRecord) -> Result<(), StoreError> {
        let mut next = self.sidecar.clone();
        let slot = next
            .annotations
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or(StoreError::NotFound(id))?;
        *slot = record.with_id(id);
        self.commit(next)
    }

    fn delete(&mut self, id: AnnotationId) -> Result<(), StoreError> {
        let mut next = self.sidecar.clone();
        next.annotations.retain(|r| r.id != Some(id));
        if next.annotations.len() == self.sidecar.annotations.len() {
            return Err(StoreError::NotFound(id));
        }
        self.commit(next)
    }

    fn list_by_file(&self, file_id: FileId) -> Result<Vec<AnnotationRecord>, StoreError> {
        Ok(self.sidecar.annotations.iter().filter(|r| r.file_id == file_id.0).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str) -> AnnotationRecord {
        AnnotationRecord {
            id: None,
            project_id: 1,
            file_id: 3,
            kind: kind.into(),
            x: 5.0,
            y: 6.0,
            width: Some(7.0),
            height: Some(8.0),
            text: None,
            color: "#0000FF".into(),
            page: 1,
        }
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let document = dir.path().join("plan.pdf");

        let mut store = JsonFileStore::for_document(&document).unwrap();
        let created = store.create(&row("rectangle")).unwrap();
        store.create(&row("ellipse")).unwrap();
        store.delete(created.id.unwrap()).unwrap();

        let reopened = JsonFileStore::for_document(&document).unwrap();
        let rows = reopened.list_by_file(FileId(3)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, "ellipse");
        assert!(reopened.path().ends_with("plan.pdf.markup.json"));
    }

    #[test]
    fn ids_are_never_reused() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("a.json")).unwrap();
        let first = store.create(&row("line")).unwrap().id.unwrap();
        store.delete(first).unwrap();
        let second = store.create(&row("line")).unwrap().id.unwrap();
        assert!(second > first);
    }

    #[test]
    fn update_replaces_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("b.json")).unwrap();
        let id = store.create(&row("rectangle")).unwrap().id.unwrap();
        let mut moved = row("rectangle");
        moved.x = 99.0;
        store.update(id, &moved).unwrap();
        assert_eq!(store.list_by_file(FileId(3)).unwrap()[0].x, 99.0);
        assert!(matches!(store.update(AnnotationId(42), &moved), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn corrupt_sidecar_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Json(_))));
    }

    #[test]
    fn failed_create_is_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("missing").join("d.json")).unwrap();

        assert!(matches!(store.create(&row("rectangle")), Err(StoreError::Io(_))));
        assert!(store.list_by_file(FileId(3)).unwrap().is_empty());
        assert!(store.records().is_empty());
    }

    #[test]
    fn failed_delete_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("plans");
        fs::create_dir(&folder).unwrap();
        let mut store = JsonFileStore::open(folder.join("e.json")).unwrap();
        let id = store.create(&row("line")).unwrap().id.unwrap();

        fs::remove_dir_all(&folder).unwrap();
        assert!(matches!(store.delete(id), Err(StoreError::Io(_))));
        assert_eq!(store.list_by_file(FileId(3)).unwrap().len(), 1);

        fs::create_dir(&folder).unwrap();
        store.delete(id).unwrap();
        assert!(store.list_by_file(FileId(3)).unwrap().is_empty());
        assert!(JsonFileStore::open(folder.join("e.json")).unwrap().records().is_empty());
    }
}
