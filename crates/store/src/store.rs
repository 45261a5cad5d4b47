use markup_model::{AnnotationId, FileId};
use std::collections::HashSet;

use crate::record::AnnotationRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("server responded {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("annotation {0} not found")]
    NotFound(AnnotationId),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Remote or local home of annotation records.
pub trait AnnotationStore {
    /// Persist a new record; the returned row carries the assigned id.
    fn create(&mut self, record: &AnnotationRecord) -> Result<AnnotationRecord, StoreError>;
    fn update(&mut self, id: AnnotationId, record: &AnnotationRecord) -> Result<(), StoreError>;
    fn delete(&mut self, id: AnnotationId) -> Result<(), StoreError>;
    /// Every record of a file. A file with no records yields an empty list.
    fn list_by_file(&self, file_id: FileId) -> Result<Vec<AnnotationRecord>, StoreError>;
}

impl<S: AnnotationStore + ?Sized> AnnotationStore for Box<S> {
    fn create(&mut self, record: &AnnotationRecord) -> Result<AnnotationRecord, StoreError> {
        (**self).create(record)
    }

    fn update(&mut self, id: AnnotationId, record: &AnnotationRecord) -> Result<(), StoreError> {
        (**self).update(id, record)
    }

    fn delete(&mut self, id: AnnotationId) -> Result<(), StoreError> {
        (**self).delete(id)
    }

    fn list_by_file(&self, file_id: FileId) -> Result<Vec<AnnotationRecord>, StoreError> {
        (**self).list_by_file(file_id)
    }
}

/// Record table held in memory, with optional injected failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<AnnotationRecord>,
    next_id: i64,
    create_calls: usize,
    rejected_creates: HashSet<usize>,
    offline: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store; records without an id are assigned one.
    pub fn with_records(records: impl IntoIterator<Item = AnnotationRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            let id = match record.id {
                Some(id) => id,
                None => store.allocate_id(),
            };
            store.next_id = store.next_id.max(id.0);
            store.records.push(record.with_id(id));
        }
        store
    }

    /// Fail the `nth` create call (1-based) with a server error.
    pub fn rejecting_create(mut self, nth: usize) -> Self {
        self.rejected_creates.insert(nth);
        self
    }

    /// While offline every call fails with a transport error.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    fn allocate_id(&mut self) -> AnnotationId {
        self.next_id += 1;
        AnnotationId(self.next_id)
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Transport("connection refused".to_owned()));
        }
        Ok(())
    }
}

impl AnnotationStore for MemoryStore {
    fn create(&mut self, record: &AnnotationRecord) -> Result<AnnotationRecord, StoreError> {
        self.check_online()?;
        self.create_calls += 1;
        if self.rejected_creates.contains(&self.create_calls) {
            return Err(StoreError::Http { status: 500, body: "internal error".to_owned() });
        }
        let id = self.allocate_id();
        let stored = record.with_id(id);
        self.records.push(stored.clone());
        Ok(stored)
    }

    fn update(&mut self, id: AnnotationId, record: &AnnotationRecord) -> Result<(), StoreError> {
        self.check_online()?;
        let slot =
            self.records.iter_mut().find(|r| r.id == Some(id)).ok_or(StoreError::NotFound(id))?;
        *slot = record.with_id(id);
        Ok(())
    }

    fn delete(&mut self, id: AnnotationId) -> Result<(), StoreError> {
        self.check_online()?;
        let index =
            self.records.iter().position(|r| r.id == Some(id)).ok_or(StoreError::NotFound(id))?;
        self.records.remove(index);
        Ok(())
    }

    fn list_by_file(&self, file_id: FileId) -> Result<Vec<AnnotationRecord>, StoreError> {
        self.check_online()?;
        Ok(self.records.iter().filter(|r| r.file_id == file_id.0).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(file_id: i64) -> AnnotationRecord {
        AnnotationRecord {
            id: None,
            project_id: 1,
            file_id,
            kind: "rectangle".into(),
            x: 0.0,
            y: 0.0,
            width: Some(1.0),
            height: Some(1.0),
            text: None,
            color: "#FF0000".into(),
            page: 1,
        }
    }

    #[test]
    fn assigns_increasing_ids() {
        let mut store = MemoryStore::new();
        let a = store.create(&row(1)).unwrap();
        let b = store.create(&row(1)).unwrap();
        assert_eq!(a.id, Some(AnnotationId(1)));
        assert_eq!(b.id, Some(AnnotationId(2)));
    }

    #[test]
    fn lists_only_the_requested_file() {
        let store = MemoryStore::with_records([row(1), row(2), row(1)]);
        assert_eq!(store.list_by_file(FileId(1)).unwrap().len(), 2);
        assert!(store.list_by_file(FileId(9)).unwrap().is_empty());
    }

    #[test]
    fn rejected_create_leaves_no_record() {
        let mut store = MemoryStore::new().rejecting_create(2);
        assert!(store.create(&row(1)).is_ok());
        assert!(matches!(store.create(&row(1)), Err(StoreError::Http { status: 500, .. })));
        assert!(store.create(&row(1)).is_ok());
        assert_eq!(store.records().len(), 2);
    }

    #[test]
    fn missing_ids_are_not_found() {
        let mut store = MemoryStore::new();
        assert!(matches!(store.delete(AnnotationId(4)), Err(StoreError::NotFound(_))));
        assert!(matches!(store.update(AnnotationId(4), &row(1)), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn offline_store_fails_every_call() {
        let mut store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(store.create(&row(1)), Err(StoreError::Transport(_))));
        assert!(store.list_by_file(FileId(1)).is_err());
    }
}
