//! Annotation-level persistence on top of a record store.

use std::fmt;

use markup_model::{Annotation, FileId};

use crate::codec::{decode, encode, CodecError};
use crate::store::{AnnotationStore, StoreError};

/// Which persistence operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Load,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Operation::Create => "save annotation",
            Operation::Update => "update annotation",
            Operation::Delete => "delete annotation",
            Operation::Load => "load annotations",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceFailure {
    #[error("{operation} failed: {source}")]
    Store {
        operation: Operation,
        #[source]
        source: StoreError,
    },
    #[error("{operation} failed: {source}")]
    Encode {
        operation: Operation,
        #[source]
        source: CodecError,
    },
    #[error("{operation} failed: annotation has not been saved yet")]
    NotSaved { operation: Operation },
}

impl PersistenceFailure {
    pub fn operation(&self) -> Operation {
        match self {
            PersistenceFailure::Store { operation, .. } => *operation,
            PersistenceFailure::Encode { operation, .. } => *operation,
            PersistenceFailure::NotSaved { operation } => *operation,
        }
    }

    fn store(operation: Operation) -> impl FnOnce(StoreError) -> Self {
        move |source| PersistenceFailure::Store { operation, source }
    }

    fn encode(operation: Operation) -> impl FnOnce(CodecError) -> Self {
        move |source| PersistenceFailure::Encode { operation, source }
    }
}

/// Encodes annotations into records and back around an [`AnnotationStore`].
#[derive(Debug)]
pub struct PersistenceBridge<S> {
    store: S,
}

impl<S: AnnotationStore> PersistenceBridge<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Save a new annotation. The result keeps the local key and carries the
    /// assigned id; geometry is normalized on the way in.
    pub fn create(&mut self, annotation: &Annotation) -> Result<Annotation, PersistenceFailure> {
        let normalized = annotation.normalized();
        let record = encode(&normalized).map_err(PersistenceFailure::encode(Operation::Create))?;
        let stored = self
            .store
            .create(&record.without_id())
            .map_err(PersistenceFailure::store(Operation::Create))?;

        let mut saved = normalized;
        if let Some(id) = stored.id {
            saved.assign_id(id);
        }
        tracing::info!(kind = %saved.kind(), page = saved.page(), id = ?saved.id(), "annotation saved");
        Ok(saved)
    }

    pub fn update(&mut self, annotation: &Annotation) -> Result<(), PersistenceFailure> {
        let id =
            annotation.id().ok_or(PersistenceFailure::NotSaved { operation: Operation::Update })?;
        let record = encode(&annotation.normalized())
            .map_err(PersistenceFailure::encode(Operation::Update))?;
        self.store
            .update(id, &record)
            .map_err(PersistenceFailure::store(Operation::Update))?;
        tracing::debug!(%id, "annotation updated");
        Ok(())
    }

    /// Delete the remote record. Unsaved annotations have nothing to delete.
    pub fn delete(&mut self, annotation: &Annotation) -> Result<(), PersistenceFailure> {
        let Some(id) = annotation.id() else {
            return Ok(());
        };
        self.store.delete(id).map_err(PersistenceFailure::store(Operation::Delete))?;
        tracing::debug!(%id, "annotation deleted");
        Ok(())
    }

    /// Every decodable annotation of a file. Records that cannot be decoded
    /// are skipped with a warning.
    pub fn list_by_file(&self, file_id: FileId) -> Result<Vec<Annotation>, PersistenceFailure> {
        let records =
            self.store.list_by_file(file_id).map_err(PersistenceFailure::store(Operation::Load))?;

        let annotations: Vec<Annotation> = records
            .iter()
            .filter_map(|record| match decode(record) {
                Ok(annotation) => Some(annotation),
                Err(err) => {
                    tracing::warn!(id = ?record.id, kind = %record.kind, "skipping record: {err}");
                    None
                }
            })
            .collect();
        tracing::info!(file_id = file_id.0, count = annotations.len(), "annotations loaded");
        Ok(annotations)
    }
}
