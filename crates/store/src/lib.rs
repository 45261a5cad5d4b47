//! Annotation persistence
//!
//! Wire records, the annotation ⇄ record codec, and the stores that keep
//! records: a REST client, a JSON sidecar file, and an in-memory table.

pub mod bridge;
pub mod codec;
pub mod file;
pub mod http;
pub mod record;
pub mod store;

pub use bridge::{Operation, PersistenceBridge, PersistenceFailure};
pub use codec::{decode, encode, CodecError};
pub use file::JsonFileStore;
pub use http::{HttpStore, ListStyle};
pub use record::AnnotationRecord;
pub use store::{AnnotationStore, MemoryStore, StoreError};
