//! Document persistence: one collection per resource type, documents as JSON objects keyed by UUID.

mod memory;
mod postgres;
pub mod sql;

pub use memory::MemoryDocumentStore;
pub use postgres::{ensure_database_exists, PgDocumentStore};

use crate::error::AppError;
use crate::model::{
    AcademicTerm, AcademicYear, Admin, ClassLevel, Exam, ExamResult, Program, Question, Resource, Student,
    Subject, Teacher,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Exact-match conditions on top-level document fields, ANDed together.
pub type Filter = [(String, Value)];

/// Collection name plus its unique constraints (each a set of fields unique together).
#[derive(Clone, Copy, Debug)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub unique_keys: &'static [&'static [&'static str]],
}

impl CollectionSpec {
    pub fn of<R: Resource>() -> Self {
        CollectionSpec {
            name: R::COLLECTION,
            unique_keys: R::UNIQUE_KEYS,
        }
    }
}

/// Every collection the API serves.
pub fn collections() -> Vec<CollectionSpec> {
    vec![
        CollectionSpec::of::<Admin>(),
        CollectionSpec::of::<Teacher>(),
        CollectionSpec::of::<Student>(),
        CollectionSpec::of::<ClassLevel>(),
        CollectionSpec::of::<Program>(),
        CollectionSpec::of::<Subject>(),
        CollectionSpec::of::<AcademicYear>(),
        CollectionSpec::of::<AcademicTerm>(),
        CollectionSpec::of::<Exam>(),
        CollectionSpec::of::<Question>(),
        CollectionSpec::of::<ExamResult>(),
    ]
}

/// Result of appending an id to a document's reference array.
#[derive(Debug)]
pub enum PushOutcome {
    /// Appended; carries the updated document.
    Pushed(Value),
    AlreadyPresent,
    /// No document with that id.
    Missing,
}

/// Persistence collaborator for the registry. Implementations enforce the
/// collection's unique keys at write time and report violations as `AppError::Conflict`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, AppError>;

    /// Documents whose id is in `ids`, in no particular order. Unknown ids are skipped.
    async fn find_by_ids(&self, collection: &str, ids: &[Uuid]) -> Result<Vec<Value>, AppError>;

    /// All documents matching `filter` (all documents when empty), oldest first.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, AppError>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, AppError> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    async fn count(&self, collection: &str) -> Result<u64, AppError>;

    /// Insert a new document; `doc` must already carry `"id": id`.
    async fn insert(&self, collection: &str, id: Uuid, doc: Value) -> Result<Value, AppError>;

    /// Shallow-merge `changes` into the stored document. `None` when the id is absent.
    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        changes: Map<String, Value>,
    ) -> Result<Option<Value>, AppError>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, AppError>;

    /// Append `target` to the array `field` unless already present, as one write.
    async fn push_reference(
        &self,
        collection: &str,
        id: Uuid,
        field: &str,
        target: Uuid,
    ) -> Result<PushOutcome, AppError>;
}

/// Whether `doc` satisfies every condition of `filter`. Array fields match when
/// they contain every element of the filter array (JSONB `@>` semantics).
pub fn matches_filter(doc: &Value, filter: &Filter) -> bool {
    filter.iter().all(|(k, want)| match (doc.get(k), want) {
        (Some(Value::Array(have)), Value::Array(want)) => want.iter().all(|w| have.contains(w)),
        (Some(have), want) => have == want,
        (None, _) => false,
    })
}

/// Conditions selecting documents that share `doc`'s unique key values.
/// `None` when the collection has no unique keys or `doc` lacks one of them.
pub fn unique_filter(unique_keys: &[&str], doc: &Value) -> Option<Vec<(String, Value)>> {
    if unique_keys.is_empty() {
        return None;
    }
    unique_keys
        .iter()
        .map(|k| match doc.get(*k) {
            Some(v) if !v.is_null() => Some((k.to_string(), v.clone())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_scalars_and_array_containment() {
        let doc = json!({"name": "Niveau 100", "subjects": ["a", "b"]});
        assert!(matches_filter(&doc, &[("name".into(), json!("Niveau 100"))]));
        assert!(!matches_filter(&doc, &[("name".into(), json!("Niveau 200"))]));
        assert!(matches_filter(&doc, &[("subjects".into(), json!(["b"]))]));
        assert!(!matches_filter(&doc, &[("missing".into(), json!(1))]));
        assert!(matches_filter(&doc, &[]));
    }

    #[test]
    fn unique_filter_needs_every_key() {
        let doc = json!({"studentId": "STU1", "exam": "e1"});
        let f = unique_filter(&["studentId", "exam"], &doc).unwrap();
        assert_eq!(f.len(), 2);
        assert!(unique_filter(&["studentId", "subject"], &doc).is_none());
        assert!(unique_filter(&[], &doc).is_none());
    }

    #[test]
    fn every_collection_is_registered_once() {
        let specs = collections();
        let mut names: Vec<_> = specs.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), specs.len());
    }
}
