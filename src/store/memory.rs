//! In-process store with the same contract as PostgreSQL; used by tests and `STORE_BACKEND=memory`.

use super::{matches_filter, unique_filter, CollectionSpec, DocumentStore, Filter, PushOutcome};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Collection {
    unique_keys: &'static [&'static [&'static str]],
    /// Insertion order is preserved.
    docs: Vec<(Uuid, Value)>,
}

impl Collection {
    fn position(&self, id: Uuid) -> Option<usize> {
        self.docs.iter().position(|(doc_id, _)| *doc_id == id)
    }

    /// First key set whose values `doc` shares with another document (not `except`).
    fn violated_keys(&self, doc: &Value, except: Option<Uuid>) -> Option<&'static [&'static str]> {
        self.unique_keys.iter().copied().find(|keys| match unique_filter(keys, doc) {
            Some(filter) => self
                .docs
                .iter()
                .any(|(id, other)| Some(*id) != except && matches_filter(other, &filter)),
            None => false,
        })
    }
}

pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new(specs: &[CollectionSpec]) -> Self {
        let collections = specs
            .iter()
            .map(|s| {
                (
                    s.name.to_string(),
                    Collection {
                        unique_keys: s.unique_keys,
                        docs: Vec::new(),
                    },
                )
            })
            .collect();
        MemoryDocumentStore {
            collections: RwLock::new(collections),
        }
    }
}

fn unknown(collection: &str) -> AppError {
    AppError::NotFound(format!("collection {}", collection))
}

fn conflict(collection: &str, keys: &[&str]) -> AppError {
    AppError::Conflict(format!("{} with the same {} already exists", collection, keys.join(" + ")))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, AppError> {
        let guard = self.collections.read().await;
        let coll = guard.get(collection).ok_or_else(|| unknown(collection))?;
        Ok(coll.position(id).map(|i| coll.docs[i].1.clone()))
    }

    async fn find_by_ids(&self, collection: &str, ids: &[Uuid]) -> Result<Vec<Value>, AppError> {
        let guard = self.collections.read().await;
        let coll = guard.get(collection).ok_or_else(|| unknown(collection))?;
        Ok(coll
            .docs
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, AppError> {
        let guard = self.collections.read().await;
        let coll = guard.get(collection).ok_or_else(|| unknown(collection))?;
        Ok(coll
            .docs
            .iter()
            .filter(|(_, doc)| matches_filter(doc, filter))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<u64, AppError> {
        let guard = self.collections.read().await;
        let coll = guard.get(collection).ok_or_else(|| unknown(collection))?;
        Ok(coll.docs.len() as u64)
    }

    async fn insert(&self, collection: &str, id: Uuid, doc: Value) -> Result<Value, AppError> {
        let mut guard = self.collections.write().await;
        let coll = guard.get_mut(collection).ok_or_else(|| unknown(collection))?;
        if coll.position(id).is_some() {
            return Err(AppError::Conflict(format!("{} {} already exists", collection, id)));
        }
        if let Some(keys) = coll.violated_keys(&doc, None) {
            return Err(conflict(collection, keys));
        }
        coll.docs.push((id, doc.clone()));
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        changes: Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let mut guard = self.collections.write().await;
        let coll = guard.get_mut(collection).ok_or_else(|| unknown(collection))?;
        let Some(i) = coll.position(id) else {
            return Ok(None);
        };
        let mut merged = coll.docs[i].1.clone();
        if let Value::Object(obj) = &mut merged {
            obj.extend(changes);
        }
        if let Some(keys) = coll.violated_keys(&merged, Some(id)) {
            return Err(conflict(collection, keys));
        }
        coll.docs[i].1 = merged.clone();
        Ok(Some(merged))
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, AppError> {
        let mut guard = self.collections.write().await;
        let coll = guard.get_mut(collection).ok_or_else(|| unknown(collection))?;
        match coll.position(id) {
            Some(i) => {
                coll.docs.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn push_reference(
        &self,
        collection: &str,
        id: Uuid,
        field: &str,
        target: Uuid,
    ) -> Result<PushOutcome, AppError> {
        let mut guard = self.collections.write().await;
        let coll = guard.get_mut(collection).ok_or_else(|| unknown(collection))?;
        let Some(i) = coll.position(id) else {
            return Ok(PushOutcome::Missing);
        };
        let doc = &mut coll.docs[i].1;
        let Value::Object(obj) = &mut *doc else {
            return Err(AppError::BadRequest(format!("{} {} is not an object", collection, id)));
        };
        let entry = obj.entry(field.to_string()).or_insert_with(|| Value::Array(Vec::new()));
        if entry.is_null() {
            *entry = Value::Array(Vec::new());
        }
        let Value::Array(items) = entry else {
            return Err(AppError::BadRequest(format!("{}.{} is not an array", collection, field)));
        };
        let target = Value::String(target.to_string());
        if items.contains(&target) {
            return Ok(PushOutcome::AlreadyPresent);
        }
        items.push(target);
        Ok(PushOutcome::Pushed(doc.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryDocumentStore {
        MemoryDocumentStore::new(&[CollectionSpec {
            name: "programs",
            unique_keys: &[&["name"], &["code"]],
        }])
    }

    #[tokio::test]
    async fn insert_enforces_unique_keys() {
        let s = store();
        let a = Uuid::new_v4();
        s.insert("programs", a, json!({"id": a, "name": "Arts"})).await.unwrap();
        let b = Uuid::new_v4();
        let err = s.insert("programs", b, json!({"id": b, "name": "Arts"})).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(s.count("programs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn key_sets_are_enforced_independently() {
        let s = store();
        let a = Uuid::new_v4();
        s.insert("programs", a, json!({"id": a, "name": "Arts", "code": "A001"}))
            .await
            .unwrap();
        let b = Uuid::new_v4();
        let err = s
            .insert("programs", b, json!({"id": b, "name": "Music", "code": "A001"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m.contains("code")));
        s.insert("programs", b, json!({"id": b, "name": "Music", "code": "M001"}))
            .await
            .unwrap();
        assert_eq!(s.count("programs").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn update_merges_and_keeps_self_out_of_unique_check() {
        let s = store();
        let a = Uuid::new_v4();
        s.insert("programs", a, json!({"id": a, "name": "Arts", "duration": "4 years"}))
            .await
            .unwrap();
        let mut changes = Map::new();
        changes.insert("name".into(), json!("Arts"));
        changes.insert("description".into(), json!("Fine arts"));
        let doc = s.update("programs", a, changes).await.unwrap().unwrap();
        assert_eq!(doc["duration"], "4 years");
        assert_eq!(doc["description"], "Fine arts");
        assert!(s.update("programs", Uuid::new_v4(), Map::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn push_reference_is_idempotent() {
        let s = store();
        let a = Uuid::new_v4();
        s.insert("programs", a, json!({"id": a, "name": "Arts", "subjects": []}))
            .await
            .unwrap();
        let sub = Uuid::new_v4();
        assert!(matches!(
            s.push_reference("programs", a, "subjects", sub).await.unwrap(),
            PushOutcome::Pushed(_)
        ));
        assert!(matches!(
            s.push_reference("programs", a, "subjects", sub).await.unwrap(),
            PushOutcome::AlreadyPresent
        ));
        assert!(matches!(
            s.push_reference("programs", Uuid::new_v4(), "subjects", sub).await.unwrap(),
            PushOutcome::Missing
        ));
        let doc = s.find_by_id("programs", a).await.unwrap().unwrap();
        assert_eq!(doc["subjects"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_collection_is_not_found() {
        let s = store();
        assert!(matches!(s.count("exams").await, Err(AppError::NotFound(_))));
    }
}
