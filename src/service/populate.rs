//! Read-side joins: resolve stored reference ids into the referenced records.

use crate::error::AppError;
use crate::model::Resource;
use crate::store::DocumentStore;
use std::collections::HashMap;
use uuid::Uuid;

/// Resolve one optional reference. A dangling id (target deleted) yields `None`.
pub async fn fetch_one<T: Resource>(store: &dyn DocumentStore, id: Option<Uuid>) -> Result<Option<T>, AppError> {
    let Some(id) = id else {
        return Ok(None);
    };
    match store.find_by_id(T::COLLECTION, id).await? {
        Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
        None => Ok(None),
    }
}

/// Resolve a reference array in its stored order, skipping dangling ids.
pub async fn fetch_many<T: Resource>(store: &dyn DocumentStore, ids: &[Uuid]) -> Result<Vec<T>, AppError> {
    let by_id = fetch_map::<T>(store, ids).await?;
    Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
}

/// Batch-load records keyed by id, one store round trip.
pub async fn fetch_map<T: Resource>(store: &dyn DocumentStore, ids: &[Uuid]) -> Result<HashMap<Uuid, T>, AppError> {
    let mut unique: Vec<Uuid> = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    let docs = store.find_by_ids(T::COLLECTION, &unique).await?;
    let mut out = HashMap::with_capacity(docs.len());
    for doc in docs {
        let record: T = serde_json::from_value(doc)?;
        out.insert(record.id(), record);
    }
    Ok(out)
}
