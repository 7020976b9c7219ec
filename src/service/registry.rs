//! Generic CRUD over one named collection, with owner/parent reference upkeep.

use crate::error::AppError;
use crate::model::{Actor, DocMeta, ParentLink, Resource, Validate};
use crate::store::{unique_filter, DocumentStore, Filter, PushOutcome};
use chrono::Utc;
use serde_json::Value;
use std::marker::PhantomData;
use uuid::Uuid;

pub struct Registry<'a, R> {
    store: &'a dyn DocumentStore,
    _resource: PhantomData<fn() -> R>,
}

fn doc_id(doc: &Value) -> Option<Uuid> {
    doc.get("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

impl<'a, R: Resource> Registry<'a, R> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Registry {
            store,
            _resource: PhantomData,
        }
    }

    fn not_found(id: Uuid) -> AppError {
        AppError::NotFound(format!("{} {}", R::LABEL, id))
    }

    fn decode(doc: Value) -> Result<R, AppError> {
        Ok(serde_json::from_value(doc)?)
    }

    /// Create; when the resource type tracks its creator, append the id to the actor's record.
    pub async fn create(&self, req: R::Create, actor: &Actor) -> Result<R, AppError> {
        let owner = R::OWNER.map(|link| ParentLink {
            collection: link.collection,
            field: link.field,
            id: actor.id,
        });
        self.insert_linked(req, actor, owner).await
    }

    /// Create and append the new id to `parent.field` (e.g. a question into its exam).
    pub async fn create_under(&self, req: R::Create, actor: &Actor, parent: ParentLink) -> Result<R, AppError> {
        self.insert_linked(req, actor, Some(parent)).await
    }

    async fn insert_linked(&self, mut req: R::Create, actor: &Actor, link: Option<ParentLink>) -> Result<R, AppError> {
        req.normalize();
        req.validate()?;
        self.require_actor(actor).await?;
        // Resolve the link target before writing so a missing owner leaves nothing behind.
        if let Some(l) = &link {
            if self.store.find_by_id(l.collection, l.id).await?.is_none() {
                return Err(AppError::NotFound(format!("{} {}", l.collection, l.id)));
            }
        }

        let record = R::build(req, DocMeta::new(actor.id));
        let id = record.id();
        let doc = serde_json::to_value(&record)?;
        for keys in R::UNIQUE_KEYS {
            let Some(filter) = unique_filter(keys, &doc) else {
                continue;
            };
            if self.store.find_one(R::COLLECTION, &filter).await?.is_some() {
                tracing::warn!(collection = R::COLLECTION, ?keys, "create rejected: duplicate unique key");
                return Err(AppError::Conflict(format!("{} already exists", R::LABEL)));
            }
        }
        self.store.insert(R::COLLECTION, id, doc).await?;
        tracing::info!(collection = R::COLLECTION, %id, actor = %actor.id, "created");

        if let Some(l) = link {
            let outcome = self.store.push_reference(l.collection, l.id, l.field, id).await;
            let failure = match outcome {
                Ok(PushOutcome::Pushed(_)) | Ok(PushOutcome::AlreadyPresent) => None,
                Ok(PushOutcome::Missing) => Some(AppError::NotFound(format!("{} {}", l.collection, l.id))),
                Err(e) => Some(e),
            };
            if let Some(source) = failure {
                tracing::error!(
                    collection = R::COLLECTION,
                    %id,
                    owner = l.collection,
                    error = %source,
                    "resource created but owner link failed"
                );
                return Err(AppError::OwnerLink {
                    collection: R::COLLECTION,
                    resource_id: id,
                    owner: l.collection,
                    source: Box::new(source),
                });
            }
        }
        Ok(record)
    }

    /// The actor must exist in its role's collection.
    async fn require_actor(&self, actor: &Actor) -> Result<(), AppError> {
        match self.store.find_by_id(actor.role.collection(), actor.id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("{} {}", actor.role, actor.id))),
        }
    }

    pub async fn list(&self) -> Result<Vec<R>, AppError> {
        self.list_where(&[]).await
    }

    pub async fn list_where(&self, filter: &Filter) -> Result<Vec<R>, AppError> {
        let docs = self.store.find(R::COLLECTION, filter).await?;
        docs.into_iter().map(Self::decode).collect()
    }

    pub async fn get(&self, id: Uuid) -> Result<R, AppError> {
        let doc = self
            .store
            .find_by_id(R::COLLECTION, id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        Self::decode(doc)
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<R>, AppError> {
        match self.store.find_one(R::COLLECTION, filter).await? {
            Some(doc) => Ok(Some(Self::decode(doc)?)),
            None => Ok(None),
        }
    }

    /// Replace the provided fields and restamp `createdBy`. The uniqueness check
    /// ignores the document being updated, so keeping the current name is allowed.
    pub async fn update(&self, id: Uuid, mut req: R::Update, actor: &Actor) -> Result<R, AppError> {
        req.normalize();
        req.validate()?;
        self.require_actor(actor).await?;
        let current = self
            .store
            .find_by_id(R::COLLECTION, id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        let mut changes = match serde_json::to_value(&req)? {
            Value::Object(m) => m,
            _ => return Err(AppError::BadRequest("update body must be a JSON object".into())),
        };
        changes.insert("createdBy".into(), Value::String(actor.id.to_string()));
        changes.insert("updatedAt".into(), serde_json::to_value(Utc::now())?);

        let mut merged = current;
        if let Value::Object(obj) = &mut merged {
            obj.extend(changes.clone());
        }
        Self::decode(merged.clone())?.check()?;

        for keys in R::UNIQUE_KEYS {
            if !keys.iter().any(|k| changes.contains_key(*k)) {
                continue;
            }
            let Some(filter) = unique_filter(keys, &merged) else {
                continue;
            };
            let holders = self.store.find(R::COLLECTION, &filter).await?;
            if holders.iter().any(|d| doc_id(d) != Some(id)) {
                tracing::warn!(collection = R::COLLECTION, %id, ?keys, "update rejected: duplicate unique key");
                return Err(AppError::Conflict(format!("{} already exists", R::LABEL)));
            }
        }

        let doc = self
            .store
            .update(R::COLLECTION, id, changes)
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        tracing::info!(collection = R::COLLECTION, %id, actor = %actor.id, "updated");
        Self::decode(doc)
    }

    /// Idempotent; referencing arrays on other documents are left as they are.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let removed = self.store.delete(R::COLLECTION, id).await?;
        if removed {
            tracing::info!(collection = R::COLLECTION, %id, "deleted");
        } else {
            tracing::debug!(collection = R::COLLECTION, %id, "delete of absent document");
        }
        Ok(())
    }

    /// Look up a child of type `C` by `child_key` and append its id to this
    /// document's `field` array. `Conflict` when it is already referenced.
    pub async fn add_reference<C: Resource>(
        &self,
        parent_id: Uuid,
        field: &'static str,
        child_key: &Filter,
    ) -> Result<R, AppError> {
        self.get(parent_id).await?;
        let child: C = Registry::<C>::new(self.store)
            .find_one(child_key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} not found", C::LABEL)))?;
        match self
            .store
            .push_reference(R::COLLECTION, parent_id, field, child.id())
            .await?
        {
            PushOutcome::Pushed(doc) => {
                tracing::info!(collection = R::COLLECTION, %parent_id, child = %child.id(), field, "reference added");
                Self::decode(doc)
            }
            PushOutcome::AlreadyPresent => Err(AppError::Conflict(format!(
                "{} already exists in {}",
                C::LABEL,
                R::LABEL.to_lowercase()
            ))),
            PushOutcome::Missing => Err(Self::not_found(parent_id)),
        }
    }
}
