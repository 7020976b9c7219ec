//! Generic resource handlers: create, list, read, update, delete. Mounted once per resource type.

use crate::error::AppError;
use crate::model::{Actor, Resource};
use crate::response::{created, ok, ok_empty, Reply};
use crate::service::Registry;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

pub async fn create<R: Resource>(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<R::Create>,
) -> Result<Reply<R>, AppError> {
    actor.require_any(R::WRITE_ROLES)?;
    let record = Registry::<R>::new(state.store.as_ref()).create(body, &actor).await?;
    Ok(created(format!("{} created successfully", R::LABEL), record))
}

pub async fn list<R: Resource>(State(state): State<AppState>, actor: Actor) -> Result<Reply<Vec<R>>, AppError> {
    actor.require_any(R::READ_ROLES)?;
    let rows = Registry::<R>::new(state.store.as_ref()).list().await?;
    Ok(ok(format!("{}s fetched successfully", R::LABEL), rows))
}

pub async fn read<R: Resource>(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Reply<R>, AppError> {
    actor.require_any(R::READ_ROLES)?;
    let record = Registry::<R>::new(state.store.as_ref()).get(id).await?;
    Ok(ok(format!("{} fetched successfully", R::LABEL), record))
}

pub async fn update<R: Resource>(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(body): Json<R::Update>,
) -> Result<Reply<R>, AppError> {
    actor.require_any(R::WRITE_ROLES)?;
    let record = Registry::<R>::new(state.store.as_ref()).update(id, body, &actor).await?;
    Ok(ok(format!("{} updated successfully", R::LABEL), record))
}

pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Reply<()>, AppError> {
    actor.require_any(R::WRITE_ROLES)?;
    Registry::<R>::new(state.store.as_ref()).delete(id).await?;
    Ok(ok_empty(format!("{} deleted successfully", R::LABEL)))
}
