//! Program relationship and actor bootstrap handlers.

use crate::error::AppError;
use crate::model::{Actor, Admin, NewActor, Program, Resource, Subject, SubjectRef, Validate};
use crate::response::{created, ok, Reply};
use crate::service::{directory, Registry};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

/// PUT /programs/:id/subjects: link an existing subject, found by name.
pub async fn add_subject(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(body): Json<SubjectRef>,
) -> Result<Reply<Program>, AppError> {
    actor.require_any(Program::WRITE_ROLES)?;
    body.validate()?;
    let key = [("name".to_string(), Value::String(body.name.trim().to_string()))];
    let program = Registry::<Program>::new(state.store.as_ref())
        .add_reference::<Subject>(id, "subjects", &key)
        .await?;
    Ok(ok("Subject added successfully", program))
}

/// POST /admins/register: only while no admin exists.
pub async fn register_admin(
    State(state): State<AppState>,
    Json(body): Json<NewActor>,
) -> Result<Reply<Admin>, AppError> {
    let admin = directory::register_first_admin(state.store.as_ref(), body).await?;
    Ok(created(format!("{} registered successfully", Admin::LABEL), admin))
}
