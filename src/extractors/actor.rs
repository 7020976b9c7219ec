//! Authenticated actor from request headers set by the upstream access-control layer.

use crate::error::AppError;
use crate::model::{Actor, Role};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Header carrying the authenticated actor's id.
pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
/// Header carrying the authenticated actor's role (`admin`, `teacher`, `student`).
pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("not logged in".into()))?;
        let id = Uuid::parse_str(id).map_err(|_| AppError::Unauthorized("invalid actor id".into()))?;
        let role: Role = header(parts, ACTOR_ROLE_HEADER)
            .ok_or_else(|| AppError::Unauthorized("missing actor role".into()))?
            .parse()?;
        Ok(Actor { id, role })
    }
}
