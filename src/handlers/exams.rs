//! Exam, question and exam-result handlers beyond plain CRUD.

use crate::error::AppError;
use crate::model::{
    Actor, Exam, ExamDetail, ExamResult, ExamResultSummary, NewExamResult, NewQuestion, PublishToggle, Question,
    Resource, ResultCheck, Role,
};
use crate::response::{created, ok, Reply};
use crate::service::exams;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

/// GET /exams: questions populated.
pub async fn list_exams(State(state): State<AppState>, actor: Actor) -> Result<Reply<Vec<ExamDetail>>, AppError> {
    actor.require_any(Exam::READ_ROLES)?;
    let rows = exams::exam_details(state.store.as_ref()).await?;
    Ok(ok("Exams fetched successfully", rows))
}

/// POST /exams/:id/questions
pub async fn create_question(
    State(state): State<AppState>,
    actor: Actor,
    Path(exam_id): Path<Uuid>,
    Json(body): Json<NewQuestion>,
) -> Result<Reply<Question>, AppError> {
    actor.require_any(Question::WRITE_ROLES)?;
    let question = exams::add_question(state.store.as_ref(), exam_id, body, &actor).await?;
    Ok(created("Question created", question))
}

/// POST /exam-results
pub async fn create_result(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<NewExamResult>,
) -> Result<Reply<ExamResult>, AppError> {
    actor.require_any(ExamResult::WRITE_ROLES)?;
    let result = exams::record_result(state.store.as_ref(), body, &actor).await?;
    Ok(created("Exam result recorded", result))
}

/// GET /exam-results: `{id, exam}` for every result; any logged-in actor.
pub async fn list_results(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Reply<Vec<ExamResultSummary>>, AppError> {
    let rows = exams::result_summaries(state.store.as_ref()).await?;
    Ok(ok("Exam Results fetched", rows))
}

/// GET /exam-results/:id/checking: students only, their own published result.
pub async fn check_result(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Reply<ResultCheck>, AppError> {
    actor.require_any(&[Role::Student])?;
    let check = exams::check_result(state.store.as_ref(), actor.id, id).await?;
    Ok(ok("Exam result", check))
}

/// PUT /exam-results/:id/admin-toggle-publish
pub async fn toggle_publish(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(body): Json<PublishToggle>,
) -> Result<Reply<ExamResult>, AppError> {
    actor.require_any(&[Role::Admin])?;
    let result = exams::set_published(state.store.as_ref(), id, body.publish).await?;
    Ok(ok("Exam Results Updated", result))
}
