//! `/api/v1` resource routes.

use crate::handlers::academic::{add_subject, register_admin};
use crate::handlers::entity::{create, delete, list, read, update};
use crate::handlers::exams::{check_result, create_question, create_result, list_exams, list_results, toggle_publish};
use crate::model::{
    AcademicTerm, AcademicYear, Admin, ClassLevel, Exam, ExamResult, Program, Question, Resource, Student, Subject,
    Teacher,
};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

/// Collection + item routes for a resource served entirely by the generic handlers.
fn crud<R: Resource>(path: &str) -> Router<AppState> {
    Router::new()
        .route(path, get(list::<R>).post(create::<R>))
        .route(&format!("{}/:id", path), get(read::<R>).put(update::<R>).delete(delete::<R>))
}

/// Item routes only; the collection route has a bespoke handler.
fn item<R: Resource>(path: &str) -> Router<AppState> {
    Router::new().route(&format!("{}/:id", path), get(read::<R>).put(update::<R>).delete(delete::<R>))
}

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/admins/register", post(register_admin))
        .merge(crud::<Admin>("/admins"))
        .merge(crud::<Teacher>("/teachers"))
        .merge(crud::<Student>("/students"))
        .merge(crud::<ClassLevel>("/class-levels"))
        .merge(crud::<Program>("/programs"))
        .route("/programs/:id/subjects", put(add_subject))
        .merge(crud::<Subject>("/subjects"))
        .merge(crud::<AcademicYear>("/academic-years"))
        .merge(crud::<AcademicTerm>("/academic-terms"))
        .route("/exams", get(list_exams).post(create::<Exam>))
        .merge(item::<Exam>("/exams"))
        .route("/exams/:id/questions", post(create_question))
        .route("/questions", get(list::<Question>))
        .merge(item::<Question>("/questions"))
        .route("/exam-results", get(list_results).post(create_result))
        .merge(item::<ExamResult>("/exam-results"))
        .route("/exam-results/:id/checking", get(check_result))
        .route("/exam-results/:id/admin-toggle-publish", put(toggle_publish))
        .with_state(state)
}
