//! Exam-specific operations: questions, populated listings, result recording, checking and publishing.

use super::populate::{fetch_many, fetch_map, fetch_one};
use super::registry::Registry;
use crate::error::AppError;
use crate::model::{
    AcademicTerm, AcademicYear, Actor, ClassLevel, Exam, ExamDetail, ExamResult, ExamResultSummary, NewExamResult,
    NewQuestion, ParentLink, Question, Resource, ResultCheck, Student, Validate,
};
use crate::store::DocumentStore;
use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Create a question and append it to the exam's `questions`.
pub async fn add_question(
    store: &dyn DocumentStore,
    exam_id: Uuid,
    req: NewQuestion,
    actor: &Actor,
) -> Result<Question, AppError> {
    Registry::<Exam>::new(store).get(exam_id).await?;
    let parent = ParentLink {
        collection: Exam::COLLECTION,
        field: "questions",
        id: exam_id,
    };
    Registry::<Question>::new(store).create_under(req, actor, parent).await
}

async fn with_questions(store: &dyn DocumentStore, exams: Vec<Exam>) -> Result<Vec<ExamDetail>, AppError> {
    let all_ids: Vec<Uuid> = exams.iter().flat_map(|e| e.questions.iter().copied()).collect();
    let questions = fetch_map::<Question>(store, &all_ids).await?;
    Ok(exams
        .into_iter()
        .map(|exam| {
            let question_details = exam
                .questions
                .iter()
                .filter_map(|id| questions.get(id).cloned())
                .collect();
            ExamDetail { exam, question_details }
        })
        .collect())
}

/// All exams with their questions resolved.
pub async fn exam_details(store: &dyn DocumentStore) -> Result<Vec<ExamDetail>, AppError> {
    let exams = Registry::<Exam>::new(store).list().await?;
    with_questions(store, exams).await
}

/// Record a student's result for an exam and track it on the student's record.
pub async fn record_result(store: &dyn DocumentStore, req: NewExamResult, actor: &Actor) -> Result<ExamResult, AppError> {
    req.validate()?;
    let student = Registry::<Student>::new(store)
        .find_one(&[("studentId".to_string(), Value::String(req.student_id.trim().to_string()))])
        .await?
        .ok_or_else(|| AppError::NotFound(format!("student {}", req.student_id)))?;
    Registry::<Exam>::new(store).get(req.exam).await?;
    let parent = ParentLink {
        collection: Student::COLLECTION,
        field: "examResults",
        id: student.id,
    };
    Registry::<ExamResult>::new(store).create_under(req, actor, parent).await
}

/// `{id, exam}` rows with the exam populated.
pub async fn result_summaries(store: &dyn DocumentStore) -> Result<Vec<ExamResultSummary>, AppError> {
    let results = Registry::<ExamResult>::new(store).list().await?;
    let exam_ids: Vec<Uuid> = results.iter().map(|r| r.exam).collect();
    let exams = fetch_map::<Exam>(store, &exam_ids).await?;
    Ok(results
        .into_iter()
        .map(|r| ExamResultSummary {
            id: r.id,
            exam: exams.get(&r.exam).cloned(),
        })
        .collect())
}

/// A student's own result, only once published.
pub async fn check_result(store: &dyn DocumentStore, student_id: Uuid, result_id: Uuid) -> Result<ResultCheck, AppError> {
    let student = Registry::<Student>::new(store)
        .find_one(&[("id".to_string(), Value::String(student_id.to_string()))])
        .await?
        .ok_or_else(|| AppError::NotFound("No Student Found".into()))?;
    let result = Registry::<ExamResult>::new(store)
        .find_one(&[
            ("id".to_string(), Value::String(result_id.to_string())),
            ("studentId".to_string(), Value::String(student.student_id.clone())),
        ])
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", ExamResult::LABEL, result_id)))?;
    if !result.is_published {
        tracing::debug!(%result_id, student = %student.student_id, "result checked before publication");
        return Err(AppError::NotAvailable(
            "Exam result is not available, check out later".into(),
        ));
    }

    let exam = match fetch_one::<Exam>(store, Some(result.exam)).await? {
        Some(exam) => {
            let question_details = fetch_many::<Question>(store, &exam.questions).await?;
            Some(ExamDetail { exam, question_details })
        }
        None => None,
    };
    Ok(ResultCheck {
        class_level: fetch_one::<ClassLevel>(store, result.class_level).await?,
        academic_term: fetch_one::<AcademicTerm>(store, Some(result.academic_term)).await?,
        academic_year: fetch_one::<AcademicYear>(store, Some(result.academic_year)).await?,
        exam,
        result,
        student,
    })
}

/// Set `isPublished`. Access control is the caller's concern.
pub async fn set_published(store: &dyn DocumentStore, result_id: Uuid, publish: bool) -> Result<ExamResult, AppError> {
    let registry = Registry::<ExamResult>::new(store);
    registry.get(result_id).await?;
    let mut changes = Map::new();
    changes.insert("isPublished".into(), Value::Bool(publish));
    changes.insert("updatedAt".into(), serde_json::to_value(Utc::now())?);
    let doc = store
        .update(ExamResult::COLLECTION, result_id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", ExamResult::LABEL, result_id)))?;
    tracing::info!(%result_id, publish, "exam result publication changed");
    Ok(serde_json::from_value(doc)?)
}
