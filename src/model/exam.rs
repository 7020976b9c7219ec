//! Exams, their questions, and exam results.

use super::academic::{AcademicTerm, AcademicYear, ClassLevel, NAME_MAX};
use super::staff::Student;
use super::{DocMeta, OwnerLink, Resource, Role, Validate};
use crate::error::AppError;
use crate::service::validation::{
    in_range, matches_pattern, max_length, not_blank, one_of, required, trim_field, TIME_OF_DAY,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TEACHER_ONLY: &[Role] = &[Role::Teacher];
const EXAM_STATUSES: &[&str] = &["pending", "live"];
const ANSWER_OPTIONS: &[&str] = &["A", "B", "C", "D"];

fn default_pass_mark() -> u32 {
    50
}

fn default_total_mark() -> u32 {
    100
}

fn default_exam_duration() -> String {
    "30 minutes".into()
}

fn default_exam_type() -> String {
    "Quiz".into()
}

fn default_exam_status() -> String {
    "pending".into()
}

// ---- Exam ----

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub subject: Uuid,
    pub program: Uuid,
    pub pass_mark: u32,
    pub total_mark: u32,
    pub academic_term: Uuid,
    pub academic_year: Uuid,
    pub class_level: Uuid,
    pub duration: String,
    pub exam_date: NaiveDate,
    pub exam_time: String,
    pub exam_type: String,
    pub exam_status: String,
    #[serde(default)]
    pub questions: Vec<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExam {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub subject: Uuid,
    pub program: Uuid,
    #[serde(default = "default_pass_mark")]
    pub pass_mark: u32,
    #[serde(default = "default_total_mark")]
    pub total_mark: u32,
    pub academic_term: Uuid,
    pub academic_year: Uuid,
    pub class_level: Uuid,
    #[serde(default = "default_exam_duration")]
    pub duration: String,
    pub exam_date: NaiveDate,
    pub exam_time: String,
    #[serde(default = "default_exam_type")]
    pub exam_type: String,
    #[serde(default = "default_exam_status")]
    pub exam_status: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_mark: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_mark: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_term: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_level: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_status: Option<String>,
}

fn check_marks(pass_mark: u32, total_mark: u32) -> Result<(), AppError> {
    if total_mark == 0 {
        return Err(AppError::Validation("totalMark must be at least 1".into()));
    }
    if pass_mark > total_mark {
        return Err(AppError::Validation("passMark must not exceed totalMark".into()));
    }
    Ok(())
}

impl Validate for NewExam {
    fn validate(&self) -> Result<(), AppError> {
        required("name", &self.name)?;
        max_length("name", &self.name, NAME_MAX)?;
        matches_pattern("examTime", &self.exam_time, TIME_OF_DAY)?;
        one_of("examStatus", &self.exam_status, EXAM_STATUSES)?;
        required("examType", &self.exam_type)?;
        check_marks(self.pass_mark, self.total_mark)
    }
}

impl Validate for ExamUpdate {
    fn normalize(&mut self) {
        trim_field(&mut self.name);
    }

    fn validate(&self) -> Result<(), AppError> {
        not_blank("name", self.name.as_deref())?;
        if let Some(t) = &self.exam_time {
            matches_pattern("examTime", t, TIME_OF_DAY)?;
        }
        if let Some(s) = &self.exam_status {
            one_of("examStatus", s, EXAM_STATUSES)?;
        }
        not_blank("examType", self.exam_type.as_deref())?;
        if let (Some(pass), Some(total)) = (self.pass_mark, self.total_mark) {
            check_marks(pass, total)?;
        }
        Ok(())
    }
}

impl Resource for Exam {
    const COLLECTION: &'static str = "exams";
    const LABEL: &'static str = "Exam";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["name"]];
    const OWNER: Option<OwnerLink> = Some(OwnerLink {
        collection: "teachers",
        field: "examsCreated",
    });
    const READ_ROLES: &'static [Role] = TEACHER_ONLY;
    const WRITE_ROLES: &'static [Role] = TEACHER_ONLY;

    type Create = NewExam;
    type Update = ExamUpdate;

    fn build(req: NewExam, meta: DocMeta) -> Self {
        Exam {
            id: meta.id,
            name: req.name.trim().to_string(),
            description: req.description,
            subject: req.subject,
            program: req.program,
            pass_mark: req.pass_mark,
            total_mark: req.total_mark,
            academic_term: req.academic_term,
            academic_year: req.academic_year,
            class_level: req.class_level,
            duration: req.duration,
            exam_date: req.exam_date,
            exam_time: req.exam_time,
            exam_type: req.exam_type,
            exam_status: req.exam_status,
            questions: Vec::new(),
            created_by: meta.created_by,
            created_at: meta.now,
            updated_at: meta.now,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn check(&self) -> Result<(), AppError> {
        check_marks(self.pass_mark, self.total_mark)
    }
}

// ---- Question ----

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
    #[serde(default)]
    pub is_correct: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_a: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_b: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_c: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_d: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl Validate for NewQuestion {
    fn validate(&self) -> Result<(), AppError> {
        required("question", &self.question)?;
        required("optionA", &self.option_a)?;
        required("optionB", &self.option_b)?;
        required("optionC", &self.option_c)?;
        required("optionD", &self.option_d)?;
        one_of("correctAnswer", &self.correct_answer, ANSWER_OPTIONS)
    }
}

impl Validate for QuestionUpdate {
    fn normalize(&mut self) {
        trim_field(&mut self.question);
    }

    fn validate(&self) -> Result<(), AppError> {
        not_blank("question", self.question.as_deref())?;
        not_blank("optionA", self.option_a.as_deref())?;
        not_blank("optionB", self.option_b.as_deref())?;
        not_blank("optionC", self.option_c.as_deref())?;
        not_blank("optionD", self.option_d.as_deref())?;
        if let Some(a) = &self.correct_answer {
            one_of("correctAnswer", a, ANSWER_OPTIONS)?;
        }
        Ok(())
    }
}

impl Resource for Question {
    const COLLECTION: &'static str = "questions";
    const LABEL: &'static str = "Question";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["question"]];
    // Linked to its exam rather than to the creating teacher.
    const OWNER: Option<OwnerLink> = None;
    const READ_ROLES: &'static [Role] = TEACHER_ONLY;
    const WRITE_ROLES: &'static [Role] = TEACHER_ONLY;

    type Create = NewQuestion;
    type Update = QuestionUpdate;

    fn build(req: NewQuestion, meta: DocMeta) -> Self {
        Question {
            id: meta.id,
            question: req.question.trim().to_string(),
            option_a: req.option_a,
            option_b: req.option_b,
            option_c: req.option_c,
            option_d: req.option_d,
            correct_answer: req.correct_answer,
            is_correct: false,
            created_by: meta.created_by,
            created_at: meta.now,
            updated_at: meta.now,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

// ---- ExamResult ----

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Passed,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Remarks {
    Excellent,
    Good,
    Poor,
}

impl Remarks {
    /// Banded on the score as a percentage of the total mark.
    pub fn for_score(score: u32, total_mark: u32) -> Self {
        let pct = if total_mark == 0 {
            0.0
        } else {
            f64::from(score) * 100.0 / f64::from(total_mark)
        };
        if pct >= 80.0 {
            Remarks::Excellent
        } else if pct >= 50.0 {
            Remarks::Good
        } else {
            Remarks::Poor
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: Uuid,
    /// Public student number (`Student::student_id`), not the document id.
    pub student_id: String,
    pub exam: Uuid,
    pub grade: f64,
    pub score: u32,
    pub pass_mark: u32,
    #[serde(default)]
    pub answered_questions: Vec<Uuid>,
    pub status: ResultStatus,
    pub remarks: Remarks,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub subject: Option<Uuid>,
    #[serde(default)]
    pub class_level: Option<Uuid>,
    pub academic_term: Uuid,
    pub academic_year: Uuid,
    #[serde(default)]
    pub is_published: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExamResult {
    pub student_id: String,
    pub exam: Uuid,
    pub score: u32,
    #[serde(default = "default_pass_mark")]
    pub pass_mark: u32,
    #[serde(default = "default_total_mark")]
    pub total_mark: u32,
    #[serde(default)]
    pub answered_questions: Vec<Uuid>,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub subject: Option<Uuid>,
    #[serde(default)]
    pub class_level: Option<Uuid>,
    pub academic_term: Uuid,
    pub academic_year: Uuid,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_level: Option<Uuid>,
}

/// Body of `PUT /exam-results/{id}/admin-toggle-publish`.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PublishToggle {
    pub publish: bool,
}

impl Validate for NewExamResult {
    fn validate(&self) -> Result<(), AppError> {
        required("studentId", &self.student_id)?;
        check_marks(self.pass_mark, self.total_mark)?;
        in_range("score", f64::from(self.score), 0.0, f64::from(self.total_mark))
    }
}

impl Validate for ExamResultUpdate {
    fn validate(&self) -> Result<(), AppError> {
        Ok(())
    }
}

impl Resource for ExamResult {
    const COLLECTION: &'static str = "exam_results";
    const LABEL: &'static str = "Exam result";
    // One result per student per exam.
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["studentId", "exam"]];
    const OWNER: Option<OwnerLink> = None;
    // Students see results only through the publication-gated check.
    const READ_ROLES: &'static [Role] = &[Role::Admin, Role::Teacher];
    const WRITE_ROLES: &'static [Role] = &[Role::Admin, Role::Teacher];

    type Create = NewExamResult;
    type Update = ExamResultUpdate;

    fn build(req: NewExamResult, meta: DocMeta) -> Self {
        let status = if req.score >= req.pass_mark {
            ResultStatus::Passed
        } else {
            ResultStatus::Failed
        };
        let grade = if req.total_mark == 0 {
            0.0
        } else {
            f64::from(req.score) * 100.0 / f64::from(req.total_mark)
        };
        ExamResult {
            id: meta.id,
            student_id: req.student_id.trim().to_string(),
            exam: req.exam,
            grade,
            score: req.score,
            pass_mark: req.pass_mark,
            answered_questions: req.answered_questions,
            status,
            remarks: Remarks::for_score(req.score, req.total_mark),
            position: req.position,
            subject: req.subject,
            class_level: req.class_level,
            academic_term: req.academic_term,
            academic_year: req.academic_year,
            is_published: req.is_published,
            created_by: meta.created_by,
            created_at: meta.now,
            updated_at: meta.now,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

// ---- Populated views ----

/// Exam with its questions resolved.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDetail {
    #[serde(flatten)]
    pub exam: Exam,
    pub question_details: Vec<Question>,
}

/// Row of `GET /exam-results`: only the exam, populated.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultSummary {
    pub id: Uuid,
    pub exam: Option<Exam>,
}

/// A student's published result with exam, class level, term and year resolved.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultCheck {
    pub result: ExamResult,
    pub exam: Option<ExamDetail>,
    pub class_level: Option<ClassLevel>,
    pub academic_term: Option<AcademicTerm>,
    pub academic_year: Option<AcademicYear>,
    pub student: Student,
}
