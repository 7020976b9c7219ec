//! Class levels, programs, subjects, academic years and terms.

use super::{DocMeta, OwnerLink, Resource, Role, Validate};
use crate::error::AppError;
use crate::service::validation::{max_length, not_blank, required, trim_field};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NAME_MAX: usize = 120;
pub const DESCRIPTION_MAX: usize = 2000;

const ADMIN_ONLY: &[Role] = &[Role::Admin];

fn default_term_duration() -> String {
    "3 months".into()
}

fn default_program_duration() -> String {
    "4 years".into()
}

fn check_name(name: &str) -> Result<(), AppError> {
    required("name", name)?;
    max_length("name", name, NAME_MAX)
}

fn check_optional_name(name: Option<&str>) -> Result<(), AppError> {
    not_blank("name", name)?;
    match name {
        Some(n) => max_length("name", n, NAME_MAX),
        None => Ok(()),
    }
}

fn check_description(description: Option<&str>) -> Result<(), AppError> {
    match description {
        Some(d) => max_length("description", d, DESCRIPTION_MAX),
        None => Ok(()),
    }
}

// ---- ClassLevel ----

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassLevel {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: Option<String>,
    pub created_by: Uuid,
    #[serde(default)]
    pub students: Vec<Uuid>,
    #[serde(default)]
    pub subjects: Vec<Uuid>,
    #[serde(default)]
    pub teachers: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClassLevel {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassLevelUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl Validate for NewClassLevel {
    fn validate(&self) -> Result<(), AppError> {
        check_name(&self.name)?;
        check_description(Some(&self.description))
    }
}

impl Validate for ClassLevelUpdate {
    fn normalize(&mut self) {
        trim_field(&mut self.name);
    }

    fn validate(&self) -> Result<(), AppError> {
        check_optional_name(self.name.as_deref())?;
        check_description(self.description.as_deref())
    }
}

impl Resource for ClassLevel {
    const COLLECTION: &'static str = "class_levels";
    const LABEL: &'static str = "Class level";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["name"]];
    const OWNER: Option<OwnerLink> = Some(OwnerLink {
        collection: "admins",
        field: "classLevels",
    });
    const READ_ROLES: &'static [Role] = ADMIN_ONLY;
    const WRITE_ROLES: &'static [Role] = ADMIN_ONLY;

    type Create = NewClassLevel;
    type Update = ClassLevelUpdate;

    fn build(req: NewClassLevel, meta: DocMeta) -> Self {
        ClassLevel {
            id: meta.id,
            name: req.name.trim().to_string(),
            description: req.description,
            duration: req.duration,
            created_by: meta.created_by,
            students: Vec::new(),
            subjects: Vec::new(),
            teachers: Vec::new(),
            created_at: meta.now,
            updated_at: meta.now,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

// ---- Program ----

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub duration: String,
    pub code: String,
    pub created_by: Uuid,
    #[serde(default)]
    pub teachers: Vec<Uuid>,
    #[serde(default)]
    pub students: Vec<Uuid>,
    #[serde(default)]
    pub class_levels: Vec<Uuid>,
    #[serde(default)]
    pub subjects: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProgram {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_program_duration")]
    pub duration: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// Body of `PUT /programs/{id}/subjects`: the subject is looked up by name.
#[derive(Clone, Debug, Deserialize)]
pub struct SubjectRef {
    pub name: String,
}

impl Validate for NewProgram {
    fn validate(&self) -> Result<(), AppError> {
        check_name(&self.name)?;
        check_description(Some(&self.description))?;
        required("duration", &self.duration)
    }
}

impl Validate for ProgramUpdate {
    fn normalize(&mut self) {
        trim_field(&mut self.name);
    }

    fn validate(&self) -> Result<(), AppError> {
        check_optional_name(self.name.as_deref())?;
        check_description(self.description.as_deref())?;
        not_blank("duration", self.duration.as_deref())
    }
}

impl Validate for SubjectRef {
    fn validate(&self) -> Result<(), AppError> {
        required("name", &self.name)
    }
}

/// Upper-case initials of the name's words followed by three digits drawn from the id.
pub fn program_code(name: &str, id: Uuid) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect();
    format!("{}{:03}", initials, id.as_u128() % 1000)
}

impl Resource for Program {
    const COLLECTION: &'static str = "programs";
    const LABEL: &'static str = "Program";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["name"]];
    const OWNER: Option<OwnerLink> = Some(OwnerLink {
        collection: "admins",
        field: "programs",
    });
    const READ_ROLES: &'static [Role] = ADMIN_ONLY;
    const WRITE_ROLES: &'static [Role] = ADMIN_ONLY;

    type Create = NewProgram;
    type Update = ProgramUpdate;

    fn build(req: NewProgram, meta: DocMeta) -> Self {
        let name = req.name.trim().to_string();
        Program {
            id: meta.id,
            code: program_code(&name, meta.id),
            name,
            description: req.description,
            duration: req.duration,
            created_by: meta.created_by,
            teachers: Vec::new(),
            students: Vec::new(),
            class_levels: Vec::new(),
            subjects: Vec::new(),
            created_at: meta.now,
            updated_at: meta.now,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

// ---- Subject ----

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub teacher: Option<Uuid>,
    #[serde(default)]
    pub academic_term: Option<Uuid>,
    pub duration: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub teacher: Option<Uuid>,
    #[serde(default)]
    pub academic_term: Option<Uuid>,
    #[serde(default = "default_term_duration")]
    pub duration: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_term: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl Validate for NewSubject {
    fn validate(&self) -> Result<(), AppError> {
        check_name(&self.name)?;
        check_description(Some(&self.description))
    }
}

impl Validate for SubjectUpdate {
    fn normalize(&mut self) {
        trim_field(&mut self.name);
    }

    fn validate(&self) -> Result<(), AppError> {
        check_optional_name(self.name.as_deref())?;
        check_description(self.description.as_deref())?;
        not_blank("duration", self.duration.as_deref())
    }
}

impl Resource for Subject {
    const COLLECTION: &'static str = "subjects";
    const LABEL: &'static str = "Subject";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["name"]];
    const OWNER: Option<OwnerLink> = None;
    const READ_ROLES: &'static [Role] = ADMIN_ONLY;
    const WRITE_ROLES: &'static [Role] = ADMIN_ONLY;

    type Create = NewSubject;
    type Update = SubjectUpdate;

    fn build(req: NewSubject, meta: DocMeta) -> Self {
        Subject {
            id: meta.id,
            name: req.name.trim().to_string(),
            description: req.description,
            teacher: req.teacher,
            academic_term: req.academic_term,
            duration: req.duration,
            created_by: meta.created_by,
            created_at: meta.now,
            updated_at: meta.now,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

// ---- AcademicYear ----

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYear {
    pub id: Uuid,
    pub name: String,
    pub from_year: NaiveDate,
    pub to_year: NaiveDate,
    #[serde(default)]
    pub is_current: bool,
    pub created_by: Uuid,
    #[serde(default)]
    pub students: Vec<Uuid>,
    #[serde(default)]
    pub teachers: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAcademicYear {
    pub name: String,
    pub from_year: NaiveDate,
    pub to_year: NaiveDate,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYearUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_year: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_year: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_current: Option<bool>,
}

fn check_year_span(from: NaiveDate, to: NaiveDate) -> Result<(), AppError> {
    if from > to {
        return Err(AppError::Validation("fromYear must not be after toYear".into()));
    }
    Ok(())
}

impl Validate for NewAcademicYear {
    fn validate(&self) -> Result<(), AppError> {
        check_name(&self.name)?;
        check_year_span(self.from_year, self.to_year)
    }
}

impl Validate for AcademicYearUpdate {
    fn normalize(&mut self) {
        trim_field(&mut self.name);
    }

    fn validate(&self) -> Result<(), AppError> {
        check_optional_name(self.name.as_deref())?;
        if let (Some(from), Some(to)) = (self.from_year, self.to_year) {
            check_year_span(from, to)?;
        }
        Ok(())
    }
}

impl Resource for AcademicYear {
    const COLLECTION: &'static str = "academic_years";
    const LABEL: &'static str = "Academic year";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["name"]];
    const OWNER: Option<OwnerLink> = Some(OwnerLink {
        collection: "admins",
        field: "academicYears",
    });
    const READ_ROLES: &'static [Role] = ADMIN_ONLY;
    const WRITE_ROLES: &'static [Role] = ADMIN_ONLY;

    type Create = NewAcademicYear;
    type Update = AcademicYearUpdate;

    fn build(req: NewAcademicYear, meta: DocMeta) -> Self {
        AcademicYear {
            id: meta.id,
            name: req.name.trim().to_string(),
            from_year: req.from_year,
            to_year: req.to_year,
            is_current: req.is_current,
            created_by: meta.created_by,
            students: Vec::new(),
            teachers: Vec::new(),
            created_at: meta.now,
            updated_at: meta.now,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    // A partial update may move only one end of the span.
    fn check(&self) -> Result<(), AppError> {
        check_year_span(self.from_year, self.to_year)
    }
}

// ---- AcademicTerm ----

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicTerm {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub duration: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAcademicTerm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_term_duration")]
    pub duration: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicTermUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl Validate for NewAcademicTerm {
    fn validate(&self) -> Result<(), AppError> {
        check_name(&self.name)?;
        check_description(Some(&self.description))?;
        required("duration", &self.duration)
    }
}

impl Validate for AcademicTermUpdate {
    fn normalize(&mut self) {
        trim_field(&mut self.name);
    }

    fn validate(&self) -> Result<(), AppError> {
        check_optional_name(self.name.as_deref())?;
        check_description(self.description.as_deref())?;
        not_blank("duration", self.duration.as_deref())
    }
}

impl Resource for AcademicTerm {
    const COLLECTION: &'static str = "academic_terms";
    const LABEL: &'static str = "Academic term";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["name"]];
    const OWNER: Option<OwnerLink> = Some(OwnerLink {
        collection: "admins",
        field: "academicTerms",
    });
    const READ_ROLES: &'static [Role] = ADMIN_ONLY;
    const WRITE_ROLES: &'static [Role] = ADMIN_ONLY;

    type Create = NewAcademicTerm;
    type Update = AcademicTermUpdate;

    fn build(req: NewAcademicTerm, meta: DocMeta) -> Self {
        AcademicTerm {
            id: meta.id,
            name: req.name.trim().to_string(),
            description: req.description,
            duration: req.duration,
            created_by: meta.created_by,
            created_at: meta.now,
            updated_at: meta.now,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_code_uses_initials() {
        let id = Uuid::from_u128(123_456);
        assert_eq!(program_code("Computer science engineering", id), "CSE456");
        assert_eq!(program_code("arts", Uuid::from_u128(7)), "A007");
    }

    #[test]
    fn year_span_is_checked() {
        let req = NewAcademicYear {
            name: "2024-2025".into(),
            from_year: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            to_year: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            is_current: false,
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn update_rejects_blank_name_but_allows_absent() {
        let mut upd = ClassLevelUpdate::default();
        assert!(upd.validate().is_ok());
        upd.name = Some(" ".into());
        assert!(upd.validate().is_err());
    }

    #[test]
    fn update_serializes_only_present_fields() {
        let upd = ProgramUpdate {
            description: Some("new".into()),
            ..Default::default()
        };
        let v = serde_json::to_value(&upd).unwrap();
        assert_eq!(v, serde_json::json!({"description": "new"}));
    }
}
