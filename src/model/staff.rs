//! Actor records: admins, teachers and students. Each tracks the ids of what it owns.

use super::{DocMeta, OwnerLink, Resource, Role, Validate};
use crate::error::AppError;
use crate::service::validation::{email, max_length, not_blank, required, trim_field};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const NAME_MAX: usize = 120;

#[derive(Clone, Debug, Deserialize)]
pub struct NewActor {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActorUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Validate for NewActor {
    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
    }

    fn validate(&self) -> Result<(), AppError> {
        required("name", &self.name)?;
        max_length("name", &self.name, NAME_MAX)?;
        required("email", &self.email)?;
        email("email", &self.email)
    }
}

impl Validate for ActorUpdate {
    fn normalize(&mut self) {
        trim_field(&mut self.name);
        if let Some(e) = &mut self.email {
            *e = normalize_email(e);
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        not_blank("name", self.name.as_deref())?;
        if let Some(e) = &self.email {
            email("email", e)?;
        }
        Ok(())
    }
}

fn normalize_email(e: &str) -> String {
    e.trim().to_lowercase()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub class_levels: Vec<Uuid>,
    #[serde(default)]
    pub programs: Vec<Uuid>,
    #[serde(default)]
    pub academic_years: Vec<Uuid>,
    #[serde(default)]
    pub academic_terms: Vec<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for Admin {
    const COLLECTION: &'static str = "admins";
    const LABEL: &'static str = "Admin";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["email"]];
    const OWNER: Option<OwnerLink> = None;
    const READ_ROLES: &'static [Role] = &[Role::Admin];
    const WRITE_ROLES: &'static [Role] = &[Role::Admin];

    type Create = NewActor;
    type Update = ActorUpdate;

    fn build(req: NewActor, meta: DocMeta) -> Self {
        Admin {
            id: meta.id,
            name: req.name.trim().to_string(),
            email: normalize_email(&req.email),
            role: Role::Admin,
            class_levels: Vec::new(),
            programs: Vec::new(),
            academic_years: Vec::new(),
            academic_terms: Vec::new(),
            created_by: meta.created_by,
            created_at: meta.now,
            updated_at: meta.now,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub exams_created: Vec<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for Teacher {
    const COLLECTION: &'static str = "teachers";
    const LABEL: &'static str = "Teacher";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["email"]];
    const OWNER: Option<OwnerLink> = None;
    const READ_ROLES: &'static [Role] = &[Role::Admin];
    const WRITE_ROLES: &'static [Role] = &[Role::Admin];

    type Create = NewActor;
    type Update = ActorUpdate;

    fn build(req: NewActor, meta: DocMeta) -> Self {
        Teacher {
            id: meta.id,
            name: req.name.trim().to_string(),
            email: normalize_email(&req.email),
            role: Role::Teacher,
            exams_created: Vec::new(),
            created_by: meta.created_by,
            created_at: meta.now,
            updated_at: meta.now,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Public student number, e.g. `STU4F0C2A9E`.
    pub student_id: String,
    #[serde(default)]
    pub exam_results: Vec<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `STU` followed by the first eight hex digits of the document id, upper-cased.
pub fn student_number(id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!("STU{}", hex[..8].to_uppercase())
}

impl Resource for Student {
    const COLLECTION: &'static str = "students";
    const LABEL: &'static str = "Student";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&["email"], &["studentId"]];
    const OWNER: Option<OwnerLink> = None;
    const READ_ROLES: &'static [Role] = &[Role::Admin, Role::Teacher];
    const WRITE_ROLES: &'static [Role] = &[Role::Admin];

    type Create = NewActor;
    type Update = ActorUpdate;

    fn build(req: NewActor, meta: DocMeta) -> Self {
        Student {
            id: meta.id,
            name: req.name.trim().to_string(),
            email: normalize_email(&req.email),
            role: Role::Student,
            student_id: student_number(meta.id),
            exam_results: Vec::new(),
            created_by: meta.created_by,
            created_at: meta.now,
            updated_at: meta.now,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }
}
