//! Typed academic records and the `Resource` contract the registry is generic over.

mod academic;
mod exam;
mod staff;

pub use academic::*;
pub use exam::*;
pub use staff::*;

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role of an authenticated actor. Each role has its own actor collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn collection(self) -> &'static str {
        match self {
            Role::Admin => Admin::COLLECTION,
            Role::Teacher => Teacher::COLLECTION,
            Role::Student => Student::COLLECTION,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            _ => Err(AppError::Unauthorized(format!("unknown role: {}", s))),
        }
    }
}

/// The authenticated caller, as handed over by the access-control layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Actor { id, role }
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("{} role may not perform this action", self.role)))
        }
    }
}

/// Tracking array on an actor record that receives the ids of resources it creates.
#[derive(Clone, Copy, Debug)]
pub struct OwnerLink {
    pub collection: &'static str,
    pub field: &'static str,
}

/// Reference array on a specific parent document (e.g. an exam's `questions`).
#[derive(Clone, Copy, Debug)]
pub struct ParentLink {
    pub collection: &'static str,
    pub field: &'static str,
    pub id: Uuid,
}

/// Server-assigned fields stamped on every new document.
#[derive(Clone, Copy, Debug)]
pub struct DocMeta {
    pub id: Uuid,
    pub created_by: Uuid,
    pub now: DateTime<Utc>,
}

impl DocMeta {
    pub fn new(created_by: Uuid) -> Self {
        DocMeta {
            id: Uuid::new_v4(),
            created_by,
            now: Utc::now(),
        }
    }
}

/// Request payload check run before anything reaches the registry.
pub trait Validate {
    /// Canonical form of free-text fields (trimmed names, lower-cased emails),
    /// applied before validation and uniqueness checks.
    fn normalize(&mut self) {}

    fn validate(&self) -> Result<(), AppError>;
}

/// A named document collection managed by `Registry`.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Human label used in envelope messages, e.g. "Class level".
    const LABEL: &'static str;
    /// Unique constraints; each entry is a set of fields unique together. Empty for none.
    const UNIQUE_KEYS: &'static [&'static [&'static str]];
    /// Actor tracking array updated on create, if any.
    const OWNER: Option<OwnerLink>;
    const READ_ROLES: &'static [Role];
    const WRITE_ROLES: &'static [Role];

    type Create: Validate + DeserializeOwned + Send + 'static;
    /// Optional fields; `None` fields must be skipped when serialized.
    type Update: Validate + Serialize + DeserializeOwned + Send + 'static;

    fn build(req: Self::Create, meta: DocMeta) -> Self;

    fn id(&self) -> Uuid;

    /// Whole-record invariants, re-run on the merged document after an update.
    fn check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" teacher ".parse::<Role>().unwrap(), Role::Teacher);
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn role_collections() {
        assert_eq!(Role::Admin.collection(), "admins");
        assert_eq!(Role::Student.collection(), "students");
    }
}
