//! HTTP handlers for resource CRUD, program links, exams and results.

pub mod academic;
pub mod entity;
pub mod exams;
