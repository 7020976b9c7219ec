//! Registry: generic CRUD over named collections, plus exam and actor operations.

pub mod directory;
pub mod exams;
pub mod populate;
mod registry;
pub mod validation;

pub use registry::Registry;
