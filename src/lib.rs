//! School academics backend: class levels, programs, subjects, academic years and terms,
//! exams, questions and exam results over a pluggable document store.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

pub use config::{AppConfig, StoreBackend};
pub use error::{AppError, ConfigError};
pub use model::{Actor, Resource, Role};
pub use response::{created, ok, ok_empty, Envelope};
pub use routes::{api_routes, app, common_routes};
pub use service::Registry;
pub use state::AppState;
pub use store::{collections, DocumentStore, MemoryDocumentStore, PgDocumentStore};
