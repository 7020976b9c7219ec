//! Shared application state for all routes.

use crate::store::{collections, DocumentStore, MemoryDocumentStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        AppState { store }
    }

    /// State over a fresh in-memory store holding every collection.
    pub fn in_memory() -> Self {
        AppState::new(Arc::new(MemoryDocumentStore::new(&collections())))
    }
}
