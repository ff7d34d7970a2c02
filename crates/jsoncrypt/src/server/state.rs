//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use jsoncrypt::registry::ColumnRegistry;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable so that Axum can clone the state for each
/// request without copying column configurations.
#[derive(Clone)]
pub struct AppState {
    /// Lock-free registry of encrypted columns.
    pub registry: ColumnRegistry,
    /// Name of the HTTP header used to identify the record type of each request.
    pub entity_header_name: Arc<String>,
}

impl AppState {
    /// Create a new [`AppState`] with the provided registry and header name.
    pub fn new(registry: ColumnRegistry, entity_header_name: String) -> Self {
        Self {
            registry,
            entity_header_name: Arc::new(entity_header_name),
        }
    }
}

impl Default for AppState {
    /// Creates a default [`AppState`] with an empty registry, suitable for tests.
    fn default() -> Self {
        Self::new(ColumnRegistry::new(), "X-Entity-Name".into())
    }
}
