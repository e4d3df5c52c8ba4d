use lifecycle_core::LifecycleEngine;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LifecycleEngine>,
}

impl AppState {
    pub fn new(engine: Arc<LifecycleEngine>) -> Self {
        Self { engine }
    }
}
