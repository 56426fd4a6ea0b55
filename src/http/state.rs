use crate::engine::EngineHandle;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Handle to the engine task that owns the session controller
    pub engine: EngineHandle,
}

impl AppState {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }
}
