use std::sync::Arc;

use crate::services::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}
