//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::SyncEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<SyncEngine>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Initialize the synchronization engine (store + connection registry)
        let engine = Arc::new(SyncEngine::new(&config));

        Self { config, engine }
    }
}
