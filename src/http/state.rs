use std::sync::Arc;

use crate::pipeline::Orchestrator;
use crate::quota::QuotaManager;
use crate::store::Store;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub orchestrator: Arc<Orchestrator>,
    pub quota: Arc<QuotaManager>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            quota: Arc::new(QuotaManager::new(store.clone())),
            store,
            orchestrator,
        }
    }
}
