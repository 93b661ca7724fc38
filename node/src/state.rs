use crate::config::AppConfig;
use crate::storage::SharedStore;
use std::sync::Arc;

pub struct AppState {
    config: AppConfig,
    store: SharedStore,
}

impl AppState {
    pub fn new(config: AppConfig, store: SharedStore) -> Arc<Self> {
        Arc::new(Self { config, store })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn build_id(&self) -> &str {
        &self.config.build_id
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }
}
