use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::convert::ConversionEngine;
use crate::infrastructure::storage::ObjectStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub storage: Arc<dyn ObjectStore>,
    pub engine: Arc<dyn ConversionEngine>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStore>,
        engine: Arc<dyn ConversionEngine>,
    ) -> Self {
        Self {
            config,
            storage,
            engine,
        }
    }
}
