use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::convert::libreoffice::LibreOfficeEngine;
use crate::infrastructure::storage::s3::StorageService;
use crate::state::AppState;

pub fn create_state(config: AppConfig) -> AppState {
    let storage = StorageService::new(&config);
    let engine = LibreOfficeEngine::new(config.soffice_path.clone());

    AppState::new(config, Arc::new(storage), Arc::new(engine))
}
