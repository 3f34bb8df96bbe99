use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::patients::PatientService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub patients: PatientService,
}
