use shared_config::AppConfig;

use crate::realtime::RealtimeDatabase;

/// Process-wide handles, built once in `main` and shared as `Arc<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: RealtimeDatabase,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let db = RealtimeDatabase::new(&config);
        Self { config, db }
    }
}
