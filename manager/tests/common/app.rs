use actix_web::web;
use std::sync::Arc;
use std::time::SystemTime;
use tempfile::TempDir;

use agora_manager::database::Database;
use agora_manager::handlers::AppState;
use agora_manager::store::BoardStore;

/// TestApp provides a fully configured application state with an isolated
/// throwaway database per test.
pub struct TestApp {
    pub app_state: web::Data<AppState>,
    pub store: Arc<BoardStore>,
    pub database: Arc<Database>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    /// Create a new isolated test application
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("board.db");
        let database = Arc::new(Database::new(&db_path).expect("failed to open database"));
        let store = Arc::new(BoardStore::new(Arc::clone(&database)));

        let app_state = web::Data::new(AppState {
            database: Arc::clone(&database),
            store: Arc::clone(&store),
            start_time: SystemTime::now(),
        });

        Self {
            app_state,
            store,
            database,
            _temp_dir: temp_dir,
        }
    }

    /// Get the app state
    pub fn app_state(&self) -> &web::Data<AppState> {
        &self.app_state
    }

    /// Get the store
    pub fn store(&self) -> &Arc<BoardStore> {
        &self.store
    }

    /// Get the database
    pub fn db(&self) -> &Arc<Database> {
        &self.database
    }
}
