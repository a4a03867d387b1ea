use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;
use tracing::info;

use crate::config::AppConfig;
use crate::data::prepare_connection;
use crate::error::AppError;
use crate::services::format_reader::FormatReader;
use crate::services::locator_service::ContentProvider;

pub struct AppState {
    pub db: Mutex<Connection>,
    pub db_path: PathBuf,
    pub config: AppConfig,
    pub reader: FormatReader,
    pub provider: Arc<dyn ContentProvider>,
}

impl AppState {
    pub fn open(config: AppConfig, provider: Arc<dyn ContentProvider>) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let db_path = config.database_path();
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        prepare_connection(&conn)?;
        info!(path = %db_path.display(), "database ready");
        Ok(Self::with_connection(conn, db_path, config, provider))
    }

    pub fn in_memory(config: AppConfig, provider: Arc<dyn ContentProvider>) -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()?;
        prepare_connection(&conn)?;
        Ok(Self::with_connection(conn, PathBuf::new(), config, provider))
    }

    fn with_connection(
        conn: Connection,
        db_path: PathBuf,
        config: AppConfig,
        provider: Arc<dyn ContentProvider>,
    ) -> Self {
        let reader = FormatReader::new(config.limits.clone());
        Self {
            db: Mutex::new(conn),
            db_path,
            config,
            reader,
            provider,
        }
    }

    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
