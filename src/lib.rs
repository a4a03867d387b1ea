pub mod commands;
pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod state;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::AppConfig;
use error::AppError;
use services::locator_service::FileUriProvider;
use state::AppState;

/// Installs the global subscriber. `RUST_LOG` overrides the default filter;
/// a second call is a no-op.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "docshelf=info".into());
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Loads configuration and opens the on-disk store with the `file://`
/// content provider.
pub fn open_default() -> Result<Arc<AppState>, AppError> {
    init_tracing();
    let config = AppConfig::load()?;
    info!(
        data_dir = %config.data_dir.display(),
        version = env!("CARGO_PKG_VERSION"),
        "starting docshelf"
    );
    let state = AppState::open(config, Arc::new(FileUriProvider))?;
    Ok(Arc::new(state))
}
