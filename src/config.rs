use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_DATABASE_FILE: &str = "docshelf.db";
const DATA_DIR_ENV: &str = "DOCSHELF_DATA_DIR";
const OWNER_ENV: &str = "DOCSHELF_OWNER";

/// Hard ceilings applied to every preview, independent of document content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewLimits {
    pub max_file_bytes: u64,
    pub max_text_lines: usize,
    pub max_sheet_rows: usize,
    pub max_word_chars: usize,
    pub match_context_chars: usize,
}

impl Default for PreviewLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 5 * 1024 * 1024,
            max_text_lines: 500,
            max_sheet_rows: 500,
            max_word_chars: 10_000,
            match_context_chars: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    pub cache_dir: PathBuf,
    pub owner: String,
    pub limits: PreviewLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        let (data_dir, cache_dir) = match project_dirs() {
            Some(dirs) => (dirs.data_dir().to_path_buf(), dirs.cache_dir().to_path_buf()),
            None => {
                let base = std::env::temp_dir().join("docshelf");
                (base.clone(), base.join("cache"))
            }
        };
        Self {
            data_dir,
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            cache_dir,
            owner: default_owner(),
            limits: PreviewLimits::default(),
        }
    }
}

impl AppConfig {
    /// Platform defaults, overlaid by `config.json` in the config dir (when
    /// present) and then by environment overrides.
    pub fn load() -> Result<Self, AppError> {
        let mut config = match project_dirs() {
            Some(dirs) => Self::from_file(&dirs.config_dir().join(CONFIG_FILE_NAME))?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Missing file means defaults; a file that does not parse is an error.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("invalid config '{}': {e}", path.display())))
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    fn apply_env(&mut self) {
        if let Some(dir) = non_blank_env(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(owner) = non_blank_env(OWNER_ENV) {
            self.owner = owner;
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "docshelf", "docshelf")
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn default_owner() -> String {
    non_blank_env("USER")
        .or_else(|| non_blank_env("USERNAME"))
        .unwrap_or_default()
}
