use std::env;
use std::path::PathBuf;

use crate::error::{LocatorError, Result};

/// Environment variable relocating both the config file and the database
pub const HOME_ENV: &str = "FINDEX_HOME";

const APP_DIR: &str = "findex";
const CONFIG_FILENAME: &str = "config.json";
const DATABASE_FILENAME: &str = "index.db";

/// Base directory for findex state
///
/// `FINDEX_HOME` wins when set; otherwise the platform data directory is used
/// (`~/.local/share/findex` on Linux, `~/Library/Application Support/findex` on macOS).
pub fn get_findex_home() -> Result<PathBuf> {
    resolve_home(env::var_os(HOME_ENV).map(PathBuf::from), dirs::data_dir())
}

fn resolve_home(override_dir: Option<PathBuf>, platform_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = override_dir.filter(|dir| !dir.as_os_str().is_empty()) {
        return Ok(dir);
    }
    platform_dir.map(|dir| dir.join(APP_DIR)).ok_or_else(|| {
        LocatorError::Validation(format!(
            "No platform data directory available; set {} explicitly",
            HOME_ENV
        ))
    })
}

/// Default location of the JSON config file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_findex_home()?.join(CONFIG_FILENAME))
}

/// Default location of the SQLite index
pub fn default_database_path() -> Result<PathBuf> {
    Ok(get_findex_home()?.join(DATABASE_FILENAME))
}
