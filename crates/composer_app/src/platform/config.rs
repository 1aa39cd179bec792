use std::fs;
use std::path::{Path, PathBuf};

use composer_engine::PageConfig;
use composer_logging::{composer_info, composer_warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Loads the page configuration. No path, or a path that does not exist,
/// yields the defaults; anything present must parse.
pub(crate) fn load_page_config(path: Option<&Path>) -> Result<PageConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(PageConfig::default());
    };
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            composer_warn!("Config {:?} not found; using defaults", path);
            return Ok(PageConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config: PageConfig = ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    composer_info!("Loaded configuration from {:?}", path);
    Ok(config)
}
