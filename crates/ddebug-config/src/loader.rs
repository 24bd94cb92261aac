//! Configuration file loading and validation
//!
//! - [`load_config`] - Strict loader, errors if file missing
//! - [`load_config_from_str`] - Parse and validate TOML text
//! - [`load_default_config`] - Best-effort loader used by the process-wide instance

use crate::constants::{DEFAULT_CONFIG_FILENAME, ENV_DDEBUG_CONFIG};
use crate::paths::user_config_path;
use crate::Config;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Errors that can occur during config loading
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Find the config file to use.
///
/// Resolution order:
/// 1. `DDEBUG_CONFIG`
/// 2. `./ddebug.toml`
/// 3. `<user config dir>/ddebug/ddebug.toml`
///
/// Returns `None` when no candidate exists.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_DDEBUG_CONFIG) {
        if !path.is_empty() {
            debug!(path = %path, "Using config path from environment");
            return Some(PathBuf::from(path));
        }
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILENAME);
    if local.exists() {
        debug!(path = %local.display(), "Found config in working directory");
        return Some(local);
    }

    user_config_path().filter(|p| p.exists())
}

/// Load configuration from a TOML file (strict - no side effects)
///
/// # Returns
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError::NotFound)` - Config file does not exist
/// * `Err(ConfigError)` - Failed to read, parse or validate
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    debug!(path = %path.display(), "Loading config file");
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parse and validate configuration text.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Configuration of the process-wide instance.
///
/// Loads the resolved config file when there is one, falls back to defaults
/// on any error (logged), then applies environment overrides.
pub fn load_default_config() -> Config {
    let config = match resolve_config_path() {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid ddebug config");
                Config::default()
            }
        },
        None => Config::default(),
    };
    config.with_env_overrides()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PostMortemPolicy;
    use std::io::Write;

    #[test]
    fn test_load_config_from_str_partial() {
        let config = load_config_from_str(
            r#"
            [inspect]
            prefix = ">> "

            [failure]
            post_mortem = "never"
            "#,
        )
        .unwrap();
        assert_eq!(config.inspect.prefix, ">> ");
        assert!(config.inspect.include_context);
        assert_eq!(config.failure.post_mortem, PostMortemPolicy::Never);
        assert_eq!(config.trace.depth, 1);
    }

    #[test]
    fn test_load_config_from_str_empty_is_default() {
        assert_eq!(load_config_from_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_load_config_parse_error() {
        let err = load_config_from_str("[trace]\ndepth = \"deep\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_validation_error() {
        let err = load_config_from_str("[trace]\ndepth = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_load_config_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddebug.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "enabled = false\n[trace]\ndepth = 3").unwrap();
        drop(file);

        let config = load_config(&path).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.trace.depth, 3);
    }
}
