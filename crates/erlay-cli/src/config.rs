//! Configuration file loading for the CLI
//!
//! This module handles finding and loading TOML configuration files
//! from various locations (explicit path, local directory, system directory).

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};

use erlay::config::AppConfig;

use crate::error::CliError;

/// Relative path of the project-local configuration file.
const LOCAL_CONFIG: &str = "erlay/config.toml";

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (erlay/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// The loaded configuration is validated before it is returned.
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed
/// - Config values are out of range
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, CliError> {
    let config = match find_config(explicit_path) {
        Some(path) => load_config_file(&path)?,
        None => {
            debug!("No configuration file found, using default configuration");
            AppConfig::default()
        }
    };

    config.validate()?;
    Ok(config)
}

fn find_config(explicit_path: Option<impl AsRef<Path>>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return Some(path.to_path_buf());
    }

    let local_config = Path::new(LOCAL_CONFIG);
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return Some(local_config.to_path_buf());
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "erlay", "erlay") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return Some(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    None
}

fn load_config_file(path: &Path) -> Result<AppConfig, CliError> {
    if !path.exists() {
        return Err(CliError::MissingConfig(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|err| CliError::io(path, err))?;

    toml::from_str(&content)
        .map_err(|err| CliError::config(&path.display().to_string(), content.clone(), &err))
}

#[cfg(test)]
mod tests {
    use erlay::config::{FieldStrategy, VerticalStrategy};
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_explicit_config_is_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[layout]
vertical_strategy = "barycenter"
field_strategy = "dispersal"
refine_budget_ms = 20

[spacing]
entity_width = 300.0
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.layout().vertical_strategy(), VerticalStrategy::Barycenter);
        assert_eq!(config.layout().field_strategy(), FieldStrategy::Dispersal);
        assert_eq!(
            config.layout().refine_budget(),
            Some(std::time::Duration::from_millis(20))
        );
        assert_eq!(config.spacing().entity_width(), 300.0);
        assert_eq!(config.spacing().field_height(), 28.0);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = load_config(Some(&path)).unwrap_err();

        assert!(matches!(err, CliError::MissingConfig(_)));
    }

    #[test]
    fn test_unknown_strategy_is_reported_with_location() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[layout]\nvertical_strategy = \"spiral\"\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();

        match err {
            CliError::Config { span, .. } => assert!(span.is_some()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_range_spacing_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[spacing]\nentity_width = 0.0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();

        assert!(matches!(err, CliError::Layout(_)));
    }
}
