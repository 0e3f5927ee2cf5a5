//! Finding and stacking `compbridge` TOML files.
//!
//! Two layers are read: the per-user `config.toml`, then `compbridge.toml`
//! next to the components being previewed. Keys in the project file win.
//! Command-line flags are applied by the binary on top of the result.

use std::path::{Path, PathBuf};

use crate::{CompbridgeConfig, ConfigError, Result};

/// Name of the per-project file.
pub const PROJECT_CONFIG_FILE: &str = "compbridge.toml";

/// Name of the per-user file inside [`xdg_config_dir`].
const USER_CONFIG_FILE: &str = "config.toml";

const APP_NAME: &str = "compbridge";

/// Overrides the per-user config directory.
const CONFIG_DIR_ENV: &str = "COMPBRIDGE_CONFIG_DIR";

/// One candidate file and whether it contributed to the result.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub loaded: bool,
}

/// Merged settings plus the files that were consulted.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: CompbridgeConfig,
    /// User layer first, project layer last.
    pub sources: Vec<ConfigSource>,
    /// One line per layer that existed but could not be parsed.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Merge the user and project layers. `project_dir` defaults to the
/// working directory.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// As [`load_config`], reading the user layer from `config_dir` when given.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = CompbridgeConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Parse a single file.
pub fn load_config_file(path: &Path) -> Result<CompbridgeConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    CompbridgeConfig::from_toml(&contents)
}

/// Write `config` as TOML, creating missing directories.
pub fn save_config(config: &CompbridgeConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Location of the per-user `config.toml`.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// `$COMPBRIDGE_CONFIG_DIR` if set and non-empty, else `compbridge/` under
/// the platform config directory.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Merge `path` into `config` if it exists. Parse failures are recorded in
/// `warnings` rather than aborting the load.
fn load_layer(config: &mut CompbridgeConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[preview]\nsettle_delay_ms = 40\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.preview().settle_delay_ms, 40);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_no_files() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();
        assert!(loaded.config.preview.is_none());
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.sources.len(), 2);
    }

    #[test]
    fn test_load_config_layered_merge() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            "[preview]\nsettle_delay_ms = 80\n[watch]\ndebounce_ms = 20\n",
        )
        .unwrap();
        fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            "[preview]\nsettle_delay_ms = 200\n",
        )
        .unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();
        assert_eq!(loaded.config.preview().settle_delay_ms, 200);
        assert_eq!(loaded.config.watch().debounce_ms, 20);
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_malformed_layer_warns_but_continues() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(user.path().join("config.toml"), "[preview\nbroken").unwrap();
        fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            "[watch]\ndebounce_ms = 5\n",
        )
        .unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.config.watch().debounce_ms, 5);
        assert_eq!(loaded.loaded_from().len(), 1);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = CompbridgeConfig::new();
        config.watch = Some(crate::WatchSection { debounce_ms: 99 });

        save_config(&config, &path).unwrap();
        let reloaded = load_config_file(&path).unwrap();
        assert_eq!(reloaded.watch().debounce_ms, 99);
    }
}
