//! Configuration file parsing and discovery

use crate::config::types::Config;
use crate::error::{ConfigError, ConfigResult, ForgeError};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["crossforge.yml", "crossforge.yaml"];

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.exists() && config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => {
                return Err(ConfigError::NotFound(searched_paths.join(", ")));
            }
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Config, ForgeError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read file: {}", e)))?;

    parse_config(&contents)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<Config, ForgeError> {
    let mut config: Config = serde_yaml::from_str(yaml)?;
    apply_user_overlay(&mut config);
    Ok(config)
}

/// Parse configuration with automatic file discovery
pub fn parse_config_auto() -> Result<(Config, PathBuf), ForgeError> {
    let config_path = find_config_file()?;
    let config = parse_config_file(&config_path)?;
    Ok((config, config_path))
}

/// User-level variable defaults
///
/// `~/.config/crossforge/config.yml` may carry a `vars` map; project vars
/// win on conflict.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    vars: HashMap<String, String>,
}

fn apply_user_overlay(config: &mut Config) {
    for (name, value) in user_vars() {
        config.vars.entry(name).or_insert(value);
    }
}

fn user_vars() -> HashMap<String, String> {
    let Some(dirs) = directories::ProjectDirs::from("", "", "crossforge") else {
        return HashMap::new();
    };
    let path = dirs.config_dir().join("config.yml");
    let Ok(contents) = fs::read_to_string(&path) else {
        return HashMap::new();
    };
    match serde_yaml::from_str::<UserConfig>(&contents) {
        Ok(user) => user.vars,
        Err(_) => HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_simple_config() {
        let yaml = r#"
vars:
  pythonver: python3.9
platforms:
  linux: {}
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.vars.get("pythonver").unwrap(), "python3.9");
        assert_eq!(config.platforms.len(), 1);
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("crossforge.yml");

        fs::write(
            &config_path,
            r#"
platforms:
  linux: {}
"#,
        )
        .unwrap();

        let found = find_config_file_from(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("crossforge.yml");
        let sub_dir = temp_dir.path().join("subdir");

        fs::create_dir(&sub_dir).unwrap();
        fs::write(
            &config_path,
            r#"
platforms:
  linux: {}
"#,
        )
        .unwrap();

        let found = find_config_file_from(sub_dir).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_config_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = find_config_file_from(temp_dir.path().to_path_buf());
        assert!(result.is_err());
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_config("platforms: [not: a: map");
        assert!(matches!(result, Err(ForgeError::Yaml(_))));
    }
}
