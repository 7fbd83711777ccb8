//! Common test utilities

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory with a crossforge.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("crossforge.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// A minimal single-platform config
pub fn linux_only_config() -> &'static str {
    r#"
name: testengine
platforms:
  linux:
    arch: x86_64
"#
}
