//! Core configuration types
//!
//! These structures represent a crossforge.yml project file: the shared
//! directory roots, the global variable layer, and the per-platform table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::runner::Platform;

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Project name (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Build root, relative to the config file's directory
    #[serde(default = "default_build")]
    pub build: PathBuf,

    /// Install root receiving final artifacts
    #[serde(default = "default_install")]
    pub install: PathBuf,

    /// Directory holding vendored source archives
    #[serde(default = "default_tars")]
    pub tars: PathBuf,

    /// Global variable layer
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub vars: HashMap<String, String>,

    /// Per-platform configuration, keyed by platform tag
    #[serde(default)]
    pub platforms: HashMap<String, PlatformConfig>,
}

/// Per-platform configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlatformConfig {
    /// Target architecture tag; defaults per platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,

    /// Build-root override for this platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Platform variable layer
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub vars: HashMap<String, String>,
}

fn default_build() -> PathBuf {
    PathBuf::from("build")
}

fn default_install() -> PathBuf {
    PathBuf::from("install")
}

fn default_tars() -> PathBuf {
    PathBuf::from("tars")
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name: None,
            build: default_build(),
            install: default_install(),
            tars: default_tars(),
            vars: HashMap::new(),
            platforms: HashMap::new(),
        }
    }
}

/// A configuration resolved against its on-disk location
///
/// All relative roots resolve against the directory holding the config
/// file, so a run behaves the same from any working directory.
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory containing the config file
    pub root: PathBuf,
    pub config: Config,
}

impl Project {
    pub fn new(config: Config, config_path: &Path) -> Self {
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Project { root, config }
    }

    /// The platform's entry in the config, if any
    pub fn platform_config(&self, platform: Platform) -> Option<&PlatformConfig> {
        self.config.platforms.get(platform.as_str())
    }

    /// Architecture tag for a platform
    pub fn arch(&self, platform: Platform) -> String {
        self.platform_config(platform)
            .and_then(|pc| pc.arch.clone())
            .unwrap_or_else(|| platform.default_arch().to_string())
    }

    /// Per-platform build directory: `{build}/{platform}-{arch}` unless
    /// the platform overrides its root
    pub fn build_dir(&self, platform: Platform) -> PathBuf {
        if let Some(root) = self.platform_config(platform).and_then(|pc| pc.root.as_ref()) {
            return self.resolve(root);
        }
        self.resolve(&self.config.build)
            .join(self.target_tag(platform))
    }

    /// Per-platform install directory: `{install}/{platform}-{arch}`
    pub fn install_dir(&self, platform: Platform) -> PathBuf {
        self.resolve(&self.config.install)
            .join(self.target_tag(platform))
    }

    /// Shared tarball directory
    pub fn tars_dir(&self) -> PathBuf {
        self.resolve(&self.config.tars)
    }

    /// Platform tags configured in this project, in canonical order
    pub fn configured_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| self.config.platforms.contains_key(p.as_str()))
            .collect()
    }

    fn target_tag(&self, platform: Platform) -> String {
        format!("{}-{}", platform.as_str(), self.arch(platform))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let yaml = r#"
platforms:
  linux: {}
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.build, PathBuf::from("build"));
        assert_eq!(config.install, PathBuf::from("install"));
        assert_eq!(config.tars, PathBuf::from("tars"));
        assert!(config.platforms.contains_key("linux"));
    }

    #[test]
    fn test_deserialize_full_config() {
        let yaml = r#"
name: myengine
build: out/build
vars:
  pythonver: python3.9
platforms:
  linux:
    arch: armv7l
    vars:
      CC: arm-linux-gnueabihf-gcc
  windows:
    root: out/win
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, Some("myengine".to_string()));
        assert_eq!(config.vars.get("pythonver").unwrap(), "python3.9");

        let linux = config.platforms.get("linux").unwrap();
        assert_eq!(linux.arch, Some("armv7l".to_string()));
        assert_eq!(linux.vars.get("CC").unwrap(), "arm-linux-gnueabihf-gcc");

        let windows = config.platforms.get("windows").unwrap();
        assert_eq!(windows.root, Some(PathBuf::from("out/win")));
    }

    #[test]
    fn test_project_dirs() {
        let yaml = r#"
platforms:
  linux:
    arch: x86_64
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let project = Project::new(config, Path::new("/work/engine/crossforge.yml"));

        assert_eq!(project.root, PathBuf::from("/work/engine"));
        assert_eq!(
            project.build_dir(Platform::Linux),
            PathBuf::from("/work/engine/build/linux-x86_64")
        );
        assert_eq!(
            project.install_dir(Platform::Linux),
            PathBuf::from("/work/engine/install/linux-x86_64")
        );
        assert_eq!(project.tars_dir(), PathBuf::from("/work/engine/tars"));
    }

    #[test]
    fn test_platform_root_override() {
        let yaml = r#"
platforms:
  web:
    root: web-build
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let project = Project::new(config, Path::new("/work/crossforge.yml"));
        assert_eq!(
            project.build_dir(Platform::Web),
            PathBuf::from("/work/web-build")
        );
    }

    #[test]
    fn test_default_archs() {
        let config = Config::default();
        let project = Project::new(config, Path::new("/w/crossforge.yml"));
        assert_eq!(project.arch(Platform::Linux), "x86_64");
        assert_eq!(project.arch(Platform::Android), "arm64-v8a");
        assert_eq!(project.arch(Platform::Web), "wasm");
    }

    #[test]
    fn test_configured_platforms_canonical_order() {
        let yaml = r#"
platforms:
  web: {}
  linux: {}
  android: {}
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let project = Project::new(config, Path::new("/w/crossforge.yml"));
        assert_eq!(
            project.configured_platforms(),
            vec![Platform::Linux, Platform::Android, Platform::Web]
        );
    }
}
