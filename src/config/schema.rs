//! Configuration validation
//!
//! Structural problems are caught here, before any task runs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::types::Project;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::Platform;

/// Validate a resolved project configuration
pub fn validate_project(project: &Project) -> ConfigResult<()> {
    // Every platform key must be a known tag
    let mut platforms = Vec::new();
    for tag in project.config.platforms.keys() {
        platforms.push(Platform::from_str(tag)?);
    }
    platforms.sort();

    // The shared roots must be distinct directories
    let build = &project.config.build;
    let install = &project.config.install;
    let tars = &project.config.tars;
    if build == install || build == tars || install == tars {
        return Err(ConfigError::Invalid(format!(
            "build, install, and tars roots must be distinct (build: {:?}, install: {:?}, tars: {:?})",
            build, install, tars
        )));
    }

    // Configured platforms must resolve to disjoint build roots
    let mut roots: HashMap<PathBuf, Platform> = HashMap::new();
    for platform in platforms {
        let root = project.build_dir(platform);
        if let Some(&other) = roots.get(&root) {
            return Err(ConfigError::CollidingRoots {
                a: other,
                b: platform,
                root,
            });
        }
        roots.insert(root, platform);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse::parse_config;
    use std::path::Path;

    fn project_from(yaml: &str) -> Project {
        let config = parse_config(yaml).unwrap();
        Project::new(config, Path::new("/work/crossforge.yml"))
    }

    #[test]
    fn test_valid_config() {
        let project = project_from(
            r#"
platforms:
  linux: {}
  mac: {}
  windows: {}
"#,
        );
        assert!(validate_project(&project).is_ok());
    }

    #[test]
    fn test_unknown_platform_tag() {
        let project = project_from(
            r#"
platforms:
  linux: {}
  beos: {}
"#,
        );
        let result = validate_project(&project);
        assert!(matches!(
            result,
            Err(ConfigError::UnknownPlatform(tag)) if tag == "beos"
        ));
    }

    #[test]
    fn test_colliding_platform_roots() {
        let project = project_from(
            r#"
platforms:
  linux:
    root: shared
  mac:
    root: shared
"#,
        );
        let result = validate_project(&project);
        match result {
            Err(ConfigError::CollidingRoots { a, b, root }) => {
                assert_eq!(a, Platform::Linux);
                assert_eq!(b, Platform::Mac);
                assert_eq!(root, PathBuf::from("/work/shared"));
            }
            other => panic!("expected CollidingRoots, got {:?}", other),
        }
    }

    #[test]
    fn test_same_arch_different_platforms_ok() {
        // platform-arch tags keep default roots disjoint
        let project = project_from(
            r#"
platforms:
  linux:
    arch: x86_64
  windows:
    arch: x86_64
"#,
        );
        assert!(validate_project(&project).is_ok());
    }

    #[test]
    fn test_shared_top_level_roots_rejected() {
        let project = project_from(
            r#"
build: out
install: out
platforms:
  linux: {}
"#,
        );
        assert!(matches!(
            validate_project(&project),
            Err(ConfigError::Invalid(_))
        ));
    }
}
