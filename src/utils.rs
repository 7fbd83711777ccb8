//! Small shared helpers

use std::path::{Path, PathBuf};

use glob::glob;

use crate::error::{FileError, FileResult};

/// Locate a vendored source archive by name-version convention
///
/// `find_tarball(tars, "binutils")` resolves `binutils-2.33.1.tar.gz` and
/// friends. When several versions are present the lexically greatest wins.
pub fn find_tarball(dir: &Path, name: &str) -> FileResult<PathBuf> {
    let pattern = dir.join(format!("{}-*.tar.*", name));
    let pattern = pattern.to_string_lossy();

    let mut matches: Vec<PathBuf> = glob(&pattern)
        .map_err(|_| FileError::TarballNotFound(name.to_string(), dir.to_path_buf()))?
        .filter_map(std::result::Result::ok)
        .collect();
    matches.sort();

    matches
        .pop()
        .ok_or_else(|| FileError::TarballNotFound(name.to_string(), dir.to_path_buf()))
}
