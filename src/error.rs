//! Error types for crossforge

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::runner::Platform;

/// Result type alias for crossforge operations
pub type Result<T> = std::result::Result<T, ForgeError>;

/// Main error type for crossforge
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Render(#[from] RenderError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Filesystem helper errors
    #[error("File operation error: {0}")]
    File(#[from] FileError),

    /// A platform sequence halted at a failing task
    #[error("Halted at task '{task}' for platform '{platform}'")]
    Halted { platform: Platform, task: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration parsing, validation, and registration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown platform tag '{0}'")]
    UnknownPlatform(String),

    #[error("Unknown task kind '{0}'")]
    UnknownKind(String),

    #[error("Task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("Task '{0}' declares an empty platform set")]
    EmptyPlatforms(String),

    #[error("Platforms '{a}' and '{b}' resolve to the same build root {root:?}")]
    CollidingRoots {
        a: Platform,
        b: Platform,
        root: PathBuf,
    },

    #[error("Platform '{0}' is not configured")]
    PlatformNotConfigured(String),
}

/// Template rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Variable '{0}' is not defined")]
    UndefinedVariable(String),

    #[error("Unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("Invalid template syntax: {0}")]
    InvalidSyntax(String),
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Interrupted")]
    Interrupted,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    File(#[from] FileError),
}

/// Filesystem helper errors, distinct from a plain "already absent" no-op
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Failed to {op} {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to copy {src:?} to {dst:?}: {source}")]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No tarball matching '{0}' in {1:?}")]
    TarballNotFound(String, PathBuf),

    #[error("Symbolic links are not supported on this platform")]
    SymlinkUnsupported,
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for template rendering
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for filesystem helpers
pub type FileResult<T> = std::result::Result<T, FileError>;

/// Helper to determine whether an execution error was an interrupt
/// (the platform sequence is reported as aborted, not failed)
pub fn is_interrupted(err: &ExecutionError) -> bool {
    matches!(err, ExecutionError::Interrupted)
}
