//! Task types and the registry
//!
//! Tasks are registered once by the driver at startup and are immutable
//! afterward. The registry preserves declaration order; the scheduler runs
//! a platform's matching tasks in exactly that order.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ConfigError, ConfigResult, ExecutionResult};
use crate::runner::context::Context;

/// A build target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    Linux,
    Mac,
    Windows,
    Android,
    Ios,
    Web,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Linux,
        Platform::Mac,
        Platform::Windows,
        Platform::Android,
        Platform::Ios,
        Platform::Web,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Mac => "mac",
            Platform::Windows => "windows",
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Web => "web",
        }
    }

    /// Architecture assumed when the config does not name one
    pub fn default_arch(&self) -> &'static str {
        match self {
            Platform::Linux | Platform::Mac | Platform::Windows => "x86_64",
            Platform::Android => "arm64-v8a",
            Platform::Ios => "arm64",
            Platform::Web => "wasm",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s {
            "linux" => Ok(Platform::Linux),
            "mac" => Ok(Platform::Mac),
            "windows" => Ok(Platform::Windows),
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "web" => Ok(Platform::Web),
            _ => Err(ConfigError::UnknownPlatform(s.to_string())),
        }
    }
}

/// Task kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Python,
    HostPython,
    Cross,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::Python, TaskKind::HostPython, TaskKind::Cross];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Python => "python",
            TaskKind::HostPython => "host-python",
            TaskKind::Cross => "cross",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s {
            "python" => Ok(TaskKind::Python),
            "host-python" => Ok(TaskKind::HostPython),
            "cross" => Ok(TaskKind::Cross),
            _ => Err(ConfigError::UnknownKind(s.to_string())),
        }
    }
}

/// The platforms a task applies to
#[derive(Debug, Clone)]
pub enum PlatformSet {
    All,
    Only(Vec<Platform>),
}

impl PlatformSet {
    pub fn contains(&self, platform: Platform) -> bool {
        match self {
            PlatformSet::All => true,
            PlatformSet::Only(platforms) => platforms.contains(&platform),
        }
    }
}

impl fmt::Display for PlatformSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformSet::All => write!(f, "all"),
            PlatformSet::Only(platforms) => {
                let tags: Vec<&str> = platforms.iter().map(Platform::as_str).collect();
                write!(f, "{}", tags.join(","))
            }
        }
    }
}

/// Task body signature
pub type TaskBody = Arc<dyn Fn(&mut Context) -> ExecutionResult<()> + Send + Sync>;

/// A registered unit of build work
///
/// Identity is (module, name); two modules may both declare a `build` task.
#[derive(Clone)]
pub struct Task {
    pub module: String,
    pub name: String,
    pub kind: TaskKind,
    pub platforms: PlatformSet,
    pub always: bool,
    /// Artifact path templates (glob patterns allowed); when all exist the
    /// scheduler skips the task unless `always` is set
    pub produces: Vec<String>,
    pub body: TaskBody,
}

impl Task {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("module", &self.module)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("platforms", &self.platforms)
            .field("always", &self.always)
            .field("produces", &self.produces)
            .finish()
    }
}

/// Ordered, append-only task registry
///
/// Constructed explicitly by the driver and passed where needed; there is
/// no process-global task list.
#[derive(Default)]
pub struct Registry {
    tasks: Vec<Task>,
    names: HashSet<(String, String)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start declaring a task; finished by [`TaskBuilder::run`]
    pub fn task(&mut self, module: &str, name: &str, kind: TaskKind) -> TaskBuilder<'_> {
        TaskBuilder {
            registry: self,
            module: module.to_string(),
            name: name.to_string(),
            kind,
            platforms: PlatformSet::All,
            always: false,
            produces: Vec::new(),
        }
    }

    /// Register a fully-formed task
    pub fn register(&mut self, task: Task) -> ConfigResult<()> {
        if let PlatformSet::Only(platforms) = &task.platforms {
            if platforms.is_empty() {
                return Err(ConfigError::EmptyPlatforms(task.qualified_name()));
            }
        }

        let key = (task.module.clone(), task.name.clone());
        if !self.names.insert(key) {
            return Err(ConfigError::DuplicateTask(task.qualified_name()));
        }

        self.tasks.push(task);
        Ok(())
    }

    /// Tasks applicable to a platform and kind set, in declaration order
    pub fn tasks_for(&self, platform: Platform, kinds: &[TaskKind]) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.platforms.contains(platform) && kinds.contains(&t.kind))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Builder returned by [`Registry::task`]
pub struct TaskBuilder<'a> {
    registry: &'a mut Registry,
    module: String,
    name: String,
    kind: TaskKind,
    platforms: PlatformSet,
    always: bool,
    produces: Vec<String>,
}

impl TaskBuilder<'_> {
    /// Restrict the task to the given platforms (default: all)
    pub fn platforms(mut self, platforms: &[Platform]) -> Self {
        self.platforms = PlatformSet::Only(platforms.to_vec());
        self
    }

    /// Run the task even when its artifacts already exist
    pub fn always(mut self) -> Self {
        self.always = true;
        self
    }

    /// Declare an artifact path template produced by this task
    pub fn produces(mut self, template: &str) -> Self {
        self.produces.push(template.to_string());
        self
    }

    /// Attach the body and register the task
    pub fn run<F>(self, body: F) -> ConfigResult<()>
    where
        F: Fn(&mut Context) -> ExecutionResult<()> + Send + Sync + 'static,
    {
        self.registry.register(Task {
            module: self.module,
            name: self.name,
            kind: self.kind,
            platforms: self.platforms,
            always: self.always,
            produces: self.produces,
            body: Arc::new(body),
        })
    }
}
