//! Platform sequence scheduling
//!
//! Within one platform, matching tasks run strictly in declaration order
//! and the first failure halts the remainder of that platform's sequence.
//! Distinct platforms run on their own threads in disjoint build roots;
//! a failure in one does not cancel its siblings.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::Project;
use crate::error::{is_interrupted, ConfigError, ConfigResult, ExecutionResult, FileError};
use crate::runner::context::Context;
use crate::runner::scope::{Layer, Value, VariableStore};
use crate::runner::task::{Platform, Registry, Task, TaskKind};
use crate::runner::template::render_text;
use crate::ui::Ui;

/// Cloneable abort handle
///
/// The driver may trigger it from a signal handler; the scheduler checks
/// it between tasks and while a subprocess runs, reporting the platform
/// sequence as aborted rather than failed.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub platforms: Vec<Platform>,
    pub kinds: Vec<TaskKind>,
    /// Restrict to tasks matching these names (bare or module-qualified)
    pub tasks: Option<Vec<String>>,
    /// Run platform sequences one at a time
    pub serial: bool,
}

impl RunRequest {
    pub fn new(platforms: Vec<Platform>) -> Self {
        RunRequest {
            platforms,
            kinds: TaskKind::ALL.to_vec(),
            tasks: None,
            serial: false,
        }
    }
}

/// Terminal state of one platform's sequence
#[derive(Debug)]
pub enum Outcome {
    Completed,
    Failed {
        task: String,
        error: crate::error::ExecutionError,
    },
    Aborted {
        task: String,
    },
}

/// Result of running one platform's sequence
#[derive(Debug)]
pub struct PlatformReport {
    pub platform: Platform,
    pub outcome: Outcome,
    pub executed: Vec<String>,
    pub skipped: Vec<String>,
}

impl PlatformReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Outcome::Completed)
    }
}

/// Runs registered tasks over the requested platforms
pub struct Scheduler<'a> {
    project: &'a Project,
    registry: &'a Registry,
    ui: Ui,
    interrupt: Interrupt,
}

impl<'a> Scheduler<'a> {
    pub fn new(project: &'a Project, registry: &'a Registry, ui: Ui) -> Self {
        Scheduler {
            project,
            registry,
            ui,
            interrupt: Interrupt::new(),
        }
    }

    /// Abort handle for the driver to wire to a signal
    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    /// Run the request, one report per requested platform
    pub fn run(&self, request: &RunRequest) -> ConfigResult<Vec<PlatformReport>> {
        self.validate(request)?;

        if request.serial || request.platforms.len() <= 1 {
            return Ok(request
                .platforms
                .iter()
                .map(|p| self.run_platform(*p, request))
                .collect());
        }

        Ok(thread::scope(|s| {
            let handles: Vec<_> = request
                .platforms
                .iter()
                .map(|p| s.spawn(move || self.run_platform(*p, request)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        }))
    }

    /// Fail fast on structural misconfiguration, before any task runs
    fn validate(&self, request: &RunRequest) -> ConfigResult<()> {
        for platform in &request.platforms {
            if self.project.platform_config(*platform).is_none() {
                return Err(ConfigError::PlatformNotConfigured(platform.to_string()));
            }
        }

        for (i, a) in request.platforms.iter().enumerate() {
            for b in &request.platforms[i + 1..] {
                let root_a = self.project.build_dir(*a);
                if root_a == self.project.build_dir(*b) {
                    return Err(ConfigError::CollidingRoots {
                        a: *a,
                        b: *b,
                        root: root_a,
                    });
                }
            }
        }

        Ok(())
    }

    fn run_platform(&self, platform: Platform, request: &RunRequest) -> PlatformReport {
        let arch = self.project.arch(platform);
        let build_dir = self.project.build_dir(platform);
        let install_dir = self.project.install_dir(platform);
        let base = self.platform_scope(platform, &arch);

        let mut executed = Vec::new();
        let mut skipped = Vec::new();

        for dir in [&build_dir, &install_dir] {
            if let Err(e) = fs::create_dir_all(dir) {
                return PlatformReport {
                    platform,
                    outcome: Outcome::Failed {
                        task: "<setup>".to_string(),
                        error: FileError::Io {
                            op: "create directory",
                            path: dir.clone(),
                            source: e,
                        }
                        .into(),
                    },
                    executed,
                    skipped,
                };
            }
        }

        for task in self.registry.tasks_for(platform, &request.kinds) {
            let qname = task.qualified_name();

            if let Some(filter) = &request.tasks {
                if !filter.iter().any(|f| *f == task.name || *f == qname) {
                    continue;
                }
            }

            if self.interrupt.is_set() {
                return PlatformReport {
                    platform,
                    outcome: Outcome::Aborted { task: qname },
                    executed,
                    skipped,
                };
            }

            if !task.always {
                match artifacts_exist(task, &base, &build_dir) {
                    Ok(true) => {
                        self.ui
                            .task_skip(platform.as_str(), &qname, "artifacts up to date");
                        skipped.push(qname);
                        continue;
                    }
                    Ok(false) => {}
                    Err(error) => {
                        return PlatformReport {
                            platform,
                            outcome: Outcome::Failed { task: qname, error },
                            executed,
                            skipped,
                        }
                    }
                }
            }

            self.ui.task_start(platform.as_str(), &qname);
            let mut ctx = Context::new(
                platform,
                arch.clone(),
                qname.clone(),
                base.fresh_task_scope(),
                build_dir.clone(),
                self.ui,
                self.interrupt.clone(),
            );

            match (task.body)(&mut ctx) {
                Ok(()) => {
                    self.ui.task_complete(platform.as_str(), &qname);
                    executed.push(qname);
                }
                Err(e) if is_interrupted(&e) => {
                    return PlatformReport {
                        platform,
                        outcome: Outcome::Aborted { task: qname },
                        executed,
                        skipped,
                    }
                }
                Err(error) => {
                    return PlatformReport {
                        platform,
                        outcome: Outcome::Failed { task: qname, error },
                        executed,
                        skipped,
                    }
                }
            }
        }

        PlatformReport {
            platform,
            outcome: Outcome::Completed,
            executed,
            skipped,
        }
    }

    /// Global and platform variable layers for one platform run
    fn platform_scope(&self, platform: Platform, arch: &str) -> VariableStore {
        let mut store = VariableStore::new();

        for (name, value) in &self.project.config.vars {
            store.set(name.clone(), value.clone(), Layer::Global);
        }

        if let Some(pc) = self.project.platform_config(platform) {
            for (name, value) in &pc.vars {
                store.set(name.clone(), value.clone(), Layer::Platform);
            }
        }

        store.set("platform", platform.as_str(), Layer::Platform);
        store.set("arch", arch.to_string(), Layer::Platform);
        store.set(
            "build",
            Value::Path(self.project.build_dir(platform)),
            Layer::Platform,
        );
        store.set(
            "install",
            Value::Path(self.project.install_dir(platform)),
            Layer::Platform,
        );
        store.set("tars", Value::Path(self.project.tars_dir()), Layer::Platform);

        store
    }
}

/// True when every declared artifact of the task already exists
fn artifacts_exist(task: &Task, scope: &VariableStore, build_dir: &Path) -> ExecutionResult<bool> {
    if task.produces.is_empty() {
        return Ok(false);
    }

    for template in &task.produces {
        let rendered = render_text(template, scope)?;
        let rendered = rendered.trim();
        let path = if Path::new(rendered).is_absolute() {
            PathBuf::from(rendered)
        } else {
            build_dir.join(rendered)
        };

        let found = if rendered.chars().any(|c| matches!(c, '*' | '?' | '[')) {
            match glob::glob(&path.to_string_lossy()) {
                Ok(mut paths) => paths.any(|entry| entry.is_ok()),
                Err(_) => false,
            }
        } else {
            path.exists()
        };

        if !found {
            return Ok(false);
        }
    }

    Ok(true)
}
