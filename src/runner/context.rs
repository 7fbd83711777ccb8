//! Per-task execution context
//!
//! A context is bound to exactly one task invocation: it owns a fresh
//! task-layer scope, a directory stack seeded with the platform build
//! directory, and an environment overlay. Nothing it mutates survives the
//! task, so sibling tasks never see each other's variables, directories,
//! or environment.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ExecutionResult, FileError, FileResult, RenderResult};
use crate::runner::command::{self, CommandOutput};
use crate::runner::scheduler::Interrupt;
use crate::runner::scope::{Layer, Value, VariableStore};
use crate::runner::task::Platform;
use crate::runner::template::{render_command, render_text};
use crate::ui::{Ui, Verbosity};

/// Execution context handed to a task body
pub struct Context {
    /// Target platform of the running sequence
    pub platform: Platform,

    /// Target architecture tag
    pub arch: String,

    /// Qualified name of the running task
    pub task: String,

    scope: VariableStore,
    build_dir: PathBuf,
    dir_stack: Vec<PathBuf>,
    env_overlay: HashMap<String, String>,
    ui: Ui,
    interrupt: Interrupt,
}

impl Context {
    /// Bind a context for one task invocation
    ///
    /// `scope` must already carry the global and platform layers; the task
    /// layer starts empty.
    pub fn new(
        platform: Platform,
        arch: String,
        task: String,
        scope: VariableStore,
        build_dir: PathBuf,
        ui: Ui,
        interrupt: Interrupt,
    ) -> Self {
        let dir_stack = vec![build_dir.clone()];
        Context {
            platform,
            arch,
            task,
            scope,
            build_dir,
            dir_stack,
            env_overlay: HashMap::new(),
            ui,
            interrupt,
        }
    }

    /// The current working directory for `run` and relative paths
    pub fn current_dir(&self) -> &Path {
        // The stack is seeded at construction and never fully popped
        self.dir_stack.last().map(PathBuf::as_path).unwrap_or(&self.build_dir)
    }

    /// Read access to the variable scope
    pub fn scope(&self) -> &VariableStore {
        &self.scope
    }

    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    /// Render a command template and execute it in the current directory
    ///
    /// Fails on non-zero exit with the rendered command and captured
    /// output attached.
    pub fn run(&mut self, template: &str) -> ExecutionResult<CommandOutput> {
        let rendered = render_command(template, &self.scope)?;
        self.ui.command(&rendered);
        let output = command::execute(
            &rendered,
            self.current_dir(),
            &self.env_overlay,
            &self.interrupt,
        )?;
        if self.ui.verbosity >= Verbosity::Verbose && !output.stdout.is_empty() {
            eprint!("{}", output.stdout);
        }
        Ok(output)
    }

    /// Set a variable in this task's scope layer
    ///
    /// The value is itself a template, rendered now.
    pub fn var(&mut self, name: &str, value_template: &str) -> RenderResult<()> {
        let value = render_text(value_template, &self.scope)?;
        self.scope.set(name, value, Layer::Task);
        Ok(())
    }

    /// Set an environment variable for subsequent `run` calls in this task
    ///
    /// The host process environment is never mutated.
    pub fn env(&mut self, name: &str, value_template: &str) -> RenderResult<()> {
        let value = render_text(value_template, &self.scope)?;
        self.env_overlay.insert(name.to_string(), value);
        Ok(())
    }

    /// Render a path template to an absolute path
    pub fn path(&self, template: &str) -> RenderResult<PathBuf> {
        let rendered = render_text(template, &self.scope)?;
        let path = PathBuf::from(rendered.trim());
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(self.current_dir().join(path))
        }
    }

    /// Change the working directory, pushing onto the directory stack
    ///
    /// The stack dies with the context at the task boundary, so directory
    /// changes never leak into the next task.
    pub fn chdir(&mut self, template: &str) -> RenderResult<()> {
        let path = self.path(template)?;
        self.dir_stack.push(path);
        Ok(())
    }

    /// Create a directory and any missing parents
    pub fn mkdir(&self, template: &str) -> ExecutionResult<()> {
        let path = self.path(template)?;
        fs::create_dir_all(&path).map_err(|e| FileError::Io {
            op: "create directory",
            path,
            source: e,
        })?;
        Ok(())
    }

    /// Copy a file; a directory destination receives the file by name
    pub fn copy(&self, src_template: &str, dst_template: &str) -> ExecutionResult<()> {
        let src = self.path(src_template)?;
        let mut dst = self.path(dst_template)?;
        if dst.is_dir() {
            if let Some(file_name) = src.file_name() {
                dst = dst.join(file_name);
            }
        }
        fs::copy(&src, &dst).map_err(|e| FileError::Copy {
            src,
            dst,
            source: e,
        })?;
        Ok(())
    }

    /// Create a symbolic link at `dst` pointing to `src`
    pub fn symlink(&self, src_template: &str, dst_template: &str) -> ExecutionResult<()> {
        let src = self.path(src_template)?;
        let dst = self.path(dst_template)?;
        symlink_impl(&src, &dst)?;
        Ok(())
    }

    /// Remove a file; absent targets are a no-op
    pub fn unlink(&self, template: &str) -> ExecutionResult<()> {
        let path = self.path(template)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FileError::Io {
                op: "remove file",
                path,
                source: e,
            }
            .into()),
        }
    }

    /// Remove a directory tree; absent targets are a no-op
    pub fn rmtree(&self, template: &str) -> ExecutionResult<()> {
        let path = self.path(template)?;
        match fs::remove_dir_all(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FileError::Io {
                op: "remove directory",
                path,
                source: e,
            }
            .into()),
        }
    }

    /// Reset this platform's build directory to pristine
    ///
    /// Safe when the directory does not exist. The directory stack resets
    /// to the recreated build directory.
    pub fn clean(&mut self) -> ExecutionResult<()> {
        match fs::remove_dir_all(&self.build_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(FileError::Io {
                    op: "remove directory",
                    path: self.build_dir.clone(),
                    source: e,
                }
                .into())
            }
        }
        fs::create_dir_all(&self.build_dir).map_err(|e| FileError::Io {
            op: "create directory",
            path: self.build_dir.clone(),
            source: e,
        })?;
        self.dir_stack = vec![self.build_dir.clone()];
        Ok(())
    }

    /// Render a file template to an output file
    ///
    /// `extra` values join the scope's task layer for this render only.
    /// File templates keep their whitespace.
    pub fn generate(
        &self,
        src_template: &str,
        dst_template: &str,
        extra: &[(&str, Value)],
    ) -> ExecutionResult<()> {
        let src = self.path(src_template)?;
        let dst = self.path(dst_template)?;

        let template = fs::read_to_string(&src).map_err(|e| FileError::Io {
            op: "read",
            path: src.clone(),
            source: e,
        })?;

        let mut scope = self.scope.clone();
        for (name, value) in extra {
            scope.set(*name, value.clone(), Layer::Task);
        }
        let rendered = render_text(&template, &scope)?;

        fs::write(&dst, rendered).map_err(|e| FileError::Io {
            op: "write",
            path: dst,
            source: e,
        })?;
        Ok(())
    }
}

#[cfg(unix)]
fn symlink_impl(src: &Path, dst: &Path) -> FileResult<()> {
    std::os::unix::fs::symlink(src, dst).map_err(|e| FileError::Io {
        op: "symlink",
        path: dst.to_path_buf(),
        source: e,
    })
}

#[cfg(not(unix))]
fn symlink_impl(_src: &Path, _dst: &Path) -> FileResult<()> {
    Err(FileError::SymlinkUnsupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_context(dir: &TempDir) -> Context {
        let mut scope = VariableStore::new();
        scope.set("platform", "linux", Layer::Global);
        scope.set(
            "build",
            Value::Path(dir.path().to_path_buf()),
            Layer::Platform,
        );
        Context::new(
            Platform::Linux,
            "x86_64".to_string(),
            "test.task".to_string(),
            scope,
            dir.path().to_path_buf(),
            Ui::new(Verbosity::Silent),
            Interrupt::new(),
        )
    }

    #[test]
    fn test_run_renders_and_executes() {
        let dir = TempDir::new().unwrap();
        let mut ctx = test_context(&dir);
        ctx.run("touch {{ platform }}.o").unwrap();
        assert!(dir.path().join("linux.o").exists());
    }

    #[test]
    fn test_run_failure_carries_rendered_command() {
        let dir = TempDir::new().unwrap();
        let mut ctx = test_context(&dir);
        let result = ctx.run("false {{ platform }}");
        match result {
            Err(crate::error::ExecutionError::CommandFailed { command, .. }) => {
                assert_eq!(command, "false linux");
            }
            other => panic!("expected CommandFailed, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_var_renders_value_and_scopes_to_task() {
        let dir = TempDir::new().unwrap();
        let mut ctx = test_context(&dir);
        ctx.var("obj", "{{ platform }}.o").unwrap();
        assert_eq!(ctx.scope().get("obj").unwrap().render(), "linux.o");
    }

    #[test]
    fn test_env_overlay_applies_to_run() {
        let dir = TempDir::new().unwrap();
        let mut ctx = test_context(&dir);
        ctx.env("TARGET_DIR", "{{ build }}/out").unwrap();
        ctx.run("echo $TARGET_DIR > env.txt").unwrap();
        let content = fs::read_to_string(dir.path().join("env.txt")).unwrap();
        assert_eq!(
            content.trim(),
            format!("{}/out", dir.path().display())
        );
    }

    #[test]
    fn test_chdir_scopes_runs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let mut ctx = test_context(&dir);
        ctx.chdir("sub").unwrap();
        ctx.run("touch here.txt").unwrap();
        assert!(dir.path().join("sub/here.txt").exists());
    }

    #[test]
    fn test_path_resolves_relative_to_current_dir() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(&dir);
        let path = ctx.path("{{ platform }}/lib").unwrap();
        assert_eq!(path, dir.path().join("linux/lib"));

        let absolute = ctx.path("/usr/lib").unwrap();
        assert_eq!(absolute, PathBuf::from("/usr/lib"));
    }

    #[test]
    fn test_unlink_and_rmtree_absent_are_noops() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(&dir);
        ctx.unlink("missing.txt").unwrap();
        ctx.rmtree("missing-dir").unwrap();
    }

    #[test]
    fn test_copy_into_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("lib.so"), "lib").unwrap();
        fs::create_dir(dir.path().join("install")).unwrap();

        let ctx = test_context(&dir);
        ctx.copy("lib.so", "install").unwrap();
        assert!(dir.path().join("install/lib.so").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_and_unlink() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("target.txt"), "x").unwrap();

        let ctx = test_context(&dir);
        ctx.symlink("target.txt", "link.txt").unwrap();
        assert!(dir.path().join("link.txt").exists());
        ctx.unlink("link.txt").unwrap();
        assert!(!dir.path().join("link.txt").exists());
    }

    #[test]
    fn test_clean_on_missing_build_dir() {
        let dir = TempDir::new().unwrap();
        let build = dir.path().join("build");
        let mut scope = VariableStore::new();
        scope.set("platform", "linux", Layer::Global);
        let mut ctx = Context::new(
            Platform::Linux,
            "x86_64".to_string(),
            "core.clean".to_string(),
            scope,
            build.clone(),
            Ui::new(Verbosity::Silent),
            Interrupt::new(),
        );

        ctx.clean().unwrap();
        assert!(build.exists());
    }

    #[test]
    fn test_clean_resets_contents_and_directory_stack() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("stale.o"), "x").unwrap();

        let mut ctx = test_context(&dir);
        ctx.chdir("sub").unwrap();
        ctx.clean().unwrap();

        assert!(!dir.path().join("stale.o").exists());
        assert_eq!(ctx.current_dir(), dir.path());
    }

    #[test]
    fn test_generate_renders_file_template() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("inittab.c.in"),
            "/* {{ platform }} */\nconst char *modules = \"{{ modules }}\";\n",
        )
        .unwrap();

        let ctx = test_context(&dir);
        ctx.generate(
            "inittab.c.in",
            "inittab.c",
            &[(
                "modules",
                Value::List(vec!["audio".to_string(), "video".to_string()]),
            )],
        )
        .unwrap();

        let content = fs::read_to_string(dir.path().join("inittab.c")).unwrap();
        assert_eq!(
            content,
            "/* linux */\nconst char *modules = \"audio video\";\n"
        );
    }

    #[test]
    fn test_generate_extras_do_not_leak() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("t.in"), "{{ modules }}").unwrap();

        let ctx = test_context(&dir);
        ctx.generate("t.in", "t.out", &[("modules", Value::from("m"))])
            .unwrap();
        assert!(ctx.scope().get("modules").is_none());
    }
}
