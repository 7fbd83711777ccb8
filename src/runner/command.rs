//! Subprocess execution
//!
//! Commands run through `sh -c` in the context's working directory with
//! the host environment plus the context's overlay. Output is captured so
//! the driver can surface it verbatim when a task fails.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use std::thread;
use std::time::Duration;

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::scheduler::Interrupt;

/// Poll interval while waiting on a child process
const WAIT_POLL: Duration = Duration::from_millis(50);

/// Captured result of a completed command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Execute a rendered command line, failing on non-zero exit
///
/// An interrupt raised while the command runs kills the child and yields
/// [`ExecutionError::Interrupted`].
pub fn execute(
    command: &str,
    cwd: &Path,
    env_overlay: &HashMap<String, String>,
    interrupt: &Interrupt,
) -> ExecutionResult<CommandOutput> {
    let mut child = StdCommand::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .envs(env_overlay)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ExecutionError::Spawn {
            command: command.to_string(),
            source: e,
        })?;

    // Drain both pipes on their own threads so neither can fill and
    // deadlock the child
    let stdout_handle = child.stdout.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });
    let stderr_handle = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });

    let status = loop {
        if interrupt.is_set() {
            let _ = child.kill();
            let _ = child.wait();
            join_reader(stdout_handle);
            join_reader(stderr_handle);
            return Err(ExecutionError::Interrupted);
        }

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => thread::sleep(WAIT_POLL),
            Err(e) => {
                let _ = child.kill();
                join_reader(stdout_handle);
                join_reader(stderr_handle);
                return Err(ExecutionError::Spawn {
                    command: command.to_string(),
                    source: e,
                });
            }
        }
    };

    let stdout = join_reader(stdout_handle);
    let stderr = join_reader(stderr_handle);

    if !status.success() {
        return Err(ExecutionError::CommandFailed {
            command: command.to_string(),
            code: status.code(),
            stdout,
            stderr,
        });
    }

    Ok(CommandOutput {
        code: status.code(),
        stdout,
        stderr,
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
