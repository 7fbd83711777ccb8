//! Terminal output helpers
//!
//! All status output goes to stderr so command output can pass through
//! undisturbed.

use colored::Colorize;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

/// Output handle threaded through the scheduler and task contexts
#[derive(Debug, Clone, Copy)]
pub struct Ui {
    pub verbosity: Verbosity,
}

impl Ui {
    pub fn new(verbosity: Verbosity) -> Self {
        Ui { verbosity }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{}", message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {}", "error:".red().bold(), message);
        }
    }

    /// Print debug message (only in verbose mode)
    pub fn debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {}", "debug:".dimmed(), message);
        }
    }

    /// Echo a command about to run
    pub fn command(&self, command: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "run:".cyan(), command);
        }
    }

    /// Print task start message
    pub fn task_start(&self, platform: &str, task: &str) {
        self.info(&format!(
            "{} {} {}",
            "->".green().bold(),
            task.bold(),
            format!("[{}]", platform).dimmed()
        ));
    }

    /// Print task complete message
    pub fn task_complete(&self, platform: &str, task: &str) {
        self.debug(&format!("completed {} [{}]", task, platform));
    }

    /// Print task skip message
    pub fn task_skip(&self, platform: &str, task: &str, reason: &str) {
        self.debug(&format!("skipping {} [{}]: {}", task, platform, reason));
    }
}

impl Default for Ui {
    fn default() -> Self {
        Ui::new(Verbosity::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert!(Verbosity::Verbose > Verbosity::Normal);
        assert!(Verbosity::Normal > Verbosity::Quiet);
        assert!(Verbosity::Quiet > Verbosity::Silent);
    }

    #[test]
    fn test_default_ui() {
        let ui = Ui::default();
        assert_eq!(ui.verbosity, Verbosity::Normal);
    }
}
