//! Built-in tasks
//!
//! Only `clean` ships with the engine; everything else is declared by the
//! embedding driver.

use crate::error::ConfigResult;
use crate::runner::task::{Registry, TaskKind};

/// Register the engine's built-in tasks
pub fn register_builtins(registry: &mut Registry) -> ConfigResult<()> {
    registry
        .task("core", "clean", TaskKind::Python)
        .always()
        .run(|c| c.clean())?;

    Ok(())
}
