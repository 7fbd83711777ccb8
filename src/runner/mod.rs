//! Task execution engine
//!
//! This module holds the registry, the layered variable store, the
//! template renderer, the per-task execution context, and the scheduler
//! that drives platform sequences.

pub mod builtin;
pub mod command;
pub mod context;
pub mod expr;
pub mod scheduler;
pub mod scope;
pub mod task;
pub mod template;

// Re-export main types
pub use builtin::*;
pub use command::*;
pub use context::*;
pub use scheduler::*;
pub use scope::*;
pub use task::*;
pub use template::*;
