//! Layered variable store used for template substitution
//!
//! Lookup resolves innermost-to-outermost: per-task values shadow
//! per-platform values, which shadow global defaults. An unset variable
//! referenced by a template is an error, never a silent empty string.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{RenderError, RenderResult};

/// A variable value
///
/// Values keep their shape until render time: paths display natively,
/// lists join with single spaces (library lists in link commands), bools
/// drive condition truthiness.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Path(PathBuf),
    List(Vec<String>),
    Bool(bool),
}

impl Value {
    /// Text form used when the value is interpolated into a template
    pub fn render(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Path(p) => p.display().to_string(),
            Value::List(items) => items.join(" "),
            Value::Bool(b) => b.to_string(),
        }
    }

    /// Truthiness for bare variables in `{% if %}` conditions
    pub fn truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty() && s != "false" && s != "0",
            Value::Path(p) => !p.as_os_str().is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Bool(b) => *b,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

/// Scope layer, least to most specific
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Global,
    Platform,
    Task,
}

/// Layered mapping from variable name to value
///
/// Global and platform layers are populated once per platform run and are
/// read-mostly afterward; the task layer belongs to a single task
/// invocation and is discarded with it.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    global: HashMap<String, Value>,
    platform: HashMap<String, Value>,
    task: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable in the given layer
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>, layer: Layer) {
        let map = match layer {
            Layer::Global => &mut self.global,
            Layer::Platform => &mut self.platform,
            Layer::Task => &mut self.task,
        };
        map.insert(name.into(), value.into());
    }

    /// Resolve a variable, innermost layer first
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.task
            .get(name)
            .or_else(|| self.platform.get(name))
            .or_else(|| self.global.get(name))
    }

    /// Resolve a variable or fail naming it
    pub fn lookup(&self, name: &str) -> RenderResult<&Value> {
        self.get(name)
            .ok_or_else(|| RenderError::UndefinedVariable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// A copy with an empty task layer, for binding a fresh task context
    pub fn fresh_task_scope(&self) -> Self {
        VariableStore {
            global: self.global.clone(),
            platform: self.platform.clone(),
            task: HashMap::new(),
        }
    }
}
