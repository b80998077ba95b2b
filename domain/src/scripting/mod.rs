//! Scripting domain types
//!
//! Value objects crossing the boundary between the host and the Lua
//! runtime. These types are runtime-agnostic: the actual Lua state lives in
//! the infrastructure layer behind the `ScriptRuntime` port.

mod user_script;

pub use user_script::UserScript;

use serde_json::Value as JsonValue;

/// An event emitted on the host's event bus.
///
/// Relayed into the runtime as `dispatch_event(name, ...payload)`.
#[derive(Debug, Clone, PartialEq)]
pub struct HostEvent {
    name: String,
    payload: Vec<JsonValue>,
}

impl HostEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Vec::new(),
        }
    }

    pub fn with_arg(mut self, value: impl Into<JsonValue>) -> Self {
        self.payload.push(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &[JsonValue] {
        &self.payload
    }
}

/// Context injected into a single run call: `data` plus positional `args`.
///
/// Exposed to the chunk as the `data` / `args` globals for the duration of
/// the call only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    pub data: Option<JsonValue>,
    pub args: Vec<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// A value returned from the runtime, marshalled to host-native form.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    /// A table, already converted to structured data.
    Composite(JsonValue),
}

impl ScriptValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Command-layer output: nil collapses to an empty string, composites
    /// are JSON-encoded, scalars are passed through.
    pub fn into_output(self) -> String {
        match self {
            Self::Nil => String::new(),
            Self::Composite(value) => value.to_string(),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
            Self::Composite(value) => write!(f, "{}", value),
        }
    }
}
