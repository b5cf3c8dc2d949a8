use std::fmt;

/// Key used by [`err`] for error attributes.
pub const ERROR_KEY: &str = "error";

/// Value of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    /// Display text of an error. Handlers pass it through
    /// `HandlerOptions::error_formatter` when one is set.
    Error(String),
    /// Nested attributes, encoded with keys prefixed by the group key.
    Group(Vec<Attr>),
}

/// A key-value pair attached to a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// An attribute with an empty key is dropped on output, unless it is a
    /// group, whose members are then inlined.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Group(attrs) => attrs.is_empty(),
            _ => self.key.is_empty(),
        }
    }
}

pub fn string(key: impl Into<String>, value: impl Into<String>) -> Attr {
    Attr::new(key, Value::Str(value.into()))
}

pub fn int(key: impl Into<String>, value: i64) -> Attr {
    Attr::new(key, Value::Int(value))
}

pub fn uint(key: impl Into<String>, value: u64) -> Attr {
    Attr::new(key, Value::Uint(value))
}

pub fn float(key: impl Into<String>, value: f64) -> Attr {
    Attr::new(key, Value::Float(value))
}

pub fn bool(key: impl Into<String>, value: bool) -> Attr {
    Attr::new(key, Value::Bool(value))
}

pub fn group(key: impl Into<String>, attrs: Vec<Attr>) -> Attr {
    Attr::new(key, Value::Group(attrs))
}

/// Attribute for an error under the `error` key.
///
/// The console renderer shows such attributes first, in the error color.
pub fn err(err: &dyn fmt::Display) -> Attr {
    named_err(ERROR_KEY, err)
}

/// Attribute for an error under `key`.
///
/// Keys ending in `.error` or `.err` are rendered as errors too.
pub fn named_err(key: impl Into<String>, err: &dyn fmt::Display) -> Attr {
    Attr::new(key, Value::Error(err.to_string()))
}

/// Reports whether `attr` holds an error value, directly or in a group.
pub fn has_error(attr: &Attr) -> bool {
    match &attr.value {
        Value::Error(_) => true,
        Value::Group(attrs) => attrs.iter().any(has_error),
        _ => false,
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Uint(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Vec<Attr>> for Value {
    fn from(v: Vec<Attr>) -> Self {
        Value::Group(v)
    }
}
