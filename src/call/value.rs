//! # Dynamic argument values.
//!
//! [`Value`] is what callers hand to [`FunctionCall`](crate::FunctionCall). Most
//! variants map one-to-one onto JSON; a few describe live in-process things
//! that have no wire form and are rejected by the codec:
//!
//! | Variant                | Wire form                                     |
//! |------------------------|-----------------------------------------------|
//! | `Null`/`Bool`/`String` | as-is                                         |
//! | `Int`                  | JSON integer                                  |
//! | `Float`                | JSON number; **NaN/±inf unsupported**         |
//! | `List`/`Map`           | array/object, checked recursively             |
//! | `Timestamp`            | **unsupported** (type lost on decode)         |
//! | `Callable`             | **unsupported** (code cannot be serialized)   |
//! | `Opaque`               | **unsupported** (futures, handles, instances) |

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

/// Shared closure carried by [`Value::Callable`].
pub type CallableFn = Arc<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

/// A dynamically typed argument value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Point in time; has no unambiguous wire form.
    Timestamp(SystemTime),
    /// A function value.
    Callable {
        name: String,
        func: CallableFn,
    },
    /// Any other live object (pending future, resource handle, struct instance).
    Opaque {
        type_name: &'static str,
        handle: Arc<dyn Any + Send + Sync>,
    },
}

impl Value {
    /// Wraps an arbitrary in-process object, remembering its type name.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque {
            type_name: std::any::type_name::<T>(),
            handle: Arc::new(value),
        }
    }

    /// Wraps a closure as a function value.
    pub fn callable<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    {
        Value::Callable {
            name: name.into(),
            func: Arc::new(f),
        }
    }

    /// Converts any serde-serializable value.
    ///
    /// serde_json turns non-finite floats into `null` here, so build
    /// [`Value::Float`] directly when such values must be rejected by the codec.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Value::from)
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Timestamp(_) => "timestamp",
            Value::Callable { .. } => "callable",
            Value::Opaque { .. } => "opaque",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::Timestamp(t) => f.debug_tuple("Timestamp").field(t).finish(),
            Value::Callable { name, .. } => f.debug_struct("Callable").field("name", name).finish(),
            Value::Opaque { type_name, .. } => {
                f.debug_struct("Opaque").field("type_name", type_name).finish()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<SystemTime> for Value {
    fn from(v: SystemTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
