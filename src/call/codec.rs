//! # Call codec: caller values → canonical wire form.
//!
//! [`encode`] validates every argument of a [`FunctionCall`] and produces an
//! immutable [`CanonicalCall`] whose arguments are plain JSON. Encoding is the
//! only place a request is rejected; it happens before any funnel admission.
//!
//! ```text
//! FunctionCall { name, args: Vec<Value> }
//!        │ encode()
//!        ├─ Float(NaN/inf), Timestamp, Callable, Opaque ──► CallError::UnsupportedArgument
//!        ▼
//! CanonicalCall { call_id, name, args: Vec<serde_json::Value>, module_path }
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number};

use crate::call::value::Value;
use crate::error::CallError;

/// Global call id counter.
static CALL_SEQ: AtomicU64 = AtomicU64::new(1);

/// A function invocation as built by the caller.
#[derive(Clone, Debug)]
pub struct FunctionCall {
    name: String,
    args: Vec<Value>,
}

impl FunctionCall {
    /// Creates a call without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Replaces all arguments.
    pub fn with_args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

/// Canonical, serializable form of a call. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCall {
    call_id: u64,
    name: String,
    args: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    module_path: Option<String>,
}

impl CanonicalCall {
    /// Process-unique id assigned at encode time.
    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[serde_json::Value] {
        &self.args
    }

    pub fn module_path(&self) -> Option<&str> {
        self.module_path.as_deref()
    }

    /// Serializes to the JSON wire string.
    pub fn to_json(&self) -> Result<String, CallError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses the JSON wire string.
    pub fn from_json(s: &str) -> Result<Self, CallError> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Encodes a call into its canonical form.
///
/// # Errors
/// [`CallError::UnsupportedArgument`] naming the first argument (by index) that
/// contains an unrepresentable value, at any nesting depth.
pub fn encode(call: &FunctionCall, module_path: Option<&str>) -> Result<CanonicalCall, CallError> {
    let args = call
        .args
        .iter()
        .enumerate()
        .map(|(index, arg)| {
            to_json(arg).map_err(|reason| CallError::UnsupportedArgument {
                function: call.name.clone(),
                index,
                reason,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CanonicalCall {
        call_id: CALL_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
        name: call.name.clone(),
        args,
        module_path: module_path.map(str::to_owned),
    })
}

fn to_json(value: &Value) -> Result<serde_json::Value, String> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number(Number::from(*i)),
        Value::Float(x) => match Number::from_f64(*x) {
            Some(n) => serde_json::Value::Number(n),
            None => return Err(format!("non-finite number {x}")),
        },
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(
            items.iter().map(to_json).collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Map(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), to_json(v).map_err(|e| format!("{e} at key '{k}'"))?);
            }
            serde_json::Value::Object(out)
        }
        Value::Timestamp(_) => return Err("timestamp values have no wire form".into()),
        Value::Callable { name, .. } => return Err(format!("function value '{name}'")),
        Value::Opaque { type_name, .. } => return Err(format!("opaque value of type {type_name}")),
    })
}
