//! # Module: a named set of exported functions.
//!
//! A [`Module`] is what a remote backend would bundle and deploy; here it is
//! handed directly to [`ExecutionHost`](crate::ExecutionHost). It is an explicitly
//! owned value, so two backends can serve different modules in one process.

use std::collections::HashMap;
use std::fmt;

use crate::host::function::FunctionRef;

/// Named collection of functions.
#[derive(Clone)]
pub struct Module {
    specifier: String,
    functions: HashMap<String, FunctionRef>,
}

impl Module {
    /// Creates an empty module identified by `specifier`.
    pub fn new(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            functions: HashMap::new(),
        }
    }

    /// Adds a function; a function with the same name is replaced.
    pub fn with_function(mut self, f: FunctionRef) -> Self {
        self.register(f);
        self
    }

    /// Adds a function in place; returns the function it replaced, if any.
    pub fn register(&mut self, f: FunctionRef) -> Option<FunctionRef> {
        self.functions.insert(f.name().to_string(), f)
    }

    /// Looks up a function by name.
    pub fn get(&self, name: &str) -> Option<&FunctionRef> {
        self.functions.get(name)
    }

    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    /// Returns sorted list of exported names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("specifier", &self.specifier)
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::host::function::{Args, FunctionFn};

    fn constant(name: &'static str, v: i64) -> FunctionRef {
        FunctionFn::arc(name, move |_args: Args| async move { anyhow::Ok(json!(v)) })
    }

    #[test]
    fn registered_functions_are_listed_sorted() {
        let m = Module::new("./functions")
            .with_function(constant("zeta", 1))
            .with_function(constant("alpha", 2));
        assert_eq!(m.names(), vec!["alpha", "zeta"]);
        assert_eq!(m.specifier(), "./functions");
        assert!(m.get("alpha").is_some());
        assert!(m.get("beta").is_none());
    }

    #[test]
    fn same_name_replaces() {
        let mut m = Module::new("m").with_function(constant("f", 1));
        assert!(m.register(constant("f", 2)).is_some());
        assert_eq!(m.len(), 1);
    }
}
