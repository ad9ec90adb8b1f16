use std::fmt;

use crate::{Args, ExecutionContext, Scope, Value};

/// Declared type of a function argument, for introspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Any,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKind::String => f.write_str("string"),
            ArgKind::Any => f.write_str("any"),
        }
    }
}

/// One declared argument of a query function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: String,
    pub doc: String,
    pub kind: ArgKind,
    pub required: bool,
}

/// Metadata describing a query function for registration and introspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionInfo {
    name: String,
    doc: String,
    args: Vec<ArgSpec>,
}

impl FunctionInfo {
    /// Create new metadata with the provided name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            args: Vec::new(),
        }
    }

    /// Replace the documentation string.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Append a required argument.
    pub fn required(self, name: impl Into<String>, kind: ArgKind, doc: impl Into<String>) -> Self {
        self.arg(name, kind, doc, true)
    }

    /// Append an optional argument.
    pub fn optional(self, name: impl Into<String>, kind: ArgKind, doc: impl Into<String>) -> Self {
        self.arg(name, kind, doc, false)
    }

    fn arg(
        mut self,
        name: impl Into<String>,
        kind: ArgKind,
        doc: impl Into<String>,
        required: bool,
    ) -> Self {
        self.args.push(ArgSpec {
            name: name.into(),
            doc: doc.into(),
            kind,
            required,
        });
        self
    }

    /// Unique function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn documentation(&self) -> &str {
        &self.doc
    }

    /// Declared arguments, in declaration order.
    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    pub fn arg_spec(&self, name: &str) -> Option<&ArgSpec> {
        self.args.iter().find(|arg| arg.name == name)
    }
}

/// A query function callable from the host.
///
/// Calls never fail from the host's point of view: problems are logged
/// through the scope and the null sentinel is returned.
pub trait Function: Send + Sync {
    fn info(&self) -> FunctionInfo;

    fn call(&self, ctx: &ExecutionContext, scope: &Scope, args: Args) -> Value;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_declaration_order() {
        let info = FunctionInfo::new("f")
            .doc("Does f.")
            .required("a", ArgKind::String, "first")
            .optional("b", ArgKind::Any, "second");

        assert_eq!(info.name(), "f");
        assert_eq!(info.documentation(), "Does f.");
        let names: Vec<_> = info.args().iter().map(|arg| arg.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(info.arg_spec("a").unwrap().required);
        assert!(!info.arg_spec("b").unwrap().required);
        assert!(info.arg_spec("c").is_none());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ArgKind::String.to_string(), "string");
        assert_eq!(ArgKind::Any.to_string(), "any");
    }
}
