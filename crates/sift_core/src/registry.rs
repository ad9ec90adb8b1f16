//! Function registration
//!
//! A [`FunctionRegistry`] maps names to query functions and exposes their
//! metadata for introspection. [`FunctionCatalog`] holds the process-wide
//! registry that plugins add themselves to at startup.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;

use crate::{Args, ExecutionContext, Function, FunctionInfo, RegistrationError, Scope, Value};

/// Handle assigned to each registered function.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionHandle(u32);

impl FunctionHandle {
    /// Return the raw index backing this handle.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FunctionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct RegisteredFunction {
    handle: FunctionHandle,
    info: FunctionInfo,
    function: Arc<dyn Function>,
}

#[derive(Default)]
pub struct FunctionRegistry {
    functions: Vec<RegisteredFunction>,
    name_lookup: HashMap<String, FunctionHandle>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, function: F) -> Result<FunctionHandle, RegistrationError>
    where
        F: Function + 'static,
    {
        self.register_arc(Arc::new(function))
    }

    pub fn register_arc(
        &mut self,
        function: Arc<dyn Function>,
    ) -> Result<FunctionHandle, RegistrationError> {
        let info = function.info();
        if info.name().is_empty() {
            return Err(RegistrationError::EmptyName);
        }

        let name_key = info.name().to_string();
        if self.name_lookup.contains_key(&name_key) {
            return Err(RegistrationError::DuplicateName { name: name_key });
        }

        let mut seen = HashSet::new();
        for arg in info.args() {
            if !seen.insert(arg.name.as_str()) {
                return Err(RegistrationError::DuplicateArg {
                    function: name_key,
                    arg: arg.name.clone(),
                });
            }
        }

        let handle = FunctionHandle(self.functions.len() as u32);
        tracing::debug!(function = %name_key, %handle, "registered function");
        self.name_lookup.insert(name_key, handle);
        self.functions.push(RegisteredFunction {
            handle,
            info,
            function,
        });

        Ok(handle)
    }

    pub fn lookup(&self, name: &str) -> Option<FunctionHandle> {
        self.name_lookup.get(name).copied()
    }

    pub fn info(&self, handle: FunctionHandle) -> Option<&FunctionInfo> {
        self.functions
            .get(handle.index() as usize)
            .map(|registered| &registered.info)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        let handle = self.lookup(name)?;
        self.functions
            .get(handle.index() as usize)
            .map(|registered| Arc::clone(&registered.function))
    }

    /// Call a function by name. Unknown names are logged and yield null.
    pub fn call(&self, name: &str, ctx: &ExecutionContext, scope: &Scope, args: Args) -> Value {
        match self.get(name) {
            Some(function) => function.call(ctx, scope, args),
            None => {
                scope.log(format!("{name}: no such function"));
                Value::Null
            }
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FunctionHandle, &FunctionInfo)> {
        self.functions
            .iter()
            .map(|registered| (registered.handle, &registered.info))
    }
}

/// Process-wide function registry.
pub struct FunctionCatalog {
    registry: RwLock<FunctionRegistry>,
}

static CATALOG: Lazy<FunctionCatalog> = Lazy::new(|| FunctionCatalog {
    registry: RwLock::new(FunctionRegistry::new()),
});

impl FunctionCatalog {
    /// Access the global catalog singleton.
    pub fn global() -> &'static Self {
        &CATALOG
    }

    pub fn read(&self) -> RwLockReadGuard<'_, FunctionRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, FunctionRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgKind, MemoryLog};
    use serde_json::json;

    struct Echo {
        name: &'static str,
    }

    impl Function for Echo {
        fn info(&self) -> FunctionInfo {
            FunctionInfo::new(self.name)
                .doc("Echo the value argument.")
                .required("value", ArgKind::Any, "Value to echo.")
        }

        fn call(&self, _ctx: &ExecutionContext, _scope: &Scope, args: Args) -> Value {
            args.get("value").cloned().unwrap_or(Value::Null)
        }
    }

    struct Broken;

    impl Function for Broken {
        fn info(&self) -> FunctionInfo {
            FunctionInfo::new("broken")
                .required("a", ArgKind::Any, "")
                .optional("a", ArgKind::String, "")
        }

        fn call(&self, _ctx: &ExecutionContext, _scope: &Scope, _args: Args) -> Value {
            Value::Null
        }
    }

    #[test]
    fn test_register_and_call() {
        let mut registry = FunctionRegistry::new();
        let handle = registry.register(Echo { name: "echo" }).unwrap();

        assert_eq!(registry.lookup("echo"), Some(handle));
        assert_eq!(registry.info(handle).unwrap().name(), "echo");

        let mut args = Args::new();
        args.insert("value".into(), json!([1, 2]));
        let result = registry.call("echo", &ExecutionContext::new(), &Scope::new(), args);
        assert_eq!(result, json!([1, 2]));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = FunctionRegistry::new();
        registry.register(Echo { name: "echo" }).unwrap();

        let err = registry.register(Echo { name: "echo" }).unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateName { ref name } if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_arg_rejected() {
        let mut registry = FunctionRegistry::new();
        let err = registry.register(Broken).unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateArg { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = FunctionRegistry::new();
        let err = registry.register(Echo { name: "" }).unwrap_err();
        assert!(matches!(err, RegistrationError::EmptyName));
    }

    #[test]
    fn test_unknown_function_logs_and_returns_null() {
        let registry = FunctionRegistry::new();
        let log = Arc::new(MemoryLog::new());
        let scope = Scope::with_sink(log.clone());

        let result = registry.call("nope", &ExecutionContext::new(), &scope, Args::new());
        assert_eq!(result, Value::Null);
        assert_eq!(log.lines(), vec!["nope: no such function"]);
    }

    #[test]
    fn test_iter_exposes_metadata() {
        let mut registry = FunctionRegistry::new();
        registry.register(Echo { name: "a" }).unwrap();
        registry.register(Echo { name: "b" }).unwrap();

        let names: Vec<_> = registry.iter().map(|(_, info)| info.name().to_string()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_global_catalog_is_shared() {
        assert!(std::ptr::eq(FunctionCatalog::global(), FunctionCatalog::global()));

        let handle = FunctionCatalog::global()
            .write()
            .register(Echo { name: "catalog_echo" })
            .unwrap();
        assert!(matches!(
            FunctionCatalog::global().write().register(Echo { name: "catalog_echo" }),
            Err(RegistrationError::DuplicateName { .. })
        ));

        let catalog = FunctionCatalog::global().read();
        assert_eq!(catalog.lookup("catalog_echo"), Some(handle));
        let result = catalog.call(
            "catalog_echo",
            &ExecutionContext::new(),
            &Scope::new(),
            json!({ "value": 7 }).as_object().cloned().unwrap(),
        );
        assert_eq!(result, json!(7));
    }
}
