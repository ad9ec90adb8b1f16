//! Sift Core
//!
//! Host-side collaborators for query functions:
//! - Host value model and typed argument extraction
//! - Execution contexts with cancellation
//! - Scopes (logging channel + keyed cache store)
//! - Function metadata and registration

pub mod context;
pub mod error;
pub mod function;
pub mod registry;
pub mod scope;
pub mod value;

pub use context::{DoneSignal, EndReason, ExecutionContext};
pub use error::{ArgError, RegistrationError};
pub use function::{ArgKind, ArgSpec, Function, FunctionInfo};
pub use registry::{FunctionCatalog, FunctionHandle, FunctionRegistry};
pub use scope::{LogSink, MemoryLog, Scope, TracingLog};
pub use value::{extract_args, Args, Value};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
