use thiserror::Error;

/// Failures of script compilation, execution or plumbing.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The execution context ended and the run was aborted.
    #[error("execution cancelled")]
    Cancelled,

    /// The engine rejected or failed the script.
    #[error("{0}")]
    Script(String),

    #[error("{name} is not a function")]
    NotAFunction { name: String },

    #[error("cannot convert value: {0}")]
    Conversion(String),

    #[error("engine error: {0}")]
    Engine(#[from] rquickjs::Error),

    #[error("cannot start cancellation watcher: {0}")]
    Watcher(#[from] std::io::Error),
}

impl ScriptError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScriptError::Cancelled)
    }
}

impl From<serde_json::Error> for ScriptError {
    fn from(err: serde_json::Error) -> Self {
        ScriptError::Conversion(err.to_string())
    }
}
