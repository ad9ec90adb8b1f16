use thiserror::Error;

/// Errors that can occur while registering a function with a registry.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("function '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("function '{function}' declares argument '{arg}' more than once")]
    DuplicateArg { function: String, arg: String },

    #[error("function name must not be empty")]
    EmptyName,
}

/// Errors raised while extracting typed arguments from a call.
#[derive(Debug, Error)]
pub enum ArgError {
    #[error("{0}")]
    Invalid(#[from] serde_json::Error),
}
