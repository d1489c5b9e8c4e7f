use thiserror::Error;

/// Errors raised while compiling or running a filter/script expression.
///
/// `message` always preserves the underlying backend message; `Compile`/`Run`
/// additionally carry the offending source fragment so a caller can report
/// exactly which `[?(...)]`/`[(...)]` step failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("failed to compile expression `{source}`: {message}")]
    Compile { source: String, message: String },

    #[error("failed to run expression `{source}`: {message}")]
    Run { source: String, message: String },

    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("{0} expects {1} argument(s)")]
    Arity(String, usize),

    #[error("filter and script steps are disabled")]
    Disabled,

    #[error("native backend is not configured")]
    NativeUnavailable,
}
