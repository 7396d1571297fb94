//! The surface-visible error kinds from the error handling design,
//! reconciled into one `thiserror` enum. Every variant renders into the
//! message text carried by an `Error` token; none of these are
//! catchable by user code — they always short-circuit to the call
//! site that raised them.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("{name}: undefined")]
    Undefined { name: String },

    #[error("attempted application of a non-procedure")]
    NotCallable,

    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch { expected: String, got: usize },

    #[error("expected {expected}, got {got} {value}")]
    TypeMismatch { expected: String, got: String, value: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("index out of range: {index}")]
    IndexOutOfRange { index: i64 },

    #[error("feature missing: {feature}")]
    FeatureMissing { feature: String },

    #[error("illegal empty application")]
    IllegalEmptyApplication,

    #[error("set!: cannot set variable before its definition")]
    SetBeforeDefine,

    #[error("macro appeared at runtime: {name}")]
    MacroAtRuntime { name: String },

    #[error("module name rejected: {name}")]
    ModuleRejected { name: String },

    #[error("{0}")]
    UserRaised(String),

    #[error("{0}")]
    Custom(String),
}

impl EvalError {
    pub fn arity(expected: impl Into<String>, got: usize) -> Self {
        EvalError::ArityMismatch { expected: expected.into(), got }
    }

    pub fn type_mismatch(expected: impl Into<String>, got: impl Into<String>, value: impl Into<String>) -> Self {
        EvalError::TypeMismatch { expected: expected.into(), got: got.into(), value: value.into() }
    }

    pub fn undefined(name: impl Into<String>) -> Self {
        EvalError::Undefined { name: name.into() }
    }
}
