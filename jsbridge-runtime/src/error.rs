// Error types for the jsbridge runtime.

use jsbridge_ffi::BridgeStatus;

use crate::value::ValueKind;

/// Structural problems in a member model, detected while sealing a type
/// definition or encoding it for the engine. Fatal to that registration only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("member name is empty (owner: {owner})")]
    EmptyName { owner: String },

    #[error("duplicate member name `{name}` in type `{owner}`")]
    DuplicateName { owner: String, name: String },

    #[error("name `{preview}…` is {units} UTF-16 units long (limit {limit})")]
    NameTooLong { preview: String, units: usize, limit: usize },

    #[error("type `{owner}` has {count} members (limit {limit})")]
    TooManyMembers { owner: String, count: usize, limit: usize },

    /// A parameter that a short call could leave without a value.
    #[error(
        "parameter {index} of `{member}` ({expected}) has no default; declare it as Option<..>"
    )]
    ParameterWithoutDefault { member: String, index: usize, expected: String },

    #[error("{accessor} of `{name}` is already bound")]
    AccessorAlreadyBound { name: String, accessor: &'static str },

    #[error("malformed type record: {0}")]
    MalformedRecord(String),
}

/// Rich error type for jsbridge operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A script value that is not callable was used where a delegate is required.
    #[error("cannot bind a delegate to a non-callable {found:?} value")]
    NotCallable { found: ValueKind },

    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("missing argument {index} of type {expected}")]
    MissingArgument { index: usize, expected: String },

    /// A host object has no type definition to build a proxy from.
    #[error("host object of type `{type_name}` has no type definition")]
    Unwrappable { type_name: &'static str },

    #[error("member {member_id} not found on type `{type_name}`")]
    MemberNotFound { type_name: String, member_id: u16 },

    #[error("type id {0} is not registered in this context")]
    TypeNotRegistered(u16),

    #[error("`{member}` does not support {access}")]
    InvalidAccess { member: String, access: &'static str },

    #[error("`{name}` has no {accessor}")]
    AccessorMissing { name: String, accessor: &'static str },

    #[error("call result was already set")]
    ResultAlreadySet,

    /// The invoked host function returned an error or panicked.
    #[error("host fault in `{member}`: {message}")]
    HostFault { member: String, message: String },

    /// The engine reported a script exception.
    #[error("script exception: {0}")]
    Script(String),

    #[error("the script context has been closed")]
    ContextClosed,

    #[error("engine call failed: {0:?}")]
    Engine(BridgeStatus),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

/// Convenience alias used throughout the runtime and generated code.
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// Status code reported back across the `extern "C"` boundary.
    pub fn status(&self) -> BridgeStatus {
        match self {
            BridgeError::Validation(_) => BridgeStatus::ValidationFailed,
            BridgeError::NotCallable { .. } => BridgeStatus::NotCallable,
            BridgeError::TypeMismatch { .. }
            | BridgeError::MissingArgument { .. }
            | BridgeError::Unwrappable { .. } => BridgeStatus::TypeMismatch,
            BridgeError::MemberNotFound { .. }
            | BridgeError::InvalidAccess { .. }
            | BridgeError::AccessorMissing { .. } => BridgeStatus::MemberNotFound,
            BridgeError::TypeNotRegistered(_) => BridgeStatus::TypeNotRegistered,
            BridgeError::HostFault { .. } => BridgeStatus::HostFault,
            BridgeError::Script(_) => BridgeStatus::ScriptException,
            BridgeError::Engine(code) => *code,
            BridgeError::ResultAlreadySet
            | BridgeError::ContextClosed
            | BridgeError::Config(_)
            | BridgeError::Unsupported(_) => BridgeStatus::InternalError,
        }
    }

    pub(crate) fn mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        BridgeError::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Attribute an anonymous host fault to `member`.
    pub(crate) fn in_member(self, member: &str) -> Self {
        match self {
            BridgeError::HostFault { member: m, message } if m.is_empty() => {
                BridgeError::HostFault {
                    member: member.to_owned(),
                    message,
                }
            }
            other => other,
        }
    }
}

/// Convert an engine status code to a `BridgeResult<()>`.
pub fn check_status(code: BridgeStatus) -> BridgeResult<()> {
    match code {
        BridgeStatus::Ok => Ok(()),
        other => Err(BridgeError::from(other)),
    }
}

impl From<BridgeStatus> for BridgeError {
    #[allow(clippy::match_same_arms)]
    fn from(code: BridgeStatus) -> Self {
        match code {
            BridgeStatus::ScriptException => BridgeError::Script(String::new()),
            BridgeStatus::TypeNotRegistered => BridgeError::TypeNotRegistered(u16::MAX),
            other => BridgeError::Engine(other),
        }
    }
}
