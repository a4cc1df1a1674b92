/// Status codes shared between Rust and the engine side.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeStatus {
    Ok = 0,
    InvalidArgument = 1,
    TypeMismatch = 2,
    MemberNotFound = 3,
    TypeNotRegistered = 4,
    NotCallable = 5,
    HostFault = 6,
    ScriptException = 7,
    ValidationFailed = 8,
    InternalError = 9,
}

/// Which operation the engine is requesting on a member.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberAccess {
    /// Invoke a method.
    Call = 0,
    /// Read a property, indexer or field.
    Get = 1,
    /// Write a property, indexer or field.
    Set = 2,
}

impl MemberAccess {
    /// Decode a raw access code coming from the engine.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(MemberAccess::Call),
            1 => Some(MemberAccess::Get),
            2 => Some(MemberAccess::Set),
            _ => None,
        }
    }
}
