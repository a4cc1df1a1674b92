// Prelude: one-import access to the most commonly used jsbridge types.
//
// Usage: `use jsbridge::prelude::*;`

// Core runtime types
pub use jsbridge_runtime::{
    BridgeConfig, BridgeError, BridgeResult, CallArgs, Converter, JsContext, ScriptEngine,
    Value, ValueKind, HostObject, HostValue,
};

// Member model
pub use jsbridge_runtime::{
    FieldMember, HostProperty, JsType, MemberId, MemberKind, MethodMember, PropertyMember,
    TypeDefinition, TypeMember,
};

// Script callables
pub use jsbridge_runtime::{Delegate, JsFunction, ScriptDelegate};

// Engines
pub use jsbridge_runtime::{FfiEngine, HeadlessEngine};

// FFI handles (rarely needed directly, but useful for advanced cases)
pub use jsbridge_runtime::{ArgsHandle, MemberAccess, ObjectHandle, TypeHandle};

// Proc macros
pub use jsbridge_macros::js_type;
