// jsbridge-runtime: safe Rust API over jsbridge-ffi.
// All unsafe FFI calls are confined to `ffi_engine`, `logging` and `value`.
// Generated code and user code go through the safe types exported here.

pub mod error;
pub mod value;
pub mod host_value;
pub mod host_fn;
pub mod member;
pub mod type_def;
pub mod js_type;
pub mod wire;
pub mod engine;
pub mod ffi_engine;
pub mod headless;
pub mod context;
pub mod converter;
pub mod call_args;
pub mod dispatch;
pub mod delegate;
pub mod directory;
pub mod config;
pub mod logging;
pub mod ffi_guard;

// Re-export the primary public API surface.
pub use error::{check_status, BridgeError, BridgeResult, ValidationError};
pub use value::{Value, ValueKind};
pub use host_value::{HostObject, HostValue};
pub use host_fn::{
    FromHost, HostMethodFn, HostMethodSignature, HostStaticFn, IntoHost, ParamType, ReturnType,
};
pub use member::{
    CallbackFn, FieldMember, HostMethod, MemberId, MemberKind, MethodBinding, MethodMember,
    PropertyMember, TypeMember,
};
pub use type_def::{assign_member_ids, MemberRef, TypeDefinition, TypeDefinitionBuilder};
pub use js_type::{registered_types, HostProperty, JsType, JsTypeRegistration};
pub use wire::{decode_type_record, encode_type_definition, MemberRecord, TypeRecord};
pub use engine::ScriptEngine;
pub use ffi_engine::FfiEngine;
pub use headless::HeadlessEngine;
pub use context::JsContext;
pub use converter::Converter;
pub use call_args::CallArgs;
pub use dispatch::invoke_method;
pub use delegate::{Delegate, JsFunction, ScriptArgs, ScriptDelegate};
pub use config::BridgeConfig;
pub use logging::{install_engine_logger, EngineLogger};
pub use ffi_guard::ffi_boundary;

// FFI types that appear in the public API.
pub use jsbridge_ffi::{ArgsHandle, BridgeStatus, MemberAccess, ObjectHandle, TypeHandle};
