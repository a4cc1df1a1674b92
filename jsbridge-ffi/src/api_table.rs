use crate::handles::*;
use crate::status::BridgeStatus;
use crate::value::JsValue;

// ---------------------------------------------------------------------------
// Main API table
// ---------------------------------------------------------------------------

/// The top-level table passed from the engine to Rust when a context is attached.
/// Sub-tables are grouped by concern; any sub-table pointer may be null only
/// where documented.
#[repr(C)]
pub struct JsBridgeApiTable {
    pub version: u32,

    pub call: *const JsCallApi,
    pub types: *const JsTypeApi,
    pub script: *const JsScriptApi,
    /// May be null when the engine has no log sink.
    pub logging: *const JsLoggingApi,
}

/// Version of the table layout this crate was built against.
pub const API_TABLE_VERSION: u32 = 1;

unsafe impl Send for JsBridgeApiTable {}
unsafe impl Sync for JsBridgeApiTable {}

// ---------------------------------------------------------------------------
// JsCallApi: access to one native call frame
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct JsCallApi {
    /// Number of arguments the script supplied.
    pub arg_count: unsafe extern "C" fn(args: ArgsHandle) -> i32,

    /// Write the frame's `this` value into `out`.
    pub get_this: unsafe extern "C" fn(args: ArgsHandle, out: *mut JsValue),

    /// Write argument `index` into `out`. Out-of-range indices yield undefined.
    pub get_arg: unsafe extern "C" fn(args: ArgsHandle, index: i32, out: *mut JsValue),

    pub result_set_bool: unsafe extern "C" fn(args: ArgsHandle, value: bool),
    pub result_set_int32: unsafe extern "C" fn(args: ArgsHandle, value: i32),
    pub result_set_double: unsafe extern "C" fn(args: ArgsHandle, value: f64),
    pub result_set_float: unsafe extern "C" fn(args: ArgsHandle, value: f32),

    /// `units` is UTF-16, `len` code units, copied by the engine before return.
    pub result_set_string: unsafe extern "C" fn(args: ArgsHandle, units: *const u16, len: i32),

    pub result_set_null: unsafe extern "C" fn(args: ArgsHandle),
    pub result_set_undefined: unsafe extern "C" fn(args: ArgsHandle),
    pub result_set_value: unsafe extern "C" fn(args: ArgsHandle, value: *const JsValue),

    /// Raise a script exception in this frame once the native call returns.
    /// `msg` is UTF-8 (not null-terminated).
    pub throw_error: unsafe extern "C" fn(args: ArgsHandle, msg: *const u8, msg_len: u32),
}

// ---------------------------------------------------------------------------
// JsTypeApi: type templates and proxies
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct JsTypeApi {
    /// Parse a type record (see the runtime wire codec) and create a native
    /// type template. Returns a null handle on failure.
    pub register_type: unsafe extern "C" fn(
        ctx: EngineContextHandle,
        type_id: u16,
        record: *const u8,
        record_len: u32,
    ) -> TypeHandle,

    /// Create a scriptable proxy of `type_handle`. `key` is echoed back in
    /// `release_proxy` when the engine collects the proxy.
    pub create_proxy: unsafe extern "C" fn(
        ctx: EngineContextHandle,
        type_handle: TypeHandle,
        key: u64,
    ) -> ObjectHandle,

    /// Keep an engine object alive beyond the current call frame.
    pub retain_handle: unsafe extern "C" fn(ctx: EngineContextHandle, handle: ObjectHandle),

    /// Drop a reference taken by `retain_handle` or `create_proxy`.
    pub release_handle: unsafe extern "C" fn(ctx: EngineContextHandle, handle: ObjectHandle),
}

// ---------------------------------------------------------------------------
// JsScriptApi: calling into script
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct JsScriptApi {
    pub is_callable: unsafe extern "C" fn(ctx: EngineContextHandle, handle: ObjectHandle) -> bool,

    /// Invoke a script function. String results in `out` stay valid until the
    /// next call into the engine.
    pub call_function: unsafe extern "C" fn(
        ctx: EngineContextHandle,
        func: ObjectHandle,
        this: *const JsValue,
        args: *const JsValue,
        argc: i32,
        out: *mut JsValue,
    ) -> BridgeStatus,

    /// Compile and run a script. `src` is UTF-16.
    pub execute: unsafe extern "C" fn(
        ctx: EngineContextHandle,
        src: *const u16,
        src_len: i32,
        out: *mut JsValue,
    ) -> BridgeStatus,

    /// Write the pending script exception message (UTF-8) into a caller buffer.
    pub last_error: unsafe extern "C" fn(
        ctx: EngineContextHandle,
        buf: *mut u8,
        buf_len: u32,
        out_len: *mut u32,
    ) -> BridgeStatus,
}

// ---------------------------------------------------------------------------
// JsLoggingApi
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct JsLoggingApi {
    /// `level`: 0=Trace, 1=Debug, 2=Info, 3=Warn, 4=Error.
    /// `msg` is a UTF-8 byte slice (not null-terminated).
    pub log: unsafe extern "C" fn(level: u8, msg: *const u8, msg_len: u32),
}
