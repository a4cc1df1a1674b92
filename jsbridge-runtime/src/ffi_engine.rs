// FfiEngine: ScriptEngine over the C API table an engine hands to `attach`.

use jsbridge_ffi::{
    API_TABLE_VERSION, ArgsHandle, BridgeStatus, EngineContextHandle, JsBridgeApiTable, JsCallApi,
    JsScriptApi, JsTypeApi, JsValue, ObjectHandle, TypeHandle,
};

use crate::engine::ScriptEngine;
use crate::error::{BridgeError, BridgeResult, check_status};
use crate::value::Value;

/// Engine reached through `extern "C"` function tables.
///
/// The sub-table pointers are checked once at construction; afterwards every
/// call is a plain indirect call.
pub struct FfiEngine {
    call: &'static JsCallApi,
    types: &'static JsTypeApi,
    script: &'static JsScriptApi,
    native: EngineContextHandle,
}

impl FfiEngine {
    /// # Safety
    /// `table` must point to an API table whose sub-tables stay valid for the
    /// rest of the process, and `native` must be the engine context the
    /// table's functions expect.
    pub unsafe fn from_table(
        table: *const JsBridgeApiTable,
        native: EngineContextHandle,
    ) -> BridgeResult<Self> {
        // SAFETY: caller contract; null is rejected before any dereference.
        let table = unsafe { table.as_ref() }
            .ok_or(BridgeError::Engine(BridgeStatus::InvalidArgument))?;
        if table.version != API_TABLE_VERSION {
            log::error!(
                "engine API table version {} does not match {API_TABLE_VERSION}",
                table.version
            );
            return Err(BridgeError::Engine(BridgeStatus::InvalidArgument));
        }
        // SAFETY: caller contract; each pointer is checked for null.
        let (call, types, script) = unsafe {
            (table.call.as_ref(), table.types.as_ref(), table.script.as_ref())
        };
        match (call, types, script) {
            (Some(call), Some(types), Some(script)) => Ok(FfiEngine {
                call,
                types,
                script,
                native,
            }),
            _ => Err(BridgeError::Engine(BridgeStatus::InvalidArgument)),
        }
    }

    #[inline]
    pub fn native(&self) -> EngineContextHandle {
        self.native
    }

    /// Pending script exception message, if the engine has one.
    fn last_error(&self) -> String {
        let mut buf = vec![0u8; 256];
        let mut len = 0u32;
        // SAFETY: buffer and out pointer are valid for the call.
        let status = unsafe {
            (self.script.last_error)(self.native, buf.as_mut_ptr(), buf.len() as u32, &mut len)
        };
        if status != BridgeStatus::Ok {
            return String::new();
        }
        if len as usize > buf.len() {
            buf.resize(len as usize, 0);
            // SAFETY: as above, with the enlarged buffer.
            let status = unsafe {
                (self.script.last_error)(self.native, buf.as_mut_ptr(), buf.len() as u32, &mut len)
            };
            if status != BridgeStatus::Ok {
                return String::new();
            }
        }
        buf.truncate(len as usize);
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn script_result(&self, status: BridgeStatus, out: &JsValue) -> BridgeResult<Value> {
        match check_status(status) {
            // SAFETY: the engine filled `out`; strings stay valid until the
            // next engine call, and `from_raw` copies them immediately.
            Ok(()) => Ok(unsafe { Value::from_raw(out) }),
            Err(BridgeError::Script(_)) => Err(BridgeError::Script(self.last_error())),
            Err(e) => Err(e),
        }
    }
}

impl ScriptEngine for FfiEngine {
    fn arg_count(&self, args: ArgsHandle) -> usize {
        // SAFETY: `args` is the live frame passed to `invoke_member`.
        let n = unsafe { (self.call.arg_count)(args) };
        n.max(0) as usize
    }

    fn this_value(&self, args: ArgsHandle) -> Value {
        let mut out = JsValue::undefined();
        // SAFETY: live frame; `out` is a valid write target.
        unsafe {
            (self.call.get_this)(args, &mut out);
            Value::from_raw(&out)
        }
    }

    fn arg(&self, args: ArgsHandle, index: usize) -> Value {
        let Ok(index) = i32::try_from(index) else {
            return Value::Undefined;
        };
        let mut out = JsValue::undefined();
        // SAFETY: live frame; out-of-range indices yield undefined.
        unsafe {
            (self.call.get_arg)(args, index, &mut out);
            Value::from_raw(&out)
        }
    }

    fn set_result(&self, args: ArgsHandle, value: &Value) {
        let c = self.call;
        // SAFETY: live frame; string units are copied by the engine before
        // `result_set_string` returns.
        unsafe {
            match value {
                Value::Undefined => (c.result_set_undefined)(args),
                Value::Null => (c.result_set_null)(args),
                Value::Boolean(b) => (c.result_set_bool)(args, *b),
                Value::Int32(v) => (c.result_set_int32)(args, *v),
                Value::Double(v) => (c.result_set_double)(args, *v),
                Value::Float(v) => (c.result_set_float)(args, *v),
                Value::String(s) => {
                    let units: Vec<u16> = s.encode_utf16().collect();
                    (c.result_set_string)(args, units.as_ptr(), units.len() as i32)
                }
                Value::Handle(_) => value.with_raw(|raw| (c.result_set_value)(args, raw)),
            }
        }
    }

    fn throw_error(&self, args: ArgsHandle, message: &str) {
        // SAFETY: live frame; the message is copied by the engine.
        unsafe { (self.call.throw_error)(args, message.as_ptr(), message.len() as u32) }
    }

    fn register_type(&self, type_id: u16, record: &[u8]) -> BridgeResult<TypeHandle> {
        // SAFETY: the record slice is valid for the call.
        let handle = unsafe {
            (self.types.register_type)(self.native, type_id, record.as_ptr(), record.len() as u32)
        };
        if handle.is_null() {
            Err(BridgeError::Engine(BridgeStatus::ValidationFailed))
        } else {
            Ok(handle)
        }
    }

    fn create_proxy(&self, ty: TypeHandle, key: u64) -> BridgeResult<ObjectHandle> {
        // SAFETY: `ty` came from `register_type` on this engine.
        let handle = unsafe { (self.types.create_proxy)(self.native, ty, key) };
        if handle.is_null() {
            Err(BridgeError::Engine(BridgeStatus::InternalError))
        } else {
            Ok(handle)
        }
    }

    fn retain_handle(&self, handle: ObjectHandle) {
        // SAFETY: handle belongs to this engine context.
        unsafe { (self.types.retain_handle)(self.native, handle) }
    }

    fn release_handle(&self, handle: ObjectHandle) {
        // SAFETY: handle belongs to this engine context.
        unsafe { (self.types.release_handle)(self.native, handle) }
    }

    fn is_callable(&self, handle: ObjectHandle) -> bool {
        // SAFETY: handle belongs to this engine context.
        unsafe { (self.script.is_callable)(self.native, handle) }
    }

    fn call_function(
        &self,
        function: ObjectHandle,
        this: &Value,
        args: &[Value],
    ) -> BridgeResult<Value> {
        let mut strings = Vec::new();
        let raw_this = this.lower(&mut strings);
        let raw_args: Vec<JsValue> = args.iter().map(|a| a.lower(&mut strings)).collect();
        let mut out = JsValue::undefined();
        // SAFETY: all raw values (and their string buffers) outlive the call.
        let status = unsafe {
            (self.script.call_function)(
                self.native,
                function,
                &raw_this,
                raw_args.as_ptr(),
                raw_args.len() as i32,
                &mut out,
            )
        };
        self.script_result(status, &out)
    }

    fn execute(&self, source: &str) -> BridgeResult<Value> {
        let units: Vec<u16> = source.encode_utf16().collect();
        let mut out = JsValue::undefined();
        // SAFETY: the source buffer outlives the call.
        let status = unsafe {
            (self.script.execute)(self.native, units.as_ptr(), units.len() as i32, &mut out)
        };
        self.script_result(status, &out)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    thread_local! {
        static RESULT: RefCell<Option<Value>> = const { RefCell::new(None) };
    }

    unsafe extern "C" fn arg_count(_: ArgsHandle) -> i32 {
        2
    }
    unsafe extern "C" fn get_this(_: ArgsHandle, out: *mut JsValue) {
        unsafe { *out = JsValue::null() }
    }
    unsafe extern "C" fn get_arg(_: ArgsHandle, index: i32, out: *mut JsValue) {
        unsafe { *out = JsValue::int32(index * 10) }
    }
    unsafe extern "C" fn set_bool(_: ArgsHandle, v: bool) {
        RESULT.with(|r| *r.borrow_mut() = Some(Value::Boolean(v)));
    }
    unsafe extern "C" fn set_int32(_: ArgsHandle, v: i32) {
        RESULT.with(|r| *r.borrow_mut() = Some(Value::Int32(v)));
    }
    unsafe extern "C" fn set_double(_: ArgsHandle, v: f64) {
        RESULT.with(|r| *r.borrow_mut() = Some(Value::Double(v)));
    }
    unsafe extern "C" fn set_float(_: ArgsHandle, v: f32) {
        RESULT.with(|r| *r.borrow_mut() = Some(Value::Float(v)));
    }
    unsafe extern "C" fn set_string(_: ArgsHandle, units: *const u16, len: i32) {
        let units = unsafe { std::slice::from_raw_parts(units, len as usize) };
        let s = String::from_utf16_lossy(units);
        RESULT.with(|r| *r.borrow_mut() = Some(Value::String(s)));
    }
    unsafe extern "C" fn set_null(_: ArgsHandle) {
        RESULT.with(|r| *r.borrow_mut() = Some(Value::Null));
    }
    unsafe extern "C" fn set_undefined(_: ArgsHandle) {
        RESULT.with(|r| *r.borrow_mut() = Some(Value::Undefined));
    }
    unsafe extern "C" fn set_value(_: ArgsHandle, v: *const JsValue) {
        let v = unsafe { Value::from_raw(&*v) };
        RESULT.with(|r| *r.borrow_mut() = Some(v));
    }
    unsafe extern "C" fn throw_error(_: ArgsHandle, _: *const u8, _: u32) {}

    unsafe extern "C" fn register_type(
        _: EngineContextHandle,
        type_id: u16,
        _: *const u8,
        len: u32,
    ) -> TypeHandle {
        if len == 0 { TypeHandle::null() } else { TypeHandle(type_id as u64 + 100) }
    }
    unsafe extern "C" fn create_proxy(
        _: EngineContextHandle,
        ty: TypeHandle,
        key: u64,
    ) -> ObjectHandle {
        ObjectHandle(ty.0 * 1000 + key)
    }
    unsafe extern "C" fn handle_noop(_: EngineContextHandle, _: ObjectHandle) {}

    unsafe extern "C" fn is_callable(_: EngineContextHandle, h: ObjectHandle) -> bool {
        h.0 == 7
    }
    unsafe extern "C" fn call_function(
        _: EngineContextHandle,
        func: ObjectHandle,
        _this: *const JsValue,
        args: *const JsValue,
        argc: i32,
        out: *mut JsValue,
    ) -> BridgeStatus {
        if func.0 != 7 {
            return BridgeStatus::ScriptException;
        }
        let args = unsafe { std::slice::from_raw_parts(args, argc as usize) };
        let total: i32 = args.iter().map(|a| unsafe { a.payload.int32 }).sum();
        unsafe { *out = JsValue::int32(total) };
        BridgeStatus::Ok
    }
    unsafe extern "C" fn execute(
        _: EngineContextHandle,
        _: *const u16,
        len: i32,
        out: *mut JsValue,
    ) -> BridgeStatus {
        unsafe { *out = JsValue::int32(len) };
        BridgeStatus::Ok
    }
    unsafe extern "C" fn last_error(
        _: EngineContextHandle,
        buf: *mut u8,
        cap: u32,
        out_len: *mut u32,
    ) -> BridgeStatus {
        let msg = b"ReferenceError: f is not defined";
        unsafe {
            *out_len = msg.len() as u32;
            if msg.len() as u32 <= cap {
                std::ptr::copy_nonoverlapping(msg.as_ptr(), buf, msg.len());
            }
        }
        BridgeStatus::Ok
    }

    static CALL: JsCallApi = JsCallApi {
        arg_count,
        get_this,
        get_arg,
        result_set_bool: set_bool,
        result_set_int32: set_int32,
        result_set_double: set_double,
        result_set_float: set_float,
        result_set_string: set_string,
        result_set_null: set_null,
        result_set_undefined: set_undefined,
        result_set_value: set_value,
        throw_error,
    };
    static TYPES: JsTypeApi = JsTypeApi {
        register_type,
        create_proxy,
        retain_handle: handle_noop,
        release_handle: handle_noop,
    };
    static SCRIPT: JsScriptApi = JsScriptApi {
        is_callable,
        call_function,
        execute,
        last_error,
    };

    fn engine() -> FfiEngine {
        let table = JsBridgeApiTable {
            version: API_TABLE_VERSION,
            call: &CALL,
            types: &TYPES,
            script: &SCRIPT,
            logging: std::ptr::null(),
        };
        unsafe { FfiEngine::from_table(&table, EngineContextHandle::null()) }.unwrap()
    }

    #[test]
    fn rejects_mismatched_versions_and_missing_tables() {
        let mut table = JsBridgeApiTable {
            version: API_TABLE_VERSION + 1,
            call: &CALL,
            types: &TYPES,
            script: &SCRIPT,
            logging: std::ptr::null(),
        };
        assert!(unsafe { FfiEngine::from_table(&table, EngineContextHandle::null()) }.is_err());
        table.version = API_TABLE_VERSION;
        table.script = std::ptr::null();
        assert!(unsafe { FfiEngine::from_table(&table, EngineContextHandle::null()) }.is_err());
        let native = EngineContextHandle::null();
        let engine = unsafe { FfiEngine::from_table(std::ptr::null(), native) };
        assert!(engine.is_err());
    }

    #[test]
    fn frame_access_goes_through_the_call_table() {
        let e = engine();
        let frame = ArgsHandle::null();
        assert_eq!(e.arg_count(frame), 2);
        assert_eq!(e.this_value(frame), Value::Null);
        assert_eq!(e.arg(frame, 1), Value::Int32(10));
        e.set_result(frame, &Value::from("ok"));
        assert_eq!(RESULT.with(|r| r.borrow().clone()), Some(Value::from("ok")));
        e.set_result(frame, &Value::Handle(ObjectHandle(9)));
        assert_eq!(RESULT.with(|r| r.borrow().clone()), Some(Value::Handle(ObjectHandle(9))));
    }

    #[test]
    fn null_type_handles_are_registration_failures() {
        let e = engine();
        assert_eq!(e.register_type(3, &[1, 2]).unwrap(), TypeHandle(103));
        assert!(e.register_type(3, &[]).is_err());
        assert_eq!(e.create_proxy(TypeHandle(1), 5).unwrap(), ObjectHandle(1005));
    }

    #[test]
    fn script_exceptions_carry_the_engine_message() {
        let e = engine();
        assert!(e.is_callable(ObjectHandle(7)));
        let sum = e
            .call_function(ObjectHandle(7), &Value::Undefined, &[Value::Int32(2), Value::Int32(3)])
            .unwrap();
        assert_eq!(sum, Value::Int32(5));
        let err = e.call_function(ObjectHandle(8), &Value::Undefined, &[]).unwrap_err();
        assert!(matches!(err, BridgeError::Script(msg) if msg.starts_with("ReferenceError")));
        assert_eq!(e.execute("1 + 1").unwrap(), Value::Int32(5));
    }
}
