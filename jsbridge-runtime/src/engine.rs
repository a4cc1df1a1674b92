// ScriptEngine: the operations the runtime needs from an embedded engine.
//
// `FfiEngine` implements it over the C API table; `HeadlessEngine` implements
// it in-process for tests and tooling. All methods take `&self`: an engine may
// call back into the runtime while one of its methods is on the stack.

use jsbridge_ffi::{ArgsHandle, ObjectHandle, TypeHandle};

use crate::error::BridgeResult;
use crate::value::Value;

pub trait ScriptEngine {
    // --- call frame ---

    /// Number of arguments the script supplied.
    fn arg_count(&self, args: ArgsHandle) -> usize;

    fn this_value(&self, args: ArgsHandle) -> Value;

    /// Argument `index`; undefined past the end.
    fn arg(&self, args: ArgsHandle, index: usize) -> Value;

    fn set_result(&self, args: ArgsHandle, value: &Value);

    /// Raise a script exception in the current call frame.
    fn throw_error(&self, args: ArgsHandle, message: &str);

    // --- types and handles ---

    /// Register an encoded type record under `type_id`.
    fn register_type(&self, type_id: u16, record: &[u8]) -> BridgeResult<TypeHandle>;

    /// Create a script object whose members dispatch to `ty`. `key` is echoed
    /// back in release notifications.
    fn create_proxy(&self, ty: TypeHandle, key: u64) -> BridgeResult<ObjectHandle>;

    fn retain_handle(&self, handle: ObjectHandle);

    fn release_handle(&self, handle: ObjectHandle);

    // --- script ---

    fn is_callable(&self, handle: ObjectHandle) -> bool;

    fn call_function(
        &self,
        function: ObjectHandle,
        this: &Value,
        args: &[Value],
    ) -> BridgeResult<Value>;

    fn execute(&self, source: &str) -> BridgeResult<Value>;
}
