// CallArgs: the host's view of one native call frame.

use std::rc::Rc;

use jsbridge_ffi::ArgsHandle;

use crate::context::JsContext;
use crate::error::{BridgeError, BridgeResult};
use crate::host_value::{HostObject, HostValue};
use crate::js_type::JsType;
use crate::type_def::TypeDefinition;
use crate::value::Value;

/// Argument access and a one-shot result slot for the call being dispatched.
///
/// Borrowed from the context for the duration of the call, so it cannot be
/// stored past the native frame it describes.
pub struct CallArgs<'a> {
    ctx: &'a JsContext,
    frame: ArgsHandle,
    result_set: bool,
}

impl<'a> CallArgs<'a> {
    pub fn new(ctx: &'a JsContext, frame: ArgsHandle) -> Self {
        CallArgs {
            ctx,
            frame,
            result_set: false,
        }
    }

    #[inline]
    pub fn context(&self) -> &'a JsContext {
        self.ctx
    }

    #[inline]
    pub fn frame(&self) -> ArgsHandle {
        self.frame
    }

    /// Number of arguments the script supplied.
    pub fn len(&self) -> usize {
        self.ctx.engine().arg_count(self.frame)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn this(&self) -> Value {
        self.ctx.engine().this_value(self.frame)
    }

    /// Argument `index`; undefined past the end.
    pub fn arg(&self, index: usize) -> Value {
        self.ctx.engine().arg(self.frame, index)
    }

    /// `this`, converted to its host form.
    pub fn this_host(&self) -> HostValue {
        self.ctx.converter().from_value(self.this())
    }

    /// Argument `index`, converted to its host form.
    pub fn arg_host(&self, index: usize) -> HostValue {
        self.ctx.converter().from_value(self.arg(index))
    }

    #[inline]
    pub fn result_is_set(&self) -> bool {
        self.result_set
    }

    fn put(&mut self, value: Value) -> BridgeResult<()> {
        if self.result_set {
            return Err(BridgeError::ResultAlreadySet);
        }
        self.ctx.engine().set_result(self.frame, &value);
        self.result_set = true;
        Ok(())
    }

    pub fn set_result_bool(&mut self, value: bool) -> BridgeResult<()> {
        self.put(Value::Boolean(value))
    }

    pub fn set_result_int32(&mut self, value: i32) -> BridgeResult<()> {
        self.put(Value::Int32(value))
    }

    pub fn set_result_double(&mut self, value: f64) -> BridgeResult<()> {
        self.put(Value::Double(value))
    }

    pub fn set_result_float(&mut self, value: f32) -> BridgeResult<()> {
        self.put(Value::Float(value))
    }

    pub fn set_result_string(&mut self, value: impl Into<String>) -> BridgeResult<()> {
        self.put(Value::String(value.into()))
    }

    pub fn set_result_null(&mut self) -> BridgeResult<()> {
        self.put(Value::Null)
    }

    pub fn set_result_undefined(&mut self) -> BridgeResult<()> {
        self.put(Value::Undefined)
    }

    pub fn set_result_value(&mut self, value: Value) -> BridgeResult<()> {
        self.put(value)
    }

    /// Any host value; objects are wrapped with their runtime type.
    pub fn set_result_obj(&mut self, value: HostValue) -> BridgeResult<()> {
        if self.result_set {
            return Err(BridgeError::ResultAlreadySet);
        }
        let value = self.ctx.converter().any_to_value(value)?;
        self.put(value)
    }

    /// A host object exposed through an explicit definition.
    pub fn set_result_wrapped(
        &mut self,
        obj: &HostObject,
        def: &Rc<TypeDefinition>,
    ) -> BridgeResult<()> {
        if self.result_set {
            return Err(BridgeError::ResultAlreadySet);
        }
        let value = self.ctx.converter().wrap(obj, def)?;
        self.put(value)
    }

    /// A host object exposed through `T`'s own definition.
    pub fn set_result_auto_wrap<T: JsType>(&mut self, value: Rc<T>) -> BridgeResult<()> {
        let obj = HostObject::new(value);
        let def = self.ctx.type_definition_of::<T>()?;
        self.set_result_wrapped(&obj, &def)
    }
}
