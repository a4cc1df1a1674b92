// Script functions seen from the host.
//
// `JsFunction` keeps an engine function alive (retain on creation, release on
// drop). `ScriptDelegate` is a function bound to a delegate parameter of known
// arity, and `Delegate<A, R>` is its typed face inside host functions.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use jsbridge_ffi::ObjectHandle;

use crate::context::{JsContext, WeakContext};
use crate::error::{BridgeError, BridgeResult};
use crate::host_fn::{FromHost, IntoHost, ParamType};
use crate::host_value::HostValue;

struct FunctionRef {
    handle: ObjectHandle,
    context: WeakContext,
}

impl Drop for FunctionRef {
    fn drop(&mut self) {
        if let Some(ctx) = self.context.upgrade() {
            if !ctx.is_closed() {
                ctx.engine().release_handle(self.handle);
            }
        }
    }
}

/// A retained script function.
#[derive(Clone)]
pub struct JsFunction {
    inner: Rc<FunctionRef>,
}

impl JsFunction {
    pub(crate) fn retain(ctx: &JsContext, handle: ObjectHandle) -> Self {
        ctx.engine().retain_handle(handle);
        JsFunction {
            inner: Rc::new(FunctionRef {
                handle,
                context: ctx.downgrade(),
            }),
        }
    }

    #[inline]
    pub fn handle(&self) -> ObjectHandle {
        self.inner.handle
    }

    pub fn context(&self) -> BridgeResult<JsContext> {
        self.inner.context.upgrade().ok_or(BridgeError::ContextClosed)
    }

    /// Call with `this` undefined.
    pub fn call(&self, args: Vec<HostValue>) -> BridgeResult<HostValue> {
        self.call_with_this(HostValue::Undefined, args)
    }

    pub fn call_with_this(&self, this: HostValue, args: Vec<HostValue>) -> BridgeResult<HostValue> {
        let ctx = self.context()?;
        if ctx.is_closed() {
            return Err(BridgeError::ContextClosed);
        }
        let conv = ctx.converter();
        let this = conv.any_to_value(this)?;
        let args = args
            .into_iter()
            .map(|a| conv.any_to_value(a))
            .collect::<BridgeResult<Vec<_>>>()?;
        let result = ctx.engine().call_function(self.handle(), &this, &args)?;
        Ok(conv.from_value(result))
    }
}

impl fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JsFunction").field(&self.inner.handle).finish()
    }
}

/// A script function bound to a delegate parameter.
#[derive(Clone, Debug)]
pub struct ScriptDelegate {
    function: JsFunction,
    arity: usize,
}

impl ScriptDelegate {
    pub fn new(function: JsFunction, arity: usize) -> Self {
        ScriptDelegate { function, arity }
    }

    #[inline]
    pub fn function(&self) -> &JsFunction {
        &self.function
    }

    /// Number of arguments the host side passes.
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn invoke(&self, args: Vec<HostValue>) -> BridgeResult<HostValue> {
        if args.len() != self.arity {
            log::debug!(
                "delegate over {:?} called with {} arguments (bound with {})",
                self.function.handle(),
                args.len(),
                self.arity
            );
        }
        self.function.call(args)
    }
}

/// Argument tuples a host function can pass to a delegate.
pub trait ScriptArgs {
    const ARITY: usize;

    fn into_host_args(self) -> BridgeResult<Vec<HostValue>>;
}

macro_rules! impl_script_args {
    ($count:expr; $($arg:ident $var:ident),*) => {
        impl<$($arg: IntoHost,)*> ScriptArgs for ($($arg,)*) {
            const ARITY: usize = $count;

            #[allow(unused_variables)]
            fn into_host_args(self) -> BridgeResult<Vec<HostValue>> {
                let ($($var,)*) = self;
                Ok(vec![$($var.into_host()?),*])
            }
        }
    };
}

impl_script_args!(0;);
impl_script_args!(1; A0 a0);
impl_script_args!(2; A0 a0, A1 a1);
impl_script_args!(3; A0 a0, A1 a1, A2 a2);
impl_script_args!(4; A0 a0, A1 a1, A2 a2, A3 a3);
impl_script_args!(5; A0 a0, A1 a1, A2 a2, A3 a3, A4 a4);
impl_script_args!(6; A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);

/// A script function as seen by a host function: takes `A`, returns `R`.
///
/// Declared as a parameter type, it makes the dispatcher bind the script
/// callable passed in that position.
pub struct Delegate<A, R> {
    inner: ScriptDelegate,
    _marker: PhantomData<fn(A) -> R>,
}

impl<A: ScriptArgs, R: FromHost> Delegate<A, R> {
    pub fn new(function: JsFunction) -> Self {
        Self::from_script(ScriptDelegate::new(function, A::ARITY))
    }

    fn from_script(inner: ScriptDelegate) -> Self {
        Delegate {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn call(&self, args: A) -> BridgeResult<R> {
        let result = self.inner.invoke(args.into_host_args()?)?;
        R::from_host(result)
    }

    pub fn as_script(&self) -> &ScriptDelegate {
        &self.inner
    }
}

impl<A, R> Clone for Delegate<A, R> {
    fn clone(&self) -> Self {
        Delegate {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<A, R> fmt::Debug for Delegate<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Delegate").field(&self.inner).finish()
    }
}

impl<A: ScriptArgs, R: FromHost> FromHost for Delegate<A, R> {
    fn param_type() -> ParamType {
        ParamType::Delegate { arity: A::ARITY }
    }

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Delegate(d) => Ok(Self::from_script(d)),
            HostValue::Function(f) => Ok(Self::new(f)),
            other => Err(BridgeError::mismatch(
                format!("delegate/{}", A::ARITY),
                other.describe(),
            )),
        }
    }
}

impl FromHost for ScriptDelegate {
    fn param_type() -> ParamType {
        ParamType::Delegate { arity: 0 }
    }

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Delegate(d) => Ok(d),
            HostValue::Function(f) => Ok(ScriptDelegate::new(f, 0)),
            other => Err(BridgeError::mismatch("delegate", other.describe())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::headless::HeadlessEngine;
    use crate::value::Value;

    fn setup() -> (HeadlessEngine, JsContext) {
        let engine = HeadlessEngine::new();
        let ctx = JsContext::new(engine.clone(), BridgeConfig::default()).unwrap();
        (engine, ctx)
    }

    fn increment(_this: &Value, args: &[Value]) -> BridgeResult<Value> {
        match args.first() {
            Some(Value::Int32(x)) => Ok(Value::Int32(x + 1)),
            other => Err(BridgeError::Script(format!("bad argument {other:?}"))),
        }
    }

    #[test]
    fn typed_delegate_round_trips_through_script() {
        let (engine, ctx) = setup();
        let f = engine.define_function(increment);
        let bound = ctx
            .converter()
            .make_delegate(&Value::Handle(f), &<Delegate<(i32,), i32>>::param_type())
            .unwrap();
        let delegate = Delegate::<(i32,), i32>::from_host(bound).unwrap();
        assert_eq!(delegate.as_script().arity(), 1);
        assert_eq!(delegate.call((5,)).unwrap(), 6);
    }

    #[test]
    fn script_errors_propagate_to_the_host() {
        let (engine, ctx) = setup();
        let f = engine.define_function(increment);
        let HostValue::Function(func) = ctx.converter().from_value(Value::Handle(f)) else {
            panic!("expected a function");
        };
        let delegate = Delegate::<(String,), i32>::new(func);
        assert!(matches!(delegate.call(("x".into(),)), Err(BridgeError::Script(_))));
    }

    #[test]
    fn function_handles_are_retained_while_alive() {
        let (engine, ctx) = setup();
        let f = engine.define_function(increment);
        assert_eq!(engine.ref_count(f), 1);
        let HostValue::Function(func) = ctx.converter().from_value(Value::Handle(f)) else {
            panic!("expected a function");
        };
        let copy = func.clone();
        assert_eq!(engine.ref_count(f), 2);
        drop(func);
        assert_eq!(engine.ref_count(f), 2);
        drop(copy);
        assert_eq!(engine.ref_count(f), 1);
    }

    #[test]
    fn functions_outliving_their_context_fail_cleanly() {
        let (engine, ctx) = setup();
        let f = engine.define_function(increment);
        let HostValue::Function(func) = ctx.converter().from_value(Value::Handle(f)) else {
            panic!("expected a function");
        };
        drop(ctx);
        assert!(matches!(func.call(vec![HostValue::Int32(1)]), Err(BridgeError::ContextClosed)));
    }
}
