// Value converter: engine Values <-> host values, proxy wrapping and
// function-to-delegate binding.

use std::rc::Rc;

use crate::context::JsContext;
use crate::delegate::{JsFunction, ScriptDelegate};
use crate::error::{BridgeError, BridgeResult};
use crate::host_fn::ParamType;
use crate::host_value::{HostObject, HostValue};
use crate::type_def::TypeDefinition;
use crate::value::Value;

/// Conversion helper bound to one context. Cheap to create per call.
#[derive(Clone, Copy)]
pub struct Converter<'a> {
    ctx: &'a JsContext,
}

impl<'a> Converter<'a> {
    pub fn new(ctx: &'a JsContext) -> Self {
        Converter { ctx }
    }

    /// Map an engine value to its host form. A handle resolves to the host
    /// object behind a proxy, then to a script function, then to an opaque
    /// script object.
    pub fn from_value(&self, value: Value) -> HostValue {
        match value {
            Value::Undefined => HostValue::Undefined,
            Value::Null => HostValue::Null,
            Value::Boolean(b) => HostValue::Bool(b),
            Value::Int32(v) => HostValue::Int32(v),
            Value::Double(v) => HostValue::Double(v),
            Value::Float(v) => HostValue::Float(v),
            Value::String(s) => HostValue::String(s),
            Value::Handle(handle) => {
                if let Some(obj) = self.ctx.lookup_proxy(handle) {
                    HostValue::Object(obj)
                } else if self.ctx.engine().is_callable(handle) {
                    HostValue::Function(JsFunction::retain(self.ctx, handle))
                } else {
                    HostValue::ScriptObject(handle)
                }
            }
        }
    }

    /// Map a host value to an engine value. Host objects are wrapped with
    /// their declared definition; undescribed objects are an error.
    pub fn to_value(&self, value: HostValue) -> BridgeResult<Value> {
        self.lower(value, |obj| self.ctx.definition_for(obj))
    }

    /// Like [`to_value`](Self::to_value) for values whose type is only known
    /// at runtime: undescribed objects travel as opaque proxies.
    pub fn any_to_value(&self, value: HostValue) -> BridgeResult<Value> {
        self.lower(value, |obj| self.ctx.definition_or_opaque(obj))
    }

    /// `describe` picks the definition a host object is wrapped with.
    fn lower(
        &self,
        value: HostValue,
        describe: impl FnOnce(&HostObject) -> BridgeResult<Rc<TypeDefinition>>,
    ) -> BridgeResult<Value> {
        Ok(match value {
            HostValue::Undefined => Value::Undefined,
            HostValue::Null => Value::Null,
            HostValue::Bool(b) => Value::Boolean(b),
            HostValue::Int32(v) => Value::Int32(v),
            HostValue::Double(v) => Value::Double(v),
            HostValue::Float(v) => Value::Float(v),
            HostValue::String(s) => Value::String(s),
            HostValue::Function(f) => Value::Handle(f.handle()),
            HostValue::Delegate(d) => Value::Handle(d.function().handle()),
            HostValue::ScriptObject(h) => Value::Handle(h),
            HostValue::Object(obj) => {
                let def = describe(&obj)?;
                return self.wrap(&obj, &def);
            }
        })
    }

    /// Proxy for `obj` exposed through `def`, reusing the cached one.
    pub fn wrap(&self, obj: &HostObject, def: &Rc<TypeDefinition>) -> BridgeResult<Value> {
        self.ctx.wrap(obj, def).map(Value::Handle)
    }

    /// Bind a script callable to a delegate parameter. Null or undefined
    /// binds to null when the parameter is optional.
    pub fn make_delegate(&self, value: &Value, param: &ParamType) -> BridgeResult<HostValue> {
        let optional = matches!(param, ParamType::Optional(_));
        match value {
            Value::Undefined | Value::Null if optional => Ok(HostValue::Null),
            Value::Handle(handle) if self.ctx.engine().is_callable(*handle) => {
                let arity = param.delegate_arity().unwrap_or(0);
                let function = JsFunction::retain(self.ctx, *handle);
                Ok(HostValue::Delegate(ScriptDelegate::new(function, arity)))
            }
            other => Err(BridgeError::NotCallable { found: other.kind() }),
        }
    }

    /// Convert one argument for a parameter declared as `param`.
    pub fn marshal_param(&self, value: Value, param: &ParamType) -> BridgeResult<HostValue> {
        if param.delegate_arity().is_some() {
            self.make_delegate(&value, param)
        } else {
            Ok(self.from_value(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::headless::HeadlessEngine;
    use crate::member::FieldMember;
    use crate::value::ValueKind;

    struct Widget;

    fn setup() -> (HeadlessEngine, JsContext) {
        let engine = HeadlessEngine::new();
        let ctx = JsContext::new(engine.clone(), BridgeConfig::default()).unwrap();
        (engine, ctx)
    }

    #[test]
    fn primitives_map_without_coercion() {
        let (_engine, ctx) = setup();
        let conv = ctx.converter();
        assert!(matches!(conv.from_value(Value::Int32(3)), HostValue::Int32(3)));
        assert!(matches!(conv.from_value(Value::Float(1.5)), HostValue::Float(f) if f == 1.5));
        assert_eq!(conv.to_value(HostValue::Double(2.0)).unwrap(), Value::Double(2.0));
        assert_eq!(conv.to_value(HostValue::from("hi")).unwrap(), Value::from("hi"));
    }

    #[test]
    fn wrapped_objects_come_back_as_the_same_host_object() {
        let (_engine, ctx) = setup();
        let conv = ctx.converter();
        let obj = HostObject::opaque(Rc::new(Widget));
        let v = conv.any_to_value(HostValue::Object(obj.clone())).unwrap();
        let HostValue::Object(back) = conv.from_value(v) else {
            panic!("expected the host object");
        };
        assert_eq!(back.identity(), obj.identity());
    }

    #[test]
    fn same_object_wrapped_twice_yields_one_proxy_and_one_registration() {
        let (engine, ctx) = setup();
        let conv = ctx.converter();
        let def = TypeDefinition::builder("Widget")
            .field(FieldMember::new("size"))
            .build()
            .unwrap();
        let obj = HostObject::opaque(Rc::new(Widget));
        let a = conv.wrap(&obj, &def).unwrap();
        let b = conv.wrap(&obj, &def).unwrap();
        assert_eq!(a, b);
        assert_eq!(engine.register_calls(), 1);

        let other = HostObject::opaque(Rc::new(Widget));
        let c = conv.wrap(&other, &def).unwrap();
        assert_ne!(a, c);
        assert_eq!(engine.register_calls(), 1);
        assert_eq!(ctx.proxy_count(), 2);
    }

    #[test]
    fn undescribed_objects_need_any_to_value() {
        let (_engine, ctx) = setup();
        let conv = ctx.converter();
        let obj = HostObject::opaque(Rc::new(Widget));
        let err = conv.to_value(HostValue::Object(obj.clone())).unwrap_err();
        assert!(matches!(err, BridgeError::Unwrappable { .. }));
        assert!(conv.any_to_value(HostValue::Object(obj)).is_ok());
    }

    #[test]
    fn callables_become_functions_and_other_handles_stay_opaque() {
        let (engine, ctx) = setup();
        let conv = ctx.converter();
        let f = engine.define_function(|_, _| Ok(Value::Undefined));
        let o = engine.define_object();
        assert!(matches!(conv.from_value(Value::Handle(f)), HostValue::Function(_)));
        assert!(matches!(conv.from_value(Value::Handle(o)), HostValue::ScriptObject(h) if h == o));
    }

    #[test]
    fn non_callables_cannot_become_delegates() {
        let (engine, ctx) = setup();
        let conv = ctx.converter();
        let param = ParamType::Delegate { arity: 1 };
        let err = conv.make_delegate(&Value::Int32(1), &param).unwrap_err();
        assert!(matches!(err, BridgeError::NotCallable { found: ValueKind::Int32 }));
        let obj = engine.define_object();
        assert!(conv.make_delegate(&Value::Handle(obj), &param).is_err());
        assert!(conv.make_delegate(&Value::Null, &param).is_err());
        let optional = ParamType::Optional(Box::new(param));
        assert!(matches!(conv.make_delegate(&Value::Null, &optional), Ok(HostValue::Null)));
    }
}
