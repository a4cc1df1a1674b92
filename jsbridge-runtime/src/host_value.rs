// HostValue: the host-side ("boxed") form of a marshalled value.
//
// The converter produces HostValues from engine Values and back. Typed host
// functions never see HostValue directly; their thunks convert each slot
// through `FromHost` / `IntoHost`.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use jsbridge_ffi::ObjectHandle;

use crate::delegate::{JsFunction, ScriptDelegate};
use crate::error::BridgeResult;
use crate::js_type::JsType;
use crate::type_def::TypeDefinition;

/// Produces the exposed shape of a host object's type.
pub type DescribeFn = fn() -> BridgeResult<Rc<TypeDefinition>>;

/// A reference-counted host object that may be exposed to script.
///
/// Identity (for proxy caching) is the address of the shared allocation, so
/// clones of the same `Rc` map to the same proxy.
#[derive(Clone)]
pub struct HostObject {
    inner: Rc<dyn Any>,
    type_id: TypeId,
    type_name: &'static str,
    describe: Option<DescribeFn>,
}

impl HostObject {
    /// Wrap an object whose script shape is described by its `JsType` impl.
    pub fn new<T: JsType>(value: Rc<T>) -> Self {
        HostObject {
            inner: value,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            describe: Some(T::type_definition),
        }
    }

    /// Wrap an object with no declared shape. It can still travel through
    /// script as an opaque proxy (see `Converter::any_to_value`).
    pub fn opaque<T: 'static>(value: Rc<T>) -> Self {
        HostObject {
            inner: value,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            describe: None,
        }
    }

    /// Identity key of the underlying allocation.
    #[inline]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn describe_fn(&self) -> Option<DescribeFn> {
        self.describe
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.inner).downcast::<T>().ok()
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("type", &self.type_name)
            .field("identity", &format_args!("{:#x}", self.identity()))
            .finish()
    }
}

/// A marshalled value on the host side of the boundary.
#[derive(Clone, Debug, Default)]
pub enum HostValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int32(i32),
    Double(f64),
    Float(f32),
    String(String),
    /// A host object (possibly already exposed through a proxy).
    Object(HostObject),
    /// A script callable that has not been bound to a delegate shape.
    Function(JsFunction),
    /// A script callable bound to a delegate parameter.
    Delegate(ScriptDelegate),
    /// Any other engine-resident object, passed through untouched.
    ScriptObject(ObjectHandle),
}

impl HostValue {
    /// Short name of the variant (or the host type), for mismatch messages.
    pub fn describe(&self) -> String {
        match self {
            HostValue::Undefined => "undefined".into(),
            HostValue::Null => "null".into(),
            HostValue::Bool(_) => "bool".into(),
            HostValue::Int32(_) => "i32".into(),
            HostValue::Double(_) => "f64".into(),
            HostValue::Float(_) => "f32".into(),
            HostValue::String(_) => "string".into(),
            HostValue::Object(o) => format!("object `{}`", o.type_name()),
            HostValue::Function(_) => "function".into(),
            HostValue::Delegate(d) => format!("delegate/{}", d.arity()),
            HostValue::ScriptObject(_) => "script object".into(),
        }
    }

    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, HostValue::Undefined | HostValue::Null)
    }

    /// Wrap a described host object.
    pub fn object<T: JsType>(value: Rc<T>) -> Self {
        HostValue::Object(HostObject::new(value))
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        HostValue::Int32(v)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Double(v)
    }
}

impl From<f32> for HostValue {
    fn from(v: f32) -> Self {
        HostValue::Float(v)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::String(s.to_owned())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::String(s)
    }
}

impl From<HostObject> for HostValue {
    fn from(o: HostObject) -> Self {
        HostValue::Object(o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Opaque(#[allow(dead_code)] u8);

    #[test]
    fn identity_follows_the_allocation() {
        let rc = Rc::new(Opaque(1));
        let a = HostObject::opaque(Rc::clone(&rc));
        let b = HostObject::opaque(rc);
        let c = HostObject::opaque(Rc::new(Opaque(1)));
        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), c.identity());
    }

    #[test]
    fn downcast_checks_the_concrete_type() {
        let obj = HostObject::opaque(Rc::new(Opaque(7)));
        assert!(obj.is::<Opaque>());
        assert!(obj.downcast::<Opaque>().is_some());
        assert!(obj.downcast::<String>().is_none());
        assert!(obj.describe_fn().is_none());
    }
}
