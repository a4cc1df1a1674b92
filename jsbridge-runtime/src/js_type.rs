// JsType: host types that know their script-visible shape.
//
// `#[js_type]` implements JsType and submits a JsTypeRegistration to
// inventory, so a context can register every annotated type up front.

use std::any::TypeId;
use std::rc::Rc;

use crate::error::BridgeResult;
use crate::host_value::DescribeFn;
use crate::type_def::TypeDefinition;

/// A host type with a script-visible definition.
pub trait JsType: 'static {
    /// Build the definition. Contexts cache the result per type, so this runs
    /// at most once per context.
    fn type_definition() -> BridgeResult<Rc<TypeDefinition>>;
}

/// Submitted by `#[js_type]`.
pub struct JsTypeRegistration {
    pub name: &'static str,
    pub type_id: fn() -> TypeId,
    pub type_definition: DescribeFn,
}
inventory::collect!(JsTypeRegistration);

/// Every `#[js_type]` registration linked into the binary.
pub fn registered_types() -> impl Iterator<Item = &'static JsTypeRegistration> {
    inventory::iter::<JsTypeRegistration>.into_iter()
}

/// Getter/setter pair over a host type, used to derive field and property
/// accessors. Either half may be absent.
pub struct HostProperty<T: 'static, V: 'static> {
    pub get: Option<fn(&T) -> V>,
    pub set: Option<fn(&T, V)>,
}

impl<T: 'static, V: 'static> HostProperty<T, V> {
    pub const fn new(get: Option<fn(&T) -> V>, set: Option<fn(&T, V)>) -> Self {
        HostProperty { get, set }
    }

    pub const fn read_only(get: fn(&T) -> V) -> Self {
        HostProperty::new(Some(get), None)
    }

    pub const fn read_write(get: fn(&T) -> V, set: fn(&T, V)) -> Self {
        HostProperty::new(Some(get), Some(set))
    }
}
