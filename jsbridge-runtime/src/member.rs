// Member model: fields, methods and properties of an exposed host type.
//
// Members are built detached (no owner, no id) and sealed into a
// TypeDefinition by `TypeDefinitionBuilder::build()`, which is the only place
// that writes the owner back-reference and the member id.

use std::cell::OnceCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use crate::call_args::CallArgs;
use crate::error::{BridgeError, BridgeResult, ValidationError};
use crate::host_fn::{
    FromHost, HostMethodFn, HostMethodSignature, HostStaticFn, HostThunk, IntoHost, ParamType,
    ReturnType,
};
use crate::host_value::HostValue;
use crate::js_type::HostProperty;
use crate::type_def::TypeDefinition;

/// What a member is, as reported to the engine and in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MemberKind {
    Field,
    Method,
    Event,
    Property,
    Indexer,
    PropertyGet,
    PropertySet,
    IndexerGet,
    IndexerSet,
    Type,
}

/// Identifier of a member within its owning type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub u16);

/// State shared by every member kind.
pub struct MemberInfo {
    name: String,
    kind: MemberKind,
    id: MemberId,
    owner: Weak<TypeDefinition>,
}

impl MemberInfo {
    fn detached(name: impl Into<String>, kind: MemberKind) -> Self {
        MemberInfo {
            name: name.into(),
            kind,
            id: MemberId::default(),
            owner: Weak::new(),
        }
    }
}

impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("sealed", &(self.owner.strong_count() > 0))
            .finish()
    }
}

/// Common read access over every member.
pub trait TypeMember {
    fn info(&self) -> &MemberInfo;

    fn name(&self) -> &str {
        &self.info().name
    }

    fn kind(&self) -> MemberKind {
        self.info().kind
    }

    fn member_id(&self) -> MemberId {
        self.info().id
    }

    /// Owning type, once the member has been sealed into one.
    fn owner(&self) -> Option<Rc<TypeDefinition>> {
        self.info().owner.upgrade()
    }
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// Raw callback binding: receives the call frame with no argument adaptation.
pub type CallbackFn = Rc<dyn Fn(&mut CallArgs<'_>) -> BridgeResult<()>>;

/// A typed host function with its eagerly captured signature.
#[derive(Clone)]
pub struct HostMethod {
    signature: HostMethodSignature,
    thunk: HostThunk,
}

impl HostMethod {
    pub fn new(signature: HostMethodSignature, thunk: HostThunk) -> Self {
        HostMethod { signature, thunk }
    }

    pub fn of_method<M, F: HostMethodFn<M>>(f: F) -> Self {
        HostMethod::new(F::signature(), f.into_thunk())
    }

    pub fn of_static<M, F: HostStaticFn<M>>(f: F) -> Self {
        HostMethod::new(F::signature(), f.into_thunk())
    }

    #[inline]
    pub fn signature(&self) -> &HostMethodSignature {
        &self.signature
    }

    #[inline]
    pub fn params(&self) -> &[ParamType] {
        &self.signature.params
    }

    #[inline]
    pub fn returns(&self) -> &ReturnType {
        &self.signature.returns
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.signature.receiver.is_none()
    }

    /// Run the thunk. With `catch_panics`, a panicking host function becomes a
    /// `HostFault` instead of unwinding into the engine.
    pub fn invoke(
        &self,
        this: HostValue,
        args: Vec<HostValue>,
        catch_panics: bool,
    ) -> BridgeResult<HostValue> {
        if !catch_panics {
            return (self.thunk)(this, args);
        }
        match catch_unwind(AssertUnwindSafe(|| (self.thunk)(this, args))) {
            Ok(result) => result,
            Err(payload) => Err(BridgeError::HostFault {
                member: String::new(),
                message: crate::ffi_guard::panic_message(&payload),
            }),
        }
    }
}

/// How a method is bound. Exactly one mode per method.
#[derive(Clone)]
pub enum MethodBinding {
    Host(HostMethod),
    Callback(CallbackFn),
}

pub struct MethodMember {
    info: MemberInfo,
    binding: MethodBinding,
}

impl MethodMember {
    /// A method bound to `Fn(&T, A0, ...) -> R`.
    pub fn host<M, F: HostMethodFn<M>>(name: impl Into<String>, f: F) -> Self {
        Self::from_host_method(name, HostMethod::of_method(f))
    }

    /// A method bound to `Fn(A0, ...) -> R`; "this" is ignored.
    pub fn host_static<M, F: HostStaticFn<M>>(name: impl Into<String>, f: F) -> Self {
        Self::from_host_method(name, HostMethod::of_static(f))
    }

    pub fn from_host_method(name: impl Into<String>, method: HostMethod) -> Self {
        MethodMember {
            info: MemberInfo::detached(name, MemberKind::Method),
            binding: MethodBinding::Host(method),
        }
    }

    /// A method that handles the raw call frame itself.
    pub fn callback(
        name: impl Into<String>,
        f: impl Fn(&mut CallArgs<'_>) -> BridgeResult<()> + 'static,
    ) -> Self {
        MethodMember {
            info: MemberInfo::detached(name, MemberKind::Method),
            binding: MethodBinding::Callback(Rc::new(f)),
        }
    }

    #[inline]
    pub fn binding(&self) -> &MethodBinding {
        &self.binding
    }

    fn retag(mut self, kind: MemberKind) -> Self {
        self.info.kind = kind;
        self
    }

    pub(crate) fn seal(&mut self, id: MemberId, owner: &Weak<TypeDefinition>) {
        self.info.id = id;
        self.info.owner = owner.clone();
    }

    /// Reject host bindings with a parameter a short call cannot fill.
    /// Callback bindings read the frame themselves and always pass.
    pub fn check_defaults(&self) -> Result<(), ValidationError> {
        match &self.binding {
            MethodBinding::Host(host) => host.signature().check_defaults(&self.info.name),
            MethodBinding::Callback(_) => Ok(()),
        }
    }
}

impl TypeMember for MethodMember {
    fn info(&self) -> &MemberInfo {
        &self.info
    }
}

impl fmt::Debug for MethodMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binding = match &self.binding {
            MethodBinding::Host(m) => format!("host{:?}", m.params()),
            MethodBinding::Callback(_) => "callback".to_owned(),
        };
        f.debug_struct("MethodMember")
            .field("info", &self.info)
            .field("binding", &binding)
            .finish()
    }
}

fn accessors_of<T: 'static, V>(
    name: &str,
    prop: HostProperty<T, V>,
) -> (Option<MethodMember>, Option<MethodMember>)
where
    V: FromHost + IntoHost + 'static,
{
    let getter = prop.get.map(|g| MethodMember::host(name, g));
    let setter = prop.set.map(|s| MethodMember::host(name, s));
    (getter, setter)
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A data slot. Reads and writes go through optional accessor thunks; a bare
/// field reads as undefined.
#[derive(Debug)]
pub struct FieldMember {
    info: MemberInfo,
    getter: Option<MethodMember>,
    setter: Option<MethodMember>,
}

impl FieldMember {
    pub fn new(name: impl Into<String>) -> Self {
        FieldMember {
            info: MemberInfo::detached(name, MemberKind::Field),
            getter: None,
            setter: None,
        }
    }

    pub fn with_accessors<T: 'static, V>(name: impl Into<String>, prop: HostProperty<T, V>) -> Self
    where
        V: FromHost + IntoHost + 'static,
    {
        let name = name.into();
        let (getter, setter) = accessors_of(&name, prop);
        FieldMember {
            info: MemberInfo::detached(name, MemberKind::Field),
            getter: getter.map(|m| m.retag(MemberKind::PropertyGet)),
            setter: setter.map(|m| m.retag(MemberKind::PropertySet)),
        }
    }

    pub fn getter(&self) -> Option<&MethodMember> {
        self.getter.as_ref()
    }

    pub fn setter(&self) -> Option<&MethodMember> {
        self.setter.as_ref()
    }

    pub(crate) fn seal(&mut self, id: MemberId, owner: &Weak<TypeDefinition>) {
        self.info.id = id;
        self.info.owner = owner.clone();
        for accessor in [self.getter.as_mut(), self.setter.as_mut()].into_iter().flatten() {
            accessor.seal(id, owner);
        }
    }
}

impl TypeMember for FieldMember {
    fn info(&self) -> &MemberInfo {
        &self.info
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// A property (or indexer) with optional getter and setter.
///
/// Accessors live in `OnceCell`s so a blank property can be populated after
/// its definition has been sealed; each accessor can be bound once.
#[derive(Debug)]
pub struct PropertyMember {
    info: MemberInfo,
    getter: OnceCell<MethodMember>,
    setter: OnceCell<MethodMember>,
    is_indexer: bool,
}

impl PropertyMember {
    /// A blank property. Accessors are attached later.
    pub fn new(name: impl Into<String>) -> Self {
        PropertyMember {
            info: MemberInfo::detached(name, MemberKind::Property),
            getter: OnceCell::new(),
            setter: OnceCell::new(),
            is_indexer: false,
        }
    }

    /// Property backed by raw call-frame callbacks.
    pub fn with_callbacks(
        name: impl Into<String>,
        get: Option<CallbackFn>,
        set: Option<CallbackFn>,
    ) -> Self {
        let prop = PropertyMember::new(name);
        let name = prop.info.name.clone();
        if let Some(get) = get {
            let _ = prop.getter.set(
                MethodMember {
                    info: MemberInfo::detached(name.clone(), MemberKind::Method),
                    binding: MethodBinding::Callback(get),
                }
                .retag(MemberKind::PropertyGet),
            );
        }
        if let Some(set) = set {
            let _ = prop.setter.set(
                MethodMember {
                    info: MemberInfo::detached(name, MemberKind::Method),
                    binding: MethodBinding::Callback(set),
                }
                .retag(MemberKind::PropertySet),
            );
        }
        prop
    }

    /// Property derived from a host accessor pair. Accessor members are
    /// created only for the accessors that exist.
    pub fn from_host_property<T: 'static, V>(
        name: impl Into<String>,
        prop: HostProperty<T, V>,
    ) -> Self
    where
        V: FromHost + IntoHost + 'static,
    {
        let member = PropertyMember::new(name);
        let (getter, setter) = accessors_of(&member.info.name, prop);
        if let Some(g) = getter {
            let _ = member.getter.set(g.retag(MemberKind::PropertyGet));
        }
        if let Some(s) = setter {
            let _ = member.setter.set(s.retag(MemberKind::PropertySet));
        }
        member
    }

    /// Mark as an indexer; accessors take the key as their first argument.
    pub fn indexer(mut self) -> Self {
        self.is_indexer = true;
        if let Some(g) = self.getter.get_mut() {
            g.info.kind = MemberKind::IndexerGet;
        }
        if let Some(s) = self.setter.get_mut() {
            s.info.kind = MemberKind::IndexerSet;
        }
        self
    }

    #[inline]
    pub fn is_indexer(&self) -> bool {
        self.is_indexer
    }

    pub fn getter(&self) -> Option<&MethodMember> {
        self.getter.get()
    }

    pub fn setter(&self) -> Option<&MethodMember> {
        self.setter.get()
    }

    fn accessor_kind(&self, get: bool) -> MemberKind {
        match (self.is_indexer, get) {
            (false, true) => MemberKind::PropertyGet,
            (false, false) => MemberKind::PropertySet,
            (true, true) => MemberKind::IndexerGet,
            (true, false) => MemberKind::IndexerSet,
        }
    }

    fn adopt(&self, mut accessor: MethodMember, get: bool) -> MethodMember {
        accessor.info.kind = self.accessor_kind(get);
        accessor.seal(self.info.id, &self.info.owner);
        accessor
    }

    /// Attach the getter. Fails if one is already bound.
    pub fn attach_getter(&self, accessor: MethodMember) -> BridgeResult<()> {
        accessor.check_defaults()?;
        let accessor = self.adopt(accessor, true);
        self.getter.set(accessor).map_err(|_| {
            ValidationError::AccessorAlreadyBound {
                name: self.info.name.clone(),
                accessor: "getter",
            }
            .into()
        })
    }

    /// Attach the setter. Fails if one is already bound.
    pub fn attach_setter(&self, accessor: MethodMember) -> BridgeResult<()> {
        accessor.check_defaults()?;
        let accessor = self.adopt(accessor, false);
        self.setter.set(accessor).map_err(|_| {
            ValidationError::AccessorAlreadyBound {
                name: self.info.name.clone(),
                accessor: "setter",
            }
            .into()
        })
    }

    /// Return the getter, building it with `make` on first use.
    pub fn getter_or_attach(
        &self,
        make: impl FnOnce() -> MethodMember,
    ) -> BridgeResult<&MethodMember> {
        Self::lazy_accessor(&self.getter, make, |m| self.adopt(m, true))
    }

    /// Return the setter, building it with `make` on first use.
    pub fn setter_or_attach(
        &self,
        make: impl FnOnce() -> MethodMember,
    ) -> BridgeResult<&MethodMember> {
        Self::lazy_accessor(&self.setter, make, |m| self.adopt(m, false))
    }

    fn lazy_accessor<'a>(
        slot: &'a OnceCell<MethodMember>,
        make: impl FnOnce() -> MethodMember,
        adopt: impl FnOnce(MethodMember) -> MethodMember,
    ) -> BridgeResult<&'a MethodMember> {
        if let Some(existing) = slot.get() {
            return Ok(existing);
        }
        let accessor = make();
        accessor.check_defaults()?;
        Ok(slot.get_or_init(|| adopt(accessor)))
    }

    pub(crate) fn seal(&mut self, id: MemberId, owner: &Weak<TypeDefinition>) {
        self.info.id = id;
        self.info.owner = owner.clone();
        if let Some(g) = self.getter.get_mut() {
            g.seal(id, owner);
        }
        if let Some(s) = self.setter.get_mut() {
            s.seal(id, owner);
        }
    }
}

impl TypeMember for PropertyMember {
    fn info(&self) -> &MemberInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Meter {
        value: std::cell::Cell<f64>,
    }

    fn meter_value(m: &Meter) -> f64 {
        m.value.get()
    }

    fn set_meter_value(m: &Meter, v: f64) {
        m.value.set(v);
    }

    #[test]
    fn host_method_captures_signature() {
        let m = MethodMember::host("scale", |m: &Meter, k: f64| m.value.get() * k);
        assert_eq!(m.kind(), MemberKind::Method);
        let MethodBinding::Host(host) = m.binding() else {
            panic!("expected a host binding");
        };
        assert_eq!(host.params(), &[ParamType::Double]);
        assert!(!host.returns().is_void());
        assert!(!host.is_static());
    }

    #[test]
    fn detached_member_has_no_owner() {
        let m = MethodMember::callback("raw", |_args| Ok(()));
        assert!(m.owner().is_none());
        assert_eq!(m.member_id(), MemberId(0));
    }

    #[test]
    fn host_property_creates_only_existing_accessors() {
        let ro = PropertyMember::from_host_property(
            "value",
            HostProperty::<Meter, f64>::new(Some(meter_value), None),
        );
        assert_eq!(ro.getter().map(|g| g.kind()), Some(MemberKind::PropertyGet));
        assert!(ro.setter().is_none());
    }

    #[test]
    fn blank_property_accepts_each_accessor_once() {
        let prop = PropertyMember::new("value");
        assert!(prop.getter().is_none() && prop.setter().is_none());
        prop.attach_getter(MethodMember::host("get", meter_value)).unwrap();
        let err = prop.attach_getter(MethodMember::host("get", meter_value)).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Validation(ValidationError::AccessorAlreadyBound {
                accessor: "getter",
                ..
            })
        ));
        prop.attach_setter(MethodMember::host("set", set_meter_value)).unwrap();
        assert_eq!(prop.setter().map(|s| s.kind()), Some(MemberKind::PropertySet));
    }

    #[test]
    fn indexer_accessors_are_retagged() {
        let get: CallbackFn = Rc::new(|_: &mut CallArgs<'_>| -> BridgeResult<()> { Ok(()) });
        let prop = PropertyMember::with_callbacks("item", Some(get), None).indexer();
        assert!(prop.is_indexer());
        assert_eq!(prop.getter().map(|g| g.kind()), Some(MemberKind::IndexerGet));
        prop.attach_setter(MethodMember::callback("set", |_| Ok(()))).unwrap();
        assert_eq!(prop.setter().map(|s| s.kind()), Some(MemberKind::IndexerSet));
    }

    #[test]
    fn lazy_population_is_idempotent() {
        let prop = PropertyMember::new("value");
        let mut built = 0;
        prop.getter_or_attach(|| {
            built += 1;
            MethodMember::host("get", meter_value)
        })
        .unwrap();
        let getter = prop
            .getter_or_attach(|| {
                built += 1;
                MethodMember::host("get", meter_value)
            })
            .unwrap();
        assert_eq!(built, 1);
        assert_eq!(getter.kind(), MemberKind::PropertyGet);
    }

    #[test]
    fn accessors_without_parameter_defaults_are_refused() {
        let prop = PropertyMember::new("peer").indexer();
        let keyed_by_object =
            MethodMember::host("get", |_: &Meter, key: Rc<Meter>| key.value.get());
        let err = prop.attach_getter(keyed_by_object).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Validation(ValidationError::ParameterWithoutDefault { index: 0, .. })
        ));
        assert!(prop.getter().is_none());

        let err = prop
            .setter_or_attach(|| MethodMember::host("set", |_: &Meter, _k: i32, _v: Rc<Meter>| {}))
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Validation(ValidationError::ParameterWithoutDefault { index: 1, .. })
        ));
        assert!(prop.setter().is_none());

        prop.attach_getter(MethodMember::host("get", |_: &Meter, key: i32| key * 2))
            .unwrap();
        assert_eq!(prop.getter().map(|g| g.kind()), Some(MemberKind::IndexerGet));
    }

    #[test]
    fn panics_become_host_faults_when_caught() {
        let m = HostMethod::of_static(|| -> i32 { panic!("kaboom") });
        let err = m.invoke(HostValue::Undefined, Vec::new(), true).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::HostFault { message, .. } if message.contains("kaboom")
        ));
    }
}
