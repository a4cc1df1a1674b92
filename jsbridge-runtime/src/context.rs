// JsContext: one engine context plus the host-side state bound to it.
//
// Each context owns its type registrations, the identity-keyed proxy cache
// and the handle table that maps proxies back to host objects. Nothing here
// is process-wide except the per-thread directory used by FFI callbacks.
//
// Borrow discipline: `state` is never borrowed across a call into the engine
// or into host code. Both may re-enter the context.

use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use jsbridge_ffi::{ArgsHandle, MemberAccess, ObjectHandle, TypeHandle};

use crate::call_args::CallArgs;
use crate::config::BridgeConfig;
use crate::converter::Converter;
use crate::directory;
use crate::dispatch;
use crate::engine::ScriptEngine;
use crate::error::{BridgeError, BridgeResult};
use crate::host_value::{HostObject, HostValue};
use crate::js_type::{JsType, registered_types};
use crate::member::{MemberId, TypeMember};
use crate::type_def::TypeDefinition;
use crate::wire;

struct Registration {
    definition: Rc<TypeDefinition>,
    handle: TypeHandle,
}

struct ProxyEntry {
    object: HostObject,
    type_id: u16,
}

#[derive(Default)]
struct ProxyCache {
    by_identity: HashMap<usize, ObjectHandle>,
    by_handle: HashMap<ObjectHandle, ProxyEntry>,
}

impl ProxyCache {
    fn remove(&mut self, handle: ObjectHandle) -> Option<ProxyEntry> {
        let entry = self.by_handle.remove(&handle)?;
        self.by_identity.remove(&entry.object.identity());
        Some(entry)
    }
}

#[derive(Default)]
struct ContextState {
    /// Index is the registration id written into the type record header.
    registrations: Vec<Registration>,
    by_definition: HashMap<usize, u16>,
    definitions: HashMap<TypeId, Rc<TypeDefinition>>,
    proxies: ProxyCache,
}

pub(crate) struct ContextInner {
    id: u64,
    engine: Box<dyn ScriptEngine>,
    config: BridgeConfig,
    closed: Cell<bool>,
    state: RefCell<ContextState>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        directory::remove(self.id);
        let proxies = std::mem::take(&mut self.state.get_mut().proxies);
        if self.closed.get() {
            return;
        }
        let count = proxies.by_handle.len();
        for handle in proxies.by_handle.into_keys() {
            self.engine.release_handle(handle);
        }
        log::debug!("context {} dropped, released {count} proxies", self.id);
    }
}

/// Host side of one engine context. Cheap to clone; `!Send`.
#[derive(Clone)]
pub struct JsContext {
    inner: Rc<ContextInner>,
}

/// Non-owning reference to a context, held by values that outlive a call.
#[derive(Clone)]
pub(crate) struct WeakContext(Weak<ContextInner>);

impl WeakContext {
    pub(crate) fn upgrade(&self) -> Option<JsContext> {
        self.0.upgrade().map(JsContext::from_inner)
    }
}

fn definition_key(def: &Rc<TypeDefinition>) -> usize {
    Rc::as_ptr(def) as usize
}

impl JsContext {
    pub fn new(engine: impl ScriptEngine + 'static, config: BridgeConfig) -> BridgeResult<Self> {
        Self::with_boxed_engine(Box::new(engine), config)
    }

    pub fn with_boxed_engine(
        engine: Box<dyn ScriptEngine>,
        config: BridgeConfig,
    ) -> BridgeResult<Self> {
        let id = directory::next_id();
        let eager = config.registration.eager_inventory;
        let inner = Rc::new(ContextInner {
            id,
            engine,
            config,
            closed: Cell::new(false),
            state: RefCell::new(ContextState::default()),
        });
        directory::insert(id, Rc::downgrade(&inner));
        let ctx = JsContext { inner };
        log::debug!("context {id} created");
        if eager {
            ctx.register_all_from_inventory()?;
        }
        Ok(ctx)
    }

    pub(crate) fn from_inner(inner: Rc<ContextInner>) -> Self {
        JsContext { inner }
    }

    pub(crate) fn downgrade(&self) -> WeakContext {
        WeakContext(Rc::downgrade(&self.inner))
    }

    /// Id handed to the engine and echoed back in callbacks.
    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[inline]
    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    #[inline]
    pub fn engine(&self) -> &dyn ScriptEngine {
        &*self.inner.engine
    }

    pub fn converter(&self) -> Converter<'_> {
        Converter::new(self)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    fn ensure_open(&self) -> BridgeResult<()> {
        if self.is_closed() {
            Err(BridgeError::ContextClosed)
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Type registration
    // -----------------------------------------------------------------------

    /// Register `def` with the engine, once per context. Returns the
    /// registration id and the engine's type handle.
    pub fn register_type_definition(
        &self,
        def: &Rc<TypeDefinition>,
    ) -> BridgeResult<(u16, TypeHandle)> {
        self.ensure_open()?;
        let key = definition_key(def);
        let type_id = {
            let state = self.inner.state.borrow();
            if let Some(&id) = state.by_definition.get(&key) {
                return Ok((id, state.registrations[id as usize].handle));
            }
            u16::try_from(state.registrations.len())
                .map_err(|_| BridgeError::Unsupported("more than 65535 types in one context"))?
        };

        let record = wire::encode_type_definition(def, type_id)?;
        let handle = self.inner.engine.register_type(type_id, &record)?;
        if handle.is_null() {
            return Err(BridgeError::Engine(jsbridge_ffi::BridgeStatus::InternalError));
        }

        let mut state = self.inner.state.borrow_mut();
        state.registrations.push(Registration {
            definition: Rc::clone(def),
            handle,
        });
        state.by_definition.insert(key, type_id);
        log::debug!("registered type `{}` as {type_id} ({} bytes)", def.name(), record.len());
        Ok((type_id, handle))
    }

    /// Registration is per context: the same definition may be registered
    /// in one context and not in another.
    pub fn is_registered(&self, def: &Rc<TypeDefinition>) -> bool {
        self.registration_id(def).is_some()
    }

    /// A member is registered once its owning definition is. Detached
    /// members never are.
    pub fn is_member_registered(&self, member: &dyn TypeMember) -> bool {
        member.owner().is_some_and(|owner| self.is_registered(&owner))
    }

    pub fn registration_id(&self, def: &Rc<TypeDefinition>) -> Option<u16> {
        self.inner.state.borrow().by_definition.get(&definition_key(def)).copied()
    }

    pub fn registered_definition(&self, type_id: u16) -> BridgeResult<Rc<TypeDefinition>> {
        self.inner
            .state
            .borrow()
            .registrations
            .get(type_id as usize)
            .map(|r| Rc::clone(&r.definition))
            .ok_or(BridgeError::TypeNotRegistered(type_id))
    }

    pub fn registered_count(&self) -> usize {
        self.inner.state.borrow().registrations.len()
    }

    /// Register every `#[js_type]` linked into the binary.
    pub fn register_all_from_inventory(&self) -> BridgeResult<usize> {
        let mut count = 0;
        for reg in registered_types() {
            let def = self.cached_definition((reg.type_id)(), reg.type_definition)?;
            self.register_type_definition(&def)?;
            count += 1;
        }
        log::debug!("context {}: registered {count} inventory types", self.id());
        Ok(count)
    }

    fn cached_definition(
        &self,
        type_id: TypeId,
        describe: crate::host_value::DescribeFn,
    ) -> BridgeResult<Rc<TypeDefinition>> {
        if let Some(def) = self.inner.state.borrow().definitions.get(&type_id) {
            return Ok(Rc::clone(def));
        }
        let def = describe()?;
        let mut state = self.inner.state.borrow_mut();
        Ok(Rc::clone(state.definitions.entry(type_id).or_insert(def)))
    }

    /// The definition of `T`, built once per context.
    pub fn type_definition_of<T: JsType>(&self) -> BridgeResult<Rc<TypeDefinition>> {
        self.cached_definition(TypeId::of::<T>(), T::type_definition)
    }

    /// The definition describing `obj`'s runtime type.
    pub fn definition_for(&self, obj: &HostObject) -> BridgeResult<Rc<TypeDefinition>> {
        let describe = obj.describe_fn().ok_or(BridgeError::Unwrappable {
            type_name: obj.type_name(),
        })?;
        self.cached_definition(obj.type_id(), describe)
    }

    /// Like [`definition_for`](Self::definition_for), but undescribed types
    /// get an empty opaque definition.
    pub fn definition_or_opaque(&self, obj: &HostObject) -> BridgeResult<Rc<TypeDefinition>> {
        match obj.describe_fn() {
            Some(describe) => self.cached_definition(obj.type_id(), describe),
            None => {
                if let Some(def) = self.inner.state.borrow().definitions.get(&obj.type_id()) {
                    return Ok(Rc::clone(def));
                }
                let def = TypeDefinition::opaque(obj.type_name())?;
                let mut state = self.inner.state.borrow_mut();
                Ok(Rc::clone(state.definitions.entry(obj.type_id()).or_insert(def)))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Proxies
    // -----------------------------------------------------------------------

    /// The proxy for `obj`, creating it (and registering `def`) on first use.
    /// Wrapping the same object again returns the same handle.
    pub fn wrap(&self, obj: &HostObject, def: &Rc<TypeDefinition>) -> BridgeResult<ObjectHandle> {
        self.ensure_open()?;
        let identity = obj.identity();
        if let Some(&handle) = self.inner.state.borrow().proxies.by_identity.get(&identity) {
            return Ok(handle);
        }
        let (type_id, type_handle) = self.register_type_definition(def)?;
        let handle = self.inner.engine.create_proxy(type_handle, identity as u64)?;

        let mut state = self.inner.state.borrow_mut();
        state.proxies.by_identity.insert(identity, handle);
        state.proxies.by_handle.insert(
            handle,
            ProxyEntry {
                object: obj.clone(),
                type_id,
            },
        );
        log::trace!("wrapped `{}` as proxy {:?}", obj.type_name(), handle);
        Ok(handle)
    }

    pub fn wrap_object<T: JsType>(&self, value: Rc<T>) -> BridgeResult<ObjectHandle> {
        let obj = HostObject::new(value);
        let def = self.definition_for(&obj)?;
        self.wrap(&obj, &def)
    }

    /// The host object behind a proxy handle.
    pub fn lookup_proxy(&self, handle: ObjectHandle) -> Option<HostObject> {
        self.inner
            .state
            .borrow()
            .proxies
            .by_handle
            .get(&handle)
            .map(|e| e.object.clone())
    }

    /// Registration id of the type a proxy was created with.
    pub fn proxy_type(&self, handle: ObjectHandle) -> Option<u16> {
        self.inner.state.borrow().proxies.by_handle.get(&handle).map(|e| e.type_id)
    }

    pub fn proxy_count(&self) -> usize {
        self.inner.state.borrow().proxies.by_handle.len()
    }

    /// The engine collected a proxy: forget it. The host object is dropped
    /// outside the state borrow since its destructor may touch the context.
    pub fn release_proxy(&self, handle: ObjectHandle) -> bool {
        let entry = self.inner.state.borrow_mut().proxies.remove(handle);
        let found = entry.is_some();
        drop(entry);
        log::trace!("proxy {:?} released (known: {found})", handle);
        found
    }

    /// The engine context is gone. Drop every proxy without calling back into
    /// the engine; later operations fail with `ContextClosed`.
    pub fn close(&self) {
        self.inner.closed.set(true);
        let proxies = std::mem::take(&mut self.inner.state.borrow_mut().proxies);
        log::debug!(
            "context {} closed with {} live proxies",
            self.id(),
            proxies.by_handle.len()
        );
        drop(proxies);
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    /// Handle a member invocation raised by the engine. On failure the error
    /// is thrown into the calling script frame and also returned.
    pub fn invoke_member(
        &self,
        type_id: u16,
        member_id: u16,
        access: MemberAccess,
        frame: ArgsHandle,
    ) -> BridgeResult<()> {
        let outcome = self.dispatch_member(type_id, member_id, access, frame);
        if let Err(err) = &outcome {
            log::debug!("member {type_id}:{member_id} ({access:?}) failed: {err}");
            if !self.is_closed() {
                self.inner.engine.throw_error(frame, &err.to_string());
            }
        }
        outcome
    }

    fn dispatch_member(
        &self,
        type_id: u16,
        member_id: u16,
        access: MemberAccess,
        frame: ArgsHandle,
    ) -> BridgeResult<()> {
        self.ensure_open()?;
        let definition = self.registered_definition(type_id)?;
        let member = definition
            .member(MemberId(member_id))
            .ok_or_else(|| BridgeError::MemberNotFound {
                type_name: definition.name().to_owned(),
                member_id,
            })?;
        log::trace!("dispatch {}.{} ({access:?})", definition.name(), member.name());
        let mut args = CallArgs::new(self, frame);
        dispatch::dispatch(member, access, &mut args)
    }

    /// Run a script and convert its completion value.
    pub fn execute(&self, source: &str) -> BridgeResult<HostValue> {
        self.ensure_open()?;
        let value = self.inner.engine.execute(source)?;
        Ok(self.converter().from_value(value))
    }
}

impl fmt::Debug for JsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.try_borrow();
        let mut s = f.debug_struct("JsContext");
        s.field("id", &self.inner.id).field("closed", &self.is_closed());
        if let Ok(state) = state {
            s.field("registrations", &state.registrations.len())
                .field("proxies", &state.proxies.by_handle.len());
        }
        s.finish()
    }
}
