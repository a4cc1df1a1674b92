// HeadlessEngine: an in-process ScriptEngine.
//
// Script functions are Rust closures, proxies are table entries and type
// records are decoded with the wire codec the way a native engine would parse
// them. Tests and tooling drive it through `call_method`, `get`, `set` and
// `invoke`, which raise the same member calls a real engine would.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::rc::Rc;

use jsbridge_ffi::{ArgsHandle, BridgeStatus, MemberAccess, ObjectHandle, TypeHandle};

use crate::context::JsContext;
use crate::engine::ScriptEngine;
use crate::error::{BridgeError, BridgeResult};
use crate::member::MemberKind;
use crate::value::Value;
use crate::wire::{TypeRecord, decode_type_record};

/// A script function implemented in Rust: `(this, args) -> result`.
pub type ScriptFn = Rc<dyn Fn(&Value, &[Value]) -> BridgeResult<Value>>;

type ScriptHandler = Rc<dyn Fn(&str) -> BridgeResult<Value>>;

enum ObjectKind {
    Plain,
    Function(ScriptFn),
    Proxy { ty: TypeHandle, key: u64 },
}

struct EngineObject {
    kind: ObjectKind,
    refs: usize,
}

#[derive(Default)]
struct Frame {
    this: Value,
    args: Vec<Value>,
    result: Option<Value>,
    error: Option<String>,
}

#[derive(Default)]
struct HeadlessState {
    next_handle: u64,
    next_frame: usize,
    types: Vec<(u16, TypeRecord)>,
    register_calls: usize,
    objects: HashMap<ObjectHandle, EngineObject>,
    frames: HashMap<usize, Frame>,
    last_thrown: Option<String>,
    script_handler: Option<ScriptHandler>,
}

impl HeadlessState {
    fn alloc(&mut self, kind: ObjectKind) -> ObjectHandle {
        self.next_handle += 1;
        let handle = ObjectHandle(self.next_handle);
        self.objects.insert(handle, EngineObject { kind, refs: 1 });
        handle
    }
}

/// Shared handle to one headless engine; clones see the same state.
#[derive(Clone, Default)]
pub struct HeadlessEngine {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // --- script-side setup ---

    /// Create a script function backed by `f`. The script holds one reference.
    pub fn define_function(
        &self,
        f: impl Fn(&Value, &[Value]) -> BridgeResult<Value> + 'static,
    ) -> ObjectHandle {
        self.state.borrow_mut().alloc(ObjectKind::Function(Rc::new(f)))
    }

    /// Create a plain, non-callable script object.
    pub fn define_object(&self) -> ObjectHandle {
        self.state.borrow_mut().alloc(ObjectKind::Plain)
    }

    /// Route `execute` to `handler`.
    pub fn set_script_handler(&self, handler: impl Fn(&str) -> BridgeResult<Value> + 'static) {
        self.state.borrow_mut().script_handler = Some(Rc::new(handler));
    }

    // --- inspection ---

    pub fn register_calls(&self) -> usize {
        self.state.borrow().register_calls
    }

    /// Decoded records, in registration order.
    pub fn registered_types(&self) -> Vec<TypeRecord> {
        self.state.borrow().types.iter().map(|(_, r)| r.clone()).collect()
    }

    /// Live references to `handle`; zero once it has been freed.
    pub fn ref_count(&self, handle: ObjectHandle) -> usize {
        self.state.borrow().objects.get(&handle).map_or(0, |o| o.refs)
    }

    pub fn live_proxies(&self) -> usize {
        self.state
            .borrow()
            .objects
            .values()
            .filter(|o| matches!(o.kind, ObjectKind::Proxy { .. }))
            .count()
    }

    /// Key the proxy was created with.
    pub fn proxy_key(&self, handle: ObjectHandle) -> Option<u64> {
        match self.state.borrow().objects.get(&handle)?.kind {
            ObjectKind::Proxy { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Message of the most recent `throw_error`.
    pub fn last_thrown(&self) -> Option<String> {
        self.state.borrow().last_thrown.clone()
    }

    // --- driving member calls ---

    pub fn begin_call(&self, this: Value, args: Vec<Value>) -> ArgsHandle {
        let mut state = self.state.borrow_mut();
        state.next_frame += 1;
        let id = state.next_frame;
        state.frames.insert(
            id,
            Frame {
                this,
                args,
                ..Frame::default()
            },
        );
        ArgsHandle(id as *mut c_void)
    }

    /// Close a frame, returning its result and any thrown message.
    pub fn end_call(&self, frame: ArgsHandle) -> (Option<Value>, Option<String>) {
        match self.state.borrow_mut().frames.remove(&frame.addr()) {
            Some(f) => (f.result, f.error),
            None => (None, None),
        }
    }

    /// Raise a member call the way the engine's callback would.
    pub fn invoke(
        &self,
        ctx: &JsContext,
        type_id: u16,
        member_id: u16,
        access: MemberAccess,
        this: Value,
        args: Vec<Value>,
    ) -> BridgeResult<Value> {
        let frame = self.begin_call(this, args);
        let outcome = ctx.invoke_member(type_id, member_id, access, frame);
        let (result, _) = self.end_call(frame);
        outcome.map(|()| result.unwrap_or_default())
    }

    fn resolve(&self, target: &Value, name: &str) -> BridgeResult<(u16, MemberKind, u16)> {
        let handle = target
            .as_handle()
            .ok_or(BridgeError::Engine(BridgeStatus::InvalidArgument))?;
        let state = self.state.borrow();
        let ty = match state.objects.get(&handle).map(|o| &o.kind) {
            Some(ObjectKind::Proxy { ty, .. }) => *ty,
            _ => return Err(BridgeError::Engine(BridgeStatus::InvalidArgument)),
        };
        let (type_id, record) = state
            .types
            .get((ty.0 as usize).wrapping_sub(1))
            .ok_or(BridgeError::Engine(BridgeStatus::TypeNotRegistered))?;
        let (kind, member_id) = record
            .find(name)
            .ok_or(BridgeError::Engine(BridgeStatus::MemberNotFound))?;
        Ok((*type_id, kind, member_id))
    }

    /// `target.name(...args)`
    pub fn call_method(
        &self,
        ctx: &JsContext,
        target: &Value,
        name: &str,
        args: Vec<Value>,
    ) -> BridgeResult<Value> {
        let (type_id, _, member_id) = self.resolve(target, name)?;
        self.invoke(ctx, type_id, member_id, MemberAccess::Call, target.clone(), args)
    }

    /// `target.name`
    pub fn get(&self, ctx: &JsContext, target: &Value, name: &str) -> BridgeResult<Value> {
        let (type_id, _, member_id) = self.resolve(target, name)?;
        self.invoke(ctx, type_id, member_id, MemberAccess::Get, target.clone(), Vec::new())
    }

    /// `target.name = value`
    pub fn set(
        &self,
        ctx: &JsContext,
        target: &Value,
        name: &str,
        value: Value,
    ) -> BridgeResult<()> {
        let (type_id, _, member_id) = self.resolve(target, name)?;
        self.invoke(ctx, type_id, member_id, MemberAccess::Set, target.clone(), vec![value])
            .map(|_| ())
    }

    /// Simulate the collector finalizing a proxy: free it and notify the
    /// context like the `release_proxy` callback does.
    pub fn collect_proxy(&self, ctx: &JsContext, handle: ObjectHandle) -> bool {
        let removed = self.state.borrow_mut().objects.remove(&handle).is_some();
        removed && ctx.release_proxy(handle)
    }

    fn with_frame<R>(&self, frame: ArgsHandle, f: impl FnOnce(&mut Frame) -> R) -> Option<R> {
        self.state.borrow_mut().frames.get_mut(&frame.addr()).map(f)
    }
}

impl ScriptEngine for HeadlessEngine {
    fn arg_count(&self, args: ArgsHandle) -> usize {
        self.with_frame(args, |f| f.args.len()).unwrap_or(0)
    }

    fn this_value(&self, args: ArgsHandle) -> Value {
        self.with_frame(args, |f| f.this.clone()).unwrap_or_default()
    }

    fn arg(&self, args: ArgsHandle, index: usize) -> Value {
        self.with_frame(args, |f| f.args.get(index).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn set_result(&self, args: ArgsHandle, value: &Value) {
        self.with_frame(args, |f| f.result = Some(value.clone()));
    }

    fn throw_error(&self, args: ArgsHandle, message: &str) {
        self.with_frame(args, |f| f.error = Some(message.to_owned()));
        self.state.borrow_mut().last_thrown = Some(message.to_owned());
    }

    fn register_type(&self, type_id: u16, record: &[u8]) -> BridgeResult<TypeHandle> {
        let record = decode_type_record(record)?;
        let mut state = self.state.borrow_mut();
        state.register_calls += 1;
        state.types.push((type_id, record));
        Ok(TypeHandle(state.types.len() as u64))
    }

    fn create_proxy(&self, ty: TypeHandle, key: u64) -> BridgeResult<ObjectHandle> {
        let mut state = self.state.borrow_mut();
        if ty.is_null() || ty.0 as usize > state.types.len() {
            return Err(BridgeError::Engine(BridgeStatus::InvalidArgument));
        }
        Ok(state.alloc(ObjectKind::Proxy { ty, key }))
    }

    fn retain_handle(&self, handle: ObjectHandle) {
        if let Some(obj) = self.state.borrow_mut().objects.get_mut(&handle) {
            obj.refs += 1;
        }
    }

    fn release_handle(&self, handle: ObjectHandle) {
        let mut state = self.state.borrow_mut();
        let freed = match state.objects.get_mut(&handle) {
            Some(obj) => {
                obj.refs = obj.refs.saturating_sub(1);
                obj.refs == 0
            }
            None => false,
        };
        if freed {
            state.objects.remove(&handle);
        }
    }

    fn is_callable(&self, handle: ObjectHandle) -> bool {
        matches!(
            self.state.borrow().objects.get(&handle).map(|o| &o.kind),
            Some(ObjectKind::Function(_))
        )
    }

    fn call_function(
        &self,
        function: ObjectHandle,
        this: &Value,
        args: &[Value],
    ) -> BridgeResult<Value> {
        let f = match self.state.borrow().objects.get(&function).map(|o| &o.kind) {
            Some(ObjectKind::Function(f)) => Rc::clone(f),
            _ => return Err(BridgeError::Engine(BridgeStatus::NotCallable)),
        };
        f(this, args)
    }

    fn execute(&self, source: &str) -> BridgeResult<Value> {
        let handler = self.state.borrow().script_handler.clone();
        match handler {
            Some(h) => h(source),
            None => Err(BridgeError::Unsupported("headless engine has no script handler")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::host_value::{HostObject, HostValue};
    use crate::member::{FieldMember, MethodMember};
    use crate::type_def::TypeDefinition;

    struct Thing;

    fn thing_def() -> Rc<TypeDefinition> {
        TypeDefinition::builder("Thing")
            .field(FieldMember::new("a"))
            .method(MethodMember::callback("b", |args| args.set_result_bool(true)))
            .build()
            .unwrap()
    }

    #[test]
    fn registered_records_are_decoded() {
        let engine = HeadlessEngine::new();
        let ctx = JsContext::new(engine.clone(), BridgeConfig::default()).unwrap();
        ctx.register_type_definition(&thing_def()).unwrap();
        let types = engine.registered_types();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].name, "Thing");
        assert_eq!(types[0].find("b"), Some((MemberKind::Method, 1)));
    }

    #[test]
    fn member_registration_follows_the_owning_context() {
        let engine = HeadlessEngine::new();
        let first = JsContext::new(engine.clone(), BridgeConfig::default()).unwrap();
        let second = JsContext::new(engine.clone(), BridgeConfig::default()).unwrap();
        let def = thing_def();
        let method = def.method("b").unwrap();
        assert!(!first.is_member_registered(method));

        first.register_type_definition(&def).unwrap();
        assert!(first.is_registered(&def));
        assert!(first.is_member_registered(method));
        assert!(first.is_member_registered(def.field("a").unwrap()));
        assert!(!second.is_member_registered(method));

        let detached = MethodMember::callback("b", |_| Ok(()));
        assert!(!first.is_member_registered(&detached));
    }

    #[test]
    fn collected_proxies_are_forgotten_by_the_context() {
        let engine = HeadlessEngine::new();
        let ctx = JsContext::new(engine.clone(), BridgeConfig::default()).unwrap();
        let obj = HostObject::opaque(Rc::new(Thing));
        let handle = ctx.wrap(&obj, &thing_def()).unwrap();
        assert_eq!(engine.proxy_key(handle), Some(obj.identity() as u64));
        assert!(engine.collect_proxy(&ctx, handle));
        assert_eq!(ctx.proxy_count(), 0);
        assert!(ctx.lookup_proxy(handle).is_none());
    }

    #[test]
    fn dropping_the_context_releases_its_proxies() {
        let engine = HeadlessEngine::new();
        let ctx = JsContext::new(engine.clone(), BridgeConfig::default()).unwrap();
        let def = thing_def();
        for _ in 0..3 {
            ctx.wrap(&HostObject::opaque(Rc::new(Thing)), &def).unwrap();
        }
        assert_eq!(engine.live_proxies(), 3);
        drop(ctx);
        assert_eq!(engine.live_proxies(), 0);
    }

    #[test]
    fn closed_contexts_refuse_calls_and_keep_engine_state() {
        let engine = HeadlessEngine::new();
        let ctx = JsContext::new(engine.clone(), BridgeConfig::default()).unwrap();
        let proxy = ctx.wrap(&HostObject::opaque(Rc::new(Thing)), &thing_def()).unwrap();
        ctx.close();
        assert_eq!(ctx.proxy_count(), 0);
        let err = engine
            .invoke(&ctx, 0, 1, MemberAccess::Call, Value::Handle(proxy), vec![])
            .unwrap_err();
        assert!(matches!(err, BridgeError::ContextClosed));
        drop(ctx);
        assert_eq!(engine.live_proxies(), 1);
    }

    #[test]
    fn execute_goes_through_the_script_handler() {
        let engine = HeadlessEngine::new();
        let ctx = JsContext::new(engine.clone(), BridgeConfig::default()).unwrap();
        assert!(matches!(ctx.execute("1"), Err(BridgeError::Unsupported(_))));
        engine.set_script_handler(|src| Ok(Value::Int32(src.len() as i32)));
        assert!(matches!(ctx.execute("abc"), Ok(HostValue::Int32(3))));
    }
}
