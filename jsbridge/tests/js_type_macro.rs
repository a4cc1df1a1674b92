// Integration tests for #[js_type]: generated definitions, inventory
// registration and calls driven through the headless engine.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use jsbridge::prelude::*;
use jsbridge::runtime::{registered_types, MethodBinding};

#[derive(Default)]
struct Counter {
    total: Cell<i32>,
    label: RefCell<String>,
}

#[js_type(name = "Counter")]
impl Counter {
    #[js(method)]
    fn add(&self, n: i32) -> i32 {
        self.total.set(self.total.get() + n);
        self.total.get()
    }

    #[js(method, name = "create")]
    fn new_shared() -> Rc<Counter> {
        Rc::new(Counter::default())
    }

    #[js(method)]
    fn add_mapped(&self, f: Option<Delegate<(i32,), i32>>, n: i32) -> BridgeResult<i32> {
        let mapped = match f {
            Some(f) => f.call((n,))?,
            None => n,
        };
        Ok(self.add(mapped))
    }

    #[js(getter = "total")]
    fn total(&self) -> i32 {
        self.total.get()
    }

    #[js(setter = "total")]
    fn set_total(&self, value: i32) {
        self.total.set(value);
    }

    #[js(getter, field)]
    fn label(&self) -> String {
        self.label.borrow().clone()
    }

    #[js(setter, field)]
    fn set_label(&self, value: String) {
        *self.label.borrow_mut() = value;
    }

    fn doubled(&self) -> i32 {
        self.total.get() * 2
    }
}

fn context() -> (HeadlessEngine, JsContext, Value) {
    let engine = HeadlessEngine::new();
    let ctx = JsContext::new(engine.clone(), BridgeConfig::default()).unwrap();
    let handle = ctx.wrap_object(Rc::new(Counter::default())).unwrap();
    (engine, ctx, Value::Handle(handle))
}

#[test]
fn generated_definition_lists_marked_members() {
    let def = Counter::type_definition().unwrap();
    assert_eq!(def.name(), "Counter");
    let members: Vec<_> = def
        .members()
        .map(|m| (m.kind(), m.name().to_owned(), m.member_id()))
        .collect();
    assert_eq!(
        members,
        vec![
            (MemberKind::Field, "label".to_owned(), MemberId(0)),
            (MemberKind::Method, "add".to_owned(), MemberId(1)),
            (MemberKind::Method, "create".to_owned(), MemberId(2)),
            (MemberKind::Method, "addMapped".to_owned(), MemberId(3)),
            (MemberKind::Property, "total".to_owned(), MemberId(4)),
        ]
    );
    let binding = |name: &str| def.method(name).unwrap().binding();
    assert!(matches!(binding("create"), MethodBinding::Host(h) if h.is_static()));
    assert!(matches!(binding("add"), MethodBinding::Host(h) if !h.is_static()));
    assert_eq!(Counter::default().doubled(), 0);
}

#[test]
fn types_are_submitted_to_inventory() {
    let reg = registered_types().find(|r| r.name == "Counter").unwrap();
    assert_eq!((reg.type_id)(), std::any::TypeId::of::<Counter>());
    assert_eq!((reg.type_definition)().unwrap().member_count(), 5);
}

#[test]
fn methods_and_accessors_dispatch_through_the_engine() {
    let (engine, ctx, proxy) = context();
    let out = engine.call_method(&ctx, &proxy, "add", vec![Value::Int32(3)]).unwrap();
    assert_eq!(out, Value::Int32(3));
    assert_eq!(engine.get(&ctx, &proxy, "total").unwrap(), Value::Int32(3));

    engine.set(&ctx, &proxy, "total", Value::Int32(10)).unwrap();
    assert_eq!(engine.call_method(&ctx, &proxy, "add", vec![]).unwrap(), Value::Int32(10));

    engine.set(&ctx, &proxy, "label", Value::from("clicks")).unwrap();
    assert_eq!(engine.get(&ctx, &proxy, "label").unwrap(), Value::from("clicks"));
}

#[test]
fn static_factories_return_new_proxies() {
    let (engine, ctx, proxy) = context();
    let created = engine.call_method(&ctx, &proxy, "create", vec![]).unwrap();
    assert!(matches!(created, Value::Handle(h) if Value::Handle(h) != proxy));
    assert_eq!(ctx.proxy_count(), 2);
    let out = engine.call_method(&ctx, &created, "add", vec![Value::Int32(2)]).unwrap();
    assert_eq!(out, Value::Int32(2));
}

#[test]
fn delegate_parameters_call_back_into_script() {
    let (engine, ctx, proxy) = context();
    let plus_one = engine.define_function(|_, args| match args.first() {
        Some(Value::Int32(x)) => Ok(Value::Int32(x + 1)),
        _ => Ok(Value::Undefined),
    });
    let out = engine
        .call_method(&ctx, &proxy, "addMapped", vec![Value::Handle(plus_one), Value::Int32(5)])
        .unwrap();
    assert_eq!(out, Value::Int32(6));

    let out = engine
        .call_method(&ctx, &proxy, "addMapped", vec![Value::Null, Value::Int32(5)])
        .unwrap();
    assert_eq!(out, Value::Int32(11));
}

#[test]
fn eager_inventory_registers_annotated_types() {
    let engine = HeadlessEngine::new();
    let config = BridgeConfig::from_toml_str("[registration]\neager_inventory = true\n").unwrap();
    let ctx = JsContext::new(engine.clone(), config).unwrap();
    assert!(ctx.registered_count() >= 1);
    assert!(engine.registered_types().iter().any(|r| r.name == "Counter"));
}
