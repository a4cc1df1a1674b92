// jsbridge-macros: proc macros for #[js_type].

mod js_type;
mod naming;

/// Attribute macro for an impl block that exposes a host type to script.
///
/// Methods marked `#[js(...)]` become members of the type's definition;
/// unmarked methods stay plain Rust. The macro implements
/// `jsbridge::runtime::JsType` for the type and submits a registration to
/// inventory so a context can register it up front.
///
/// # Example
/// ```ignore
/// #[js_type(name = "Counter")]
/// impl Counter {
///     #[js(method)]
///     fn add(&self, n: i32) -> i32 { self.total.replace_with(|t| *t + n) + n }
///
///     #[js(method, name = "create")]
///     fn new_shared() -> Rc<Counter> { Rc::new(Counter::default()) }
///
///     #[js(getter = "total")]
///     fn total(&self) -> i32 { self.total.get() }
///
///     #[js(setter = "total")]
///     fn set_total(&self, v: i32) { self.total.set(v) }
/// }
/// ```
#[proc_macro_attribute]
pub fn js_type(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    match js_type::expand_js_type(attr.into(), item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
