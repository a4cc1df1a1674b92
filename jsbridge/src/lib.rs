// jsbridge: user-facing library crate. Embedders call `attach` with the
// engine's API table and hand the returned callback table back to the engine.

// Re-exports for proc macro path resolution and user access.
pub use jsbridge_ffi as ffi;
pub use jsbridge_runtime as runtime;
pub use jsbridge_macros::js_type;

// For proc macro generated inventory::submit! invocations.
#[doc(hidden)]
pub extern crate inventory as __inventory;

pub mod prelude;

use runtime::{BridgeConfig, BridgeResult, FfiEngine, JsContext};

/// Level handed to the engine logger installed by `attach`.
const ENGINE_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;

// ---------------------------------------------------------------------------
// Callbacks (engine → Rust)
// ---------------------------------------------------------------------------

extern "C" fn real_invoke_member(
    context_id: u64,
    type_id: u16,
    member_id: u16,
    access: u32,
    args: ffi::ArgsHandle,
) -> ffi::BridgeStatus {
    runtime::ffi_boundary(ffi::BridgeStatus::InternalError, move || {
        let Some(access) = ffi::MemberAccess::from_raw(access) else {
            log::error!("invoke_member: unknown access code {access}");
            return ffi::BridgeStatus::InvalidArgument;
        };
        let Some(ctx) = runtime::directory::lookup(context_id) else {
            log::warn!("invoke_member: no live context {context_id}");
            return ffi::BridgeStatus::InvalidArgument;
        };
        match ctx.invoke_member(type_id, member_id, access, args) {
            Ok(()) => ffi::BridgeStatus::Ok,
            Err(err) => err.status(),
        }
    })
}

extern "C" fn real_release_proxy(context_id: u64, proxy: ffi::ObjectHandle) {
    runtime::ffi_boundary((), move || {
        if let Some(ctx) = runtime::directory::lookup(context_id) {
            ctx.release_proxy(proxy);
        }
    });
}

extern "C" fn real_on_context_destroyed(context_id: u64) {
    runtime::ffi_boundary((), move || {
        if let Some(ctx) = runtime::directory::lookup(context_id) {
            ctx.close();
        }
    });
}

#[doc(hidden)]
pub static __CALLBACKS: ffi::JsBridgeCallbacks = ffi::JsBridgeCallbacks {
    invoke_member: real_invoke_member,
    release_proxy: real_release_proxy,
    on_context_destroyed: real_on_context_destroyed,
};

// ---------------------------------------------------------------------------
// Attach
// ---------------------------------------------------------------------------

/// Attach a bridge context to an engine context.
///
/// Validates the API table, installs an engine-backed logger when the table
/// has a logging sub-table and no logger is set yet, and creates the context.
/// The engine passes `ctx.id()` back as `context_id` in every callback.
///
/// # Safety
/// `api_table` must point to a valid API table whose sub-tables outlive the
/// process, and `native` must be the engine context those functions expect.
pub unsafe fn attach(
    api_table: *const ffi::JsBridgeApiTable,
    native: ffi::EngineContextHandle,
    config: BridgeConfig,
) -> BridgeResult<(JsContext, &'static ffi::JsBridgeCallbacks)> {
    // SAFETY: forwarded caller contract; null and version are checked inside.
    let engine = unsafe { FfiEngine::from_table(api_table, native)? };

    // SAFETY: `from_table` succeeded, so the table pointer is valid.
    let logging = unsafe { (*api_table).logging };
    if !logging.is_null() {
        // SAFETY: the logging sub-table shares the table's lifetime.
        if let Err(err) = unsafe { runtime::install_engine_logger(logging, ENGINE_LOG_LEVEL) } {
            log::debug!("engine logger not installed: {err}");
        }
    }

    let ctx = JsContext::new(engine, config)?;
    log::info!("jsbridge attached (context {})", ctx.id());
    Ok((ctx, &__CALLBACKS))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use runtime::{HeadlessEngine, HostObject, MethodMember, TypeDefinition, Value};

    struct Lamp {
        on: Cell<bool>,
    }

    fn lamp_context() -> (HeadlessEngine, JsContext, Rc<Lamp>, ffi::ObjectHandle, u16) {
        let engine = HeadlessEngine::new();
        let ctx = JsContext::new(engine.clone(), BridgeConfig::default()).unwrap();
        let def = TypeDefinition::builder("Lamp")
            .method(MethodMember::host("toggle", |lamp: &Lamp| {
                lamp.on.set(!lamp.on.get());
                lamp.on.get()
            }))
            .method(MethodMember::host("fail", |_: &Lamp| -> Result<(), String> {
                Err("burnt out".into())
            }))
            .build()
            .unwrap();
        let lamp = Rc::new(Lamp { on: Cell::new(false) });
        let handle = ctx.wrap(&HostObject::opaque(Rc::clone(&lamp)), &def).unwrap();
        let (type_id, _) = ctx.register_type_definition(&def).unwrap();
        (engine, ctx, lamp, handle, type_id)
    }

    #[test]
    fn invoke_member_routes_to_the_context() {
        let (engine, ctx, lamp, handle, type_id) = lamp_context();
        let frame = engine.begin_call(Value::Handle(handle), vec![]);
        let call = ffi::MemberAccess::Call as u32;
        let status = (__CALLBACKS.invoke_member)(ctx.id(), type_id, 0, call, frame);
        let (result, thrown) = engine.end_call(frame);
        assert_eq!(status, ffi::BridgeStatus::Ok);
        assert_eq!(result, Some(Value::Boolean(true)));
        assert!(thrown.is_none());
        assert!(lamp.on.get());
    }

    #[test]
    fn invoke_member_reports_failures_as_status_codes() {
        let (engine, ctx, _lamp, handle, type_id) = lamp_context();

        let frame = engine.begin_call(Value::Handle(handle), vec![]);
        let call = ffi::MemberAccess::Call as u32;
        let status = (__CALLBACKS.invoke_member)(ctx.id(), type_id, 1, call, frame);
        let (_, thrown) = engine.end_call(frame);
        assert_eq!(status, ffi::BridgeStatus::HostFault);
        assert!(thrown.is_some_and(|m| m.contains("burnt out")));

        let frame = engine.begin_call(Value::Handle(handle), vec![]);
        assert_eq!(
            (__CALLBACKS.invoke_member)(ctx.id(), type_id, 0, 7, frame),
            ffi::BridgeStatus::InvalidArgument
        );
        assert_eq!(
            (__CALLBACKS.invoke_member)(u64::MAX, type_id, 0, 0, frame),
            ffi::BridgeStatus::InvalidArgument
        );
        engine.end_call(frame);
    }

    #[test]
    fn release_and_destroy_callbacks_reach_the_context() {
        let (_engine, ctx, lamp, handle, _) = lamp_context();
        assert_eq!(Rc::strong_count(&lamp), 2);
        (__CALLBACKS.release_proxy)(ctx.id(), handle);
        assert_eq!(ctx.proxy_count(), 0);
        assert_eq!(Rc::strong_count(&lamp), 1);

        (__CALLBACKS.on_context_destroyed)(ctx.id());
        assert!(ctx.is_closed());
    }

    #[test]
    fn attach_rejects_a_null_table() {
        let native = ffi::EngineContextHandle(std::ptr::null_mut());
        let result = unsafe { attach(std::ptr::null(), native, BridgeConfig::default()) };
        assert!(result.is_err());
    }
}
