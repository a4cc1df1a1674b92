// FFI boundary guard: catches panics in callbacks before they unwind into
// the engine, which is undefined behavior.

/// Run `f`, returning `default` if it panics.
///
/// Every `extern "C"` function handed to the engine wraps its body in this
/// guard. The panic message goes to the `log` facade, which reaches the
/// engine log once an `EngineLogger` is installed.
pub fn ffi_boundary<F, R>(default: R, f: F) -> R
where
    F: FnOnce() -> R + std::panic::UnwindSafe,
{
    match std::panic::catch_unwind(f) {
        Ok(value) => value,
        Err(payload) => {
            log::error!("panic at the engine boundary: {}", panic_message(&payload));
            default
        }
    }
}

/// Extract a human-readable message from a panic payload.
pub(crate) fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic (unknown payload)".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ffi_boundary_returns_value_on_success() {
        assert_eq!(ffi_boundary(0i32, || 42), 42);
    }

    #[test]
    fn ffi_boundary_returns_default_on_panic() {
        let result = ffi_boundary(-1i32, || {
            panic!("test panic");
        });
        assert_eq!(result, -1);
    }

    #[test]
    fn panic_message_reads_formatted_payloads() {
        let payload =
            std::panic::catch_unwind(|| -> () { panic!("{} {}", "formatted", 7) }).unwrap_err();
        assert_eq!(panic_message(&payload), "formatted 7");
    }
}
