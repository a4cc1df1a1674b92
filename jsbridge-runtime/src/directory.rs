// Per-thread directory of live contexts, keyed by context id.
//
// The engine only hands a context id to `extern "C"` callbacks. Contexts are
// `!Send`, so a thread-local map is enough to route a callback to its context.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::{ContextInner, JsContext};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CONTEXTS: RefCell<HashMap<u64, Weak<ContextInner>>> = RefCell::new(HashMap::new());
}

pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

pub(crate) fn insert(id: u64, context: Weak<ContextInner>) {
    CONTEXTS.with(|map| {
        map.borrow_mut().insert(id, context);
    });
}

pub(crate) fn remove(id: u64) {
    // Ignore access errors during thread teardown.
    let _ = CONTEXTS.try_with(|map| {
        map.borrow_mut().remove(&id);
    });
}

/// The live context with `id` on this thread, if any.
pub fn lookup(id: u64) -> Option<JsContext> {
    CONTEXTS
        .with(|map| map.borrow().get(&id).and_then(Weak::upgrade))
        .map(JsContext::from_inner)
}

/// Number of live contexts on this thread.
pub fn live_contexts() -> usize {
    CONTEXTS.with(|map| map.borrow().values().filter(|w| w.strong_count() > 0).count())
}
