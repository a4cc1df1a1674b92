use crate::handles::{ArgsHandle, ObjectHandle};
use crate::status::BridgeStatus;

/// Callback table filled by Rust and returned to the engine from `attach`.
/// The engine calls into Rust through these function pointers. `context_id`
/// is the id handed out when the context was attached.
#[repr(C)]
pub struct JsBridgeCallbacks {
    /// Engine → Rust member invocation. `access` is a `MemberAccess` code.
    pub invoke_member: extern "C" fn(
        context_id: u64,
        type_id: u16,
        member_id: u16,
        access: u32,
        args: ArgsHandle,
    ) -> BridgeStatus,

    /// The engine collected a proxy created through `create_proxy`.
    pub release_proxy: extern "C" fn(context_id: u64, proxy: ObjectHandle),

    /// The engine context is going away; Rust should drop all its state.
    pub on_context_destroyed: extern "C" fn(context_id: u64),
}
