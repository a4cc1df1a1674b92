use std::ffi::c_void;

/// Opaque handle to an engine-resident object (script object, script function,
/// or a proxy created for a host object). Rust never dereferences it.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct ObjectHandle(pub u64);

/// Handle to a native type template produced by registering a type record.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct TypeHandle(pub u64);

/// Pointer to the engine's argument buffer for one native call frame.
/// Only valid until the call returns.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ArgsHandle(pub *mut c_void);

/// Pointer to the engine's execution context.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EngineContextHandle(pub *mut c_void);

impl ObjectHandle {
    #[inline]
    pub const fn null() -> Self {
        ObjectHandle(0)
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl TypeHandle {
    #[inline]
    pub const fn null() -> Self {
        TypeHandle(0)
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl ArgsHandle {
    #[inline]
    pub const fn null() -> Self {
        ArgsHandle(std::ptr::null_mut())
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// Numeric identity of the frame, used for logging and by in-process engines.
    #[inline]
    pub fn addr(self) -> usize {
        self.0 as usize
    }
}

impl EngineContextHandle {
    #[inline]
    pub const fn null() -> Self {
        EngineContextHandle(std::ptr::null_mut())
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

// Frame and context pointers are raw identifiers owned by the engine.
// They may be moved between threads but are only *used* on the script thread.
unsafe impl Send for ArgsHandle {}
unsafe impl Sync for ArgsHandle {}
unsafe impl Send for EngineContextHandle {}
unsafe impl Sync for EngineContextHandle {}
