// Raw tagged value exchanged with the engine.
//
// A zero-initialized JsValue is `undefined`: the engine may hand us freshly
// zeroed slots, and reading one before it is written must not be an error.

use crate::handles::ObjectHandle;

/// Discriminant of a [`JsValue`]. Only the arm named by the tag is valid.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JsValueTag {
    Undefined = 0,
    Null = 1,
    Boolean = 2,
    Int32 = 3,
    Double = 4,
    Float = 5,
    String = 6,
    Handle = 7,
}

impl JsValueTag {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(JsValueTag::Undefined),
            1 => Some(JsValueTag::Null),
            2 => Some(JsValueTag::Boolean),
            3 => Some(JsValueTag::Int32),
            4 => Some(JsValueTag::Double),
            5 => Some(JsValueTag::Float),
            6 => Some(JsValueTag::String),
            7 => Some(JsValueTag::Handle),
            _ => None,
        }
    }
}

/// Payload storage. Strings are UTF-16 code units owned by whoever produced
/// the value; `JsValue::len` carries the unit count.
#[repr(C)]
#[derive(Clone, Copy)]
pub union JsPayload {
    pub boolean: i32,
    pub int32: i32,
    pub float: f32,
    pub double: f64,
    pub string: *const u16,
    pub handle: u64,
}

/// Fixed-size tagged value (16 bytes). No heap allocation for primitives.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct JsValue {
    pub tag: u32,
    pub len: i32,
    pub payload: JsPayload,
}

impl Default for JsValue {
    fn default() -> Self {
        JsValue::undefined()
    }
}

impl JsValue {
    #[inline]
    pub const fn undefined() -> Self {
        JsValue {
            tag: JsValueTag::Undefined as u32,
            len: 0,
            payload: JsPayload { handle: 0 },
        }
    }

    #[inline]
    pub const fn null() -> Self {
        JsValue {
            tag: JsValueTag::Null as u32,
            len: 0,
            payload: JsPayload { handle: 0 },
        }
    }

    #[inline]
    pub const fn boolean(b: bool) -> Self {
        JsValue {
            tag: JsValueTag::Boolean as u32,
            len: 0,
            payload: JsPayload { boolean: b as i32 },
        }
    }

    #[inline]
    pub const fn int32(v: i32) -> Self {
        JsValue {
            tag: JsValueTag::Int32 as u32,
            len: 0,
            payload: JsPayload { int32: v },
        }
    }

    #[inline]
    pub const fn double(v: f64) -> Self {
        JsValue {
            tag: JsValueTag::Double as u32,
            len: 0,
            payload: JsPayload { double: v },
        }
    }

    #[inline]
    pub const fn float(v: f32) -> Self {
        JsValue {
            tag: JsValueTag::Float as u32,
            len: 0,
            payload: JsPayload { float: v },
        }
    }

    #[inline]
    pub const fn handle(h: ObjectHandle) -> Self {
        JsValue {
            tag: JsValueTag::Handle as u32,
            len: 0,
            payload: JsPayload { handle: h.0 },
        }
    }

    /// Build a string value pointing at `len` UTF-16 units.
    ///
    /// The pointed-to buffer must stay alive for as long as the engine may
    /// read this value (for results: until the `result_set_*` call returns).
    #[inline]
    pub const fn string(units: *const u16, len: i32) -> Self {
        JsValue {
            tag: JsValueTag::String as u32,
            len,
            payload: JsPayload { string: units },
        }
    }

    /// Decoded tag, or `None` for a tag this side does not know.
    #[inline]
    pub fn kind(&self) -> Option<JsValueTag> {
        JsValueTag::from_raw(self.tag)
    }
}

impl std::fmt::Debug for JsValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // SAFETY: each arm is read only when the tag names it.
        unsafe {
            match self.kind() {
                Some(JsValueTag::Undefined) => write!(f, "JsValue(undefined)"),
                Some(JsValueTag::Null) => write!(f, "JsValue(null)"),
                Some(JsValueTag::Boolean) => write!(f, "JsValue({})", self.payload.boolean != 0),
                Some(JsValueTag::Int32) => write!(f, "JsValue({}i32)", self.payload.int32),
                Some(JsValueTag::Double) => write!(f, "JsValue({}f64)", self.payload.double),
                Some(JsValueTag::Float) => write!(f, "JsValue({}f32)", self.payload.float),
                Some(JsValueTag::String) => write!(f, "JsValue(string, {} units)", self.len),
                Some(JsValueTag::Handle) => write!(f, "JsValue(handle {:#x})", self.payload.handle),
                None => write!(f, "JsValue(unknown tag {})", self.tag),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_value_is_undefined() {
        let raw: JsValue = unsafe { std::mem::zeroed() };
        assert_eq!(raw.kind(), Some(JsValueTag::Undefined));
        assert_eq!(JsValue::default().kind(), Some(JsValueTag::Undefined));
    }

    #[test]
    fn unknown_tag_is_reported() {
        let mut raw = JsValue::int32(3);
        raw.tag = 99;
        assert_eq!(raw.kind(), None);
        assert_eq!(format!("{raw:?}"), "JsValue(unknown tag 99)");
    }

    #[test]
    fn handle_round_trips_through_payload() {
        let raw = JsValue::handle(ObjectHandle(0xdead));
        assert_eq!(raw.kind(), Some(JsValueTag::Handle));
        assert_eq!(unsafe { raw.payload.handle }, 0xdead);
    }
}
