// Value: the safe form of the engine's tagged value.
//
// Each variant mirrors exactly one JsValue arm; there is no coercion between
// arms here. Coercions (e.g. a Double argument feeding an i32 parameter) are
// the converter's business.

use jsbridge_ffi::{JsValue, JsValueTag, ObjectHandle};

/// Discriminant of a [`Value`], used in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Undefined,
    Null,
    Boolean,
    Int32,
    Double,
    Float,
    String,
    Handle,
}

/// A value crossing the engine boundary.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Int32(i32),
    Double(f64),
    Float(f32),
    String(String),
    /// Engine-resident object: script object, script function or proxy.
    Handle(ObjectHandle),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Int32(_) => ValueKind::Int32,
            Value::Double(_) => ValueKind::Double,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Handle(_) => ValueKind::Handle,
        }
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    #[inline]
    pub fn as_handle(&self) -> Option<ObjectHandle> {
        match self {
            Value::Handle(h) => Some(*h),
            _ => None,
        }
    }

    /// Copy a raw engine value into an owned `Value`.
    ///
    /// Unknown tags read as undefined.
    ///
    /// # Safety
    /// For string values, `raw.payload.string` must point to `raw.len`
    /// readable UTF-16 units (or be null with a zero length).
    pub unsafe fn from_raw(raw: &JsValue) -> Value {
        // SAFETY: each union arm is read only when the tag names it; the
        // caller guarantees the string pointer contract.
        unsafe {
            match raw.kind() {
                Some(JsValueTag::Undefined) | None => Value::Undefined,
                Some(JsValueTag::Null) => Value::Null,
                Some(JsValueTag::Boolean) => Value::Boolean(raw.payload.boolean != 0),
                Some(JsValueTag::Int32) => Value::Int32(raw.payload.int32),
                Some(JsValueTag::Double) => Value::Double(raw.payload.double),
                Some(JsValueTag::Float) => Value::Float(raw.payload.float),
                Some(JsValueTag::String) => {
                    let ptr = raw.payload.string;
                    if ptr.is_null() || raw.len <= 0 {
                        Value::String(String::new())
                    } else {
                        let units = std::slice::from_raw_parts(ptr, raw.len as usize);
                        Value::String(String::from_utf16_lossy(units))
                    }
                }
                Some(JsValueTag::Handle) => Value::Handle(ObjectHandle(raw.payload.handle)),
            }
        }
    }

    /// Run `f` with a raw view of this value. String units live in a
    /// temporary buffer that is valid only for the duration of `f`.
    pub fn with_raw<R>(&self, f: impl FnOnce(&JsValue) -> R) -> R {
        let mut strings = Vec::new();
        let raw = self.lower(&mut strings);
        f(&raw)
    }

    /// Raw view of this value. String units are pushed onto `strings`, which
    /// must outlive every use of the returned value.
    pub(crate) fn lower(&self, strings: &mut Vec<Vec<u16>>) -> JsValue {
        match self {
            Value::Undefined => JsValue::undefined(),
            Value::Null => JsValue::null(),
            Value::Boolean(b) => JsValue::boolean(*b),
            Value::Int32(v) => JsValue::int32(*v),
            Value::Double(v) => JsValue::double(*v),
            Value::Float(v) => JsValue::float(*v),
            Value::Handle(h) => JsValue::handle(*h),
            Value::String(s) => {
                let units: Vec<u16> = s.encode_utf16().collect();
                let raw = JsValue::string(units.as_ptr(), units.len() as i32);
                strings.push(units);
                raw
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectHandle> for Value {
    fn from(h: ObjectHandle) -> Self {
        Value::Handle(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_raw_reads_as_undefined() {
        let raw: JsValue = unsafe { std::mem::zeroed() };
        assert_eq!(unsafe { Value::from_raw(&raw) }, Value::Undefined);
    }

    #[test]
    fn string_survives_raw_view() {
        let v = Value::from("héllo ✓");
        let back = v.with_raw(|raw| unsafe { Value::from_raw(raw) });
        assert_eq!(back, v);
    }

    #[test]
    fn primitives_survive_raw_view() {
        for v in [
            Value::Null,
            Value::Boolean(true),
            Value::Int32(-7),
            Value::Double(2.5),
            Value::Float(1.25),
            Value::Handle(ObjectHandle(42)),
        ] {
            let back = v.with_raw(|raw| unsafe { Value::from_raw(raw) });
            assert_eq!(back, v);
        }
    }

    #[test]
    fn null_string_pointer_reads_as_empty() {
        let raw = JsValue::string(std::ptr::null(), 3);
        assert_eq!(unsafe { Value::from_raw(&raw) }, Value::String(String::new()));
    }
}
