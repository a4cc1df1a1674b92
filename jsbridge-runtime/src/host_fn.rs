// Typed host functions.
//
// A host function is turned into a `HostThunk` once, when its MethodMember is
// built. The thunk converts each argument slot with `FromHost`, calls the
// function, and converts the result with `IntoHost`. Parameter and return
// shapes are captured eagerly as a `HostMethodSignature`, which the dispatcher
// consults (e.g. to bind script callables to delegate parameters).

use std::fmt;
use std::rc::Rc;

use crate::delegate::JsFunction;
use crate::error::{BridgeError, BridgeResult, ValidationError};
use crate::host_value::{HostObject, HostValue};
use crate::js_type::JsType;

/// Type-erased call adapter: `(this, arguments) -> result`.
pub type HostThunk = Rc<dyn Fn(HostValue, Vec<HostValue>) -> BridgeResult<HostValue>>;

/// Declared type of one parameter (or of a non-void return).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Boolean,
    Int32,
    Double,
    Float,
    String,
    /// A host object of the named Rust type.
    Object(&'static str),
    /// An unbound script callable.
    Function,
    /// A script callable adapted to a host delegate taking `arity` arguments.
    Delegate { arity: usize },
    /// Accepts anything.
    Any,
    /// `T` or null/undefined.
    Optional(Box<ParamType>),
}

impl ParamType {
    /// Whether a call that omits this parameter can still be made. Host
    /// objects and script callables have no zero value; `Optional` does.
    pub fn has_default(&self) -> bool {
        !matches!(
            self,
            ParamType::Object(_) | ParamType::Function | ParamType::Delegate { .. }
        )
    }

    /// Arity of the delegate this parameter expects, looking through `Optional`.
    pub fn delegate_arity(&self) -> Option<usize> {
        match self {
            ParamType::Delegate { arity } => Some(*arity),
            ParamType::Optional(inner) => inner.delegate_arity(),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Boolean => write!(f, "bool"),
            ParamType::Int32 => write!(f, "i32"),
            ParamType::Double => write!(f, "f64"),
            ParamType::Float => write!(f, "f32"),
            ParamType::String => write!(f, "string"),
            ParamType::Object(name) => write!(f, "object `{name}`"),
            ParamType::Function => write!(f, "function"),
            ParamType::Delegate { arity } => write!(f, "delegate/{arity}"),
            ParamType::Any => write!(f, "any"),
            ParamType::Optional(inner) => write!(f, "{inner}?"),
        }
    }
}

/// Declared return shape of a host function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Value(ParamType),
}

impl ReturnType {
    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, ReturnType::Void)
    }
}

/// Eagerly captured shape of a host function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostMethodSignature {
    /// Rust type of the receiver, `None` for static functions.
    pub receiver: Option<&'static str>,
    pub params: Vec<ParamType>,
    pub returns: ReturnType,
}

impl HostMethodSignature {
    /// Scripts may pass fewer arguments than declared, so every parameter
    /// needs a value to stand in for a missing argument.
    pub fn check_defaults(&self, member: &str) -> Result<(), ValidationError> {
        match self.params.iter().position(|p| !p.has_default()) {
            Some(index) => Err(ValidationError::ParameterWithoutDefault {
                member: member.to_owned(),
                index,
                expected: self.params[index].to_string(),
            }),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// FromHost / IntoHost
// ---------------------------------------------------------------------------

/// Conversion from a marshalled argument into a typed parameter.
pub trait FromHost: Sized {
    fn param_type() -> ParamType;

    fn from_host(value: HostValue) -> BridgeResult<Self>;

    /// Value used when the script supplied fewer arguments than declared.
    /// `None` means the type has no natural zero value.
    fn absent() -> Option<Self> {
        None
    }
}

/// Conversion from a typed return value into a marshalled result.
pub trait IntoHost {
    fn return_type() -> ReturnType;

    fn into_host(self) -> BridgeResult<HostValue>;
}

fn in_i32_range(d: f64) -> bool {
    d.fract() == 0.0 && d >= i32::MIN as f64 && d <= i32::MAX as f64
}

impl FromHost for bool {
    fn param_type() -> ParamType {
        ParamType::Boolean
    }

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Bool(b) => Ok(b),
            HostValue::Undefined | HostValue::Null => Ok(false),
            other => Err(BridgeError::mismatch("bool", other.describe())),
        }
    }

    fn absent() -> Option<Self> {
        Some(false)
    }
}

impl FromHost for i32 {
    fn param_type() -> ParamType {
        ParamType::Int32
    }

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Int32(v) => Ok(v),
            HostValue::Double(d) if in_i32_range(d) => Ok(d as i32),
            HostValue::Float(f) if in_i32_range(f as f64) => Ok(f as i32),
            HostValue::Undefined | HostValue::Null => Ok(0),
            other => Err(BridgeError::mismatch("i32", other.describe())),
        }
    }

    fn absent() -> Option<Self> {
        Some(0)
    }
}

impl FromHost for f64 {
    fn param_type() -> ParamType {
        ParamType::Double
    }

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Double(d) => Ok(d),
            HostValue::Int32(v) => Ok(v as f64),
            HostValue::Float(f) => Ok(f as f64),
            HostValue::Undefined | HostValue::Null => Ok(0.0),
            other => Err(BridgeError::mismatch("f64", other.describe())),
        }
    }

    fn absent() -> Option<Self> {
        Some(0.0)
    }
}

impl FromHost for f32 {
    fn param_type() -> ParamType {
        ParamType::Float
    }

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Float(f) => Ok(f),
            HostValue::Double(d) => Ok(d as f32),
            HostValue::Int32(v) => Ok(v as f32),
            HostValue::Undefined | HostValue::Null => Ok(0.0),
            other => Err(BridgeError::mismatch("f32", other.describe())),
        }
    }

    fn absent() -> Option<Self> {
        Some(0.0)
    }
}

impl FromHost for String {
    fn param_type() -> ParamType {
        ParamType::String
    }

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::String(s) => Ok(s),
            HostValue::Undefined | HostValue::Null => Ok(String::new()),
            other => Err(BridgeError::mismatch("string", other.describe())),
        }
    }

    fn absent() -> Option<Self> {
        Some(String::new())
    }
}

impl FromHost for () {
    fn param_type() -> ParamType {
        ParamType::Any
    }

    fn from_host(_value: HostValue) -> BridgeResult<Self> {
        Ok(())
    }

    fn absent() -> Option<Self> {
        Some(())
    }
}

impl FromHost for HostValue {
    fn param_type() -> ParamType {
        ParamType::Any
    }

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        Ok(value)
    }

    fn absent() -> Option<Self> {
        Some(HostValue::Undefined)
    }
}

impl<T: FromHost> FromHost for Option<T> {
    fn param_type() -> ParamType {
        ParamType::Optional(Box::new(T::param_type()))
    }

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        if value.is_nullish() {
            Ok(None)
        } else {
            T::from_host(value).map(Some)
        }
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

impl<T: 'static> FromHost for Rc<T> {
    fn param_type() -> ParamType {
        ParamType::Object(std::any::type_name::<T>())
    }

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        let expected = std::any::type_name::<T>();
        match value {
            HostValue::Object(obj) => obj
                .downcast::<T>()
                .ok_or_else(|| BridgeError::mismatch(expected, obj.type_name())),
            other => Err(BridgeError::mismatch(expected, other.describe())),
        }
    }
}

impl FromHost for HostObject {
    fn param_type() -> ParamType {
        ParamType::Object("object")
    }

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Object(obj) => Ok(obj),
            other => Err(BridgeError::mismatch("object", other.describe())),
        }
    }
}

impl FromHost for JsFunction {
    fn param_type() -> ParamType {
        ParamType::Function
    }

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Function(f) => Ok(f),
            HostValue::Delegate(d) => Ok(d.function().clone()),
            other => Err(BridgeError::mismatch("function", other.describe())),
        }
    }
}

impl IntoHost for () {
    fn return_type() -> ReturnType {
        ReturnType::Void
    }

    fn into_host(self) -> BridgeResult<HostValue> {
        Ok(HostValue::Undefined)
    }
}

macro_rules! impl_into_host_primitive {
    ($($ty:ty => $param:expr, $variant:ident;)*) => {
        $(
            impl IntoHost for $ty {
                fn return_type() -> ReturnType {
                    ReturnType::Value($param)
                }

                fn into_host(self) -> BridgeResult<HostValue> {
                    Ok(HostValue::$variant(self))
                }
            }
        )*
    };
}

impl_into_host_primitive! {
    bool => ParamType::Boolean, Bool;
    i32 => ParamType::Int32, Int32;
    f64 => ParamType::Double, Double;
    f32 => ParamType::Float, Float;
    String => ParamType::String, String;
}

impl IntoHost for &'static str {
    fn return_type() -> ReturnType {
        ReturnType::Value(ParamType::String)
    }

    fn into_host(self) -> BridgeResult<HostValue> {
        Ok(HostValue::String(self.to_owned()))
    }
}

impl IntoHost for HostValue {
    fn return_type() -> ReturnType {
        ReturnType::Value(ParamType::Any)
    }

    fn into_host(self) -> BridgeResult<HostValue> {
        Ok(self)
    }
}

impl IntoHost for HostObject {
    fn return_type() -> ReturnType {
        ReturnType::Value(ParamType::Object("object"))
    }

    fn into_host(self) -> BridgeResult<HostValue> {
        Ok(HostValue::Object(self))
    }
}

impl IntoHost for JsFunction {
    fn return_type() -> ReturnType {
        ReturnType::Value(ParamType::Function)
    }

    fn into_host(self) -> BridgeResult<HostValue> {
        Ok(HostValue::Function(self))
    }
}

impl<T: JsType> IntoHost for Rc<T> {
    fn return_type() -> ReturnType {
        ReturnType::Value(ParamType::Object(std::any::type_name::<T>()))
    }

    fn into_host(self) -> BridgeResult<HostValue> {
        Ok(HostValue::Object(HostObject::new(self)))
    }
}

impl<T: IntoHost> IntoHost for Option<T> {
    fn return_type() -> ReturnType {
        match T::return_type() {
            ReturnType::Void => ReturnType::Void,
            ReturnType::Value(p) => ReturnType::Value(ParamType::Optional(Box::new(p))),
        }
    }

    fn into_host(self) -> BridgeResult<HostValue> {
        match self {
            Some(v) => v.into_host(),
            None => Ok(HostValue::Null),
        }
    }
}

/// `Err` becomes a host fault; the dispatcher fills in the member name.
impl<T: IntoHost, E: fmt::Display> IntoHost for Result<T, E> {
    fn return_type() -> ReturnType {
        T::return_type()
    }

    fn into_host(self) -> BridgeResult<HostValue> {
        match self {
            Ok(v) => v.into_host(),
            Err(e) => Err(BridgeError::HostFault {
                member: String::new(),
                message: e.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Thunk generation
// ---------------------------------------------------------------------------

/// A Rust function callable as a script method: `Fn(&T, A0, A1, ...) -> R`.
pub trait HostMethodFn<Marker>: 'static {
    fn signature() -> HostMethodSignature;

    fn into_thunk(self) -> HostThunk;
}

/// A Rust function callable without a receiver: `Fn(A0, A1, ...) -> R`.
pub trait HostStaticFn<Marker>: 'static {
    fn signature() -> HostMethodSignature;

    fn into_thunk(self) -> HostThunk;
}

fn take_arg<T: FromHost>(
    slots: &mut std::vec::IntoIter<HostValue>,
    index: usize,
) -> BridgeResult<T> {
    match slots.next() {
        Some(value) => T::from_host(value),
        None => T::absent().ok_or_else(|| BridgeError::MissingArgument {
            index,
            expected: T::param_type().to_string(),
        }),
    }
}

fn receiver<T: 'static>(this: HostValue) -> BridgeResult<Rc<T>> {
    let expected = std::any::type_name::<T>();
    match this {
        HostValue::Object(obj) => obj
            .downcast::<T>()
            .ok_or_else(|| BridgeError::mismatch(expected, obj.type_name())),
        other => Err(BridgeError::mismatch(expected, other.describe())),
    }
}

macro_rules! impl_host_fn {
    ($($arg:ident $var:ident $idx:literal),*) => {
        impl<F, T, R, $($arg,)*> HostMethodFn<fn(&T, $($arg,)*) -> R> for F
        where
            F: Fn(&T, $($arg),*) -> R + 'static,
            T: 'static,
            R: IntoHost + 'static,
            $($arg: FromHost + 'static,)*
        {
            fn signature() -> HostMethodSignature {
                HostMethodSignature {
                    receiver: Some(std::any::type_name::<T>()),
                    params: vec![$($arg::param_type()),*],
                    returns: R::return_type(),
                }
            }

            fn into_thunk(self) -> HostThunk {
                Rc::new(move |this: HostValue, args: Vec<HostValue>| {
                    let this = receiver::<T>(this)?;
                    #[allow(unused_mut, unused_variables)]
                    let mut slots = args.into_iter();
                    $(let $var: $arg = take_arg(&mut slots, $idx)?;)*
                    (self)(&this, $($var),*).into_host()
                })
            }
        }

        impl<F, R, $($arg,)*> HostStaticFn<fn($($arg,)*) -> R> for F
        where
            F: Fn($($arg),*) -> R + 'static,
            R: IntoHost + 'static,
            $($arg: FromHost + 'static,)*
        {
            fn signature() -> HostMethodSignature {
                HostMethodSignature {
                    receiver: None,
                    params: vec![$($arg::param_type()),*],
                    returns: R::return_type(),
                }
            }

            fn into_thunk(self) -> HostThunk {
                Rc::new(move |_this: HostValue, args: Vec<HostValue>| {
                    #[allow(unused_mut, unused_variables)]
                    let mut slots = args.into_iter();
                    $(let $var: $arg = take_arg(&mut slots, $idx)?;)*
                    (self)($($var),*).into_host()
                })
            }
        }
    };
}

impl_host_fn!();
impl_host_fn!(A0 a0 0);
impl_host_fn!(A0 a0 0, A1 a1 1);
impl_host_fn!(A0 a0 0, A1 a1 1, A2 a2 2);
impl_host_fn!(A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3);
impl_host_fn!(A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4);
impl_host_fn!(A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5);
impl_host_fn!(A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5, A6 a6 6);
impl_host_fn!(A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5, A6 a6 6, A7 a7 7);
