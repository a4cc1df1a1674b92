// Call dispatcher: runs the member an engine call event names.

use jsbridge_ffi::MemberAccess;

use crate::call_args::CallArgs;
use crate::error::{BridgeError, BridgeResult};
use crate::host_value::HostValue;
use crate::member::{HostMethod, MethodBinding, MethodMember, TypeMember};
use crate::type_def::MemberRef;

pub(crate) fn dispatch(
    member: MemberRef<'_>,
    access: MemberAccess,
    args: &mut CallArgs<'_>,
) -> BridgeResult<()> {
    match (member, access) {
        (MemberRef::Method(method), MemberAccess::Call) => invoke_method(method, args),
        (MemberRef::Property(prop), MemberAccess::Get) => read(prop.name(), prop.getter(), args),
        (MemberRef::Property(prop), MemberAccess::Set) => write(prop.name(), prop.setter(), args),
        (MemberRef::Field(field), MemberAccess::Get) => read(field.name(), field.getter(), args),
        (MemberRef::Field(field), MemberAccess::Set) => write(field.name(), field.setter(), args),
        (member, access) => Err(BridgeError::InvalidAccess {
            member: member.name().to_owned(),
            access: match access {
                MemberAccess::Call => "call",
                MemberAccess::Get => "get",
                MemberAccess::Set => "set",
            },
        }),
    }
}

fn read(name: &str, getter: Option<&MethodMember>, args: &mut CallArgs<'_>) -> BridgeResult<()> {
    match getter {
        Some(getter) => invoke_method(getter, args),
        None => {
            log::trace!("`{name}` has no getter, reading undefined");
            args.set_result_undefined()
        }
    }
}

fn write(name: &str, setter: Option<&MethodMember>, args: &mut CallArgs<'_>) -> BridgeResult<()> {
    match setter {
        Some(setter) => invoke_method(setter, args),
        None => Err(BridgeError::AccessorMissing {
            name: name.to_owned(),
            accessor: "setter",
        }),
    }
}

/// Run `method` against the current call frame.
///
/// Callback bindings get the frame as is. Host bindings get "this" and the
/// supplied arguments converted up to the declared parameter count; missing
/// trailing arguments take the parameter's absent value and extras are
/// dropped.
pub fn invoke_method(method: &MethodMember, args: &mut CallArgs<'_>) -> BridgeResult<()> {
    match method.binding() {
        MethodBinding::Callback(callback) => {
            let callback = callback.clone();
            callback(args).map_err(|e| e.in_member(method.name()))
        }
        MethodBinding::Host(host) => invoke_host(method.name(), host, args),
    }
}

fn invoke_host(name: &str, host: &HostMethod, args: &mut CallArgs<'_>) -> BridgeResult<()> {
    let ctx = args.context();
    let conv = ctx.converter();
    let declared = host.params();
    let supplied = args.len();
    if supplied != declared.len() && ctx.config().dispatch.log_arity_mismatch {
        log::warn!("`{name}` declares {} parameters, called with {supplied}", declared.len());
    }

    let this = if host.is_static() {
        HostValue::Undefined
    } else {
        conv.from_value(args.this())
    };
    let values = declared
        .iter()
        .take(supplied)
        .enumerate()
        .map(|(index, param)| conv.marshal_param(args.arg(index), param))
        .collect::<BridgeResult<Vec<_>>>()?;

    let result = host
        .invoke(this, values, ctx.config().dispatch.catch_panics)
        .map_err(|e| {
            let e = e.in_member(name);
            if let BridgeError::HostFault { .. } = &e {
                log::error!("{e}");
            }
            e
        })?;

    if host.returns().is_void() {
        args.set_result_undefined()
    } else {
        args.set_result_obj(result)
    }
}
