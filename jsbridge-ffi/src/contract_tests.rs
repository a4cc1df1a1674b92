// Compile-time contract tests: ensure layouts match the engine's expectations.
// These const assertions fail at compile time if sizes drift.

use std::mem::size_of;

use crate::handles::*;
use crate::status::{BridgeStatus, MemberAccess};
use crate::value::{JsPayload, JsValue, JsValueTag};

const _: () = assert!(size_of::<ObjectHandle>() == 8);
const _: () = assert!(size_of::<TypeHandle>() == 8);
const _: () = assert!(size_of::<ArgsHandle>() == size_of::<usize>());
const _: () = assert!(size_of::<EngineContextHandle>() == size_of::<usize>());
const _: () = assert!(size_of::<BridgeStatus>() == 4);
const _: () = assert!(size_of::<MemberAccess>() == 4);
const _: () = assert!(size_of::<JsValueTag>() == 4);
const _: () = assert!(size_of::<JsPayload>() == 8);
const _: () = assert!(size_of::<JsValue>() == 16);
