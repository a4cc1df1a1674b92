// jsbridge-ffi: #[repr(C)] types, handle types, API table definition.
// Zero external dependencies. This crate defines the complete Rust ↔ engine contract.

pub mod handles;
pub mod status;
pub mod value;
pub mod api_table;
pub mod callbacks;
pub mod contract_tests;

pub use handles::*;
pub use status::*;
pub use value::*;
pub use api_table::*;
pub use callbacks::*;
