//! Contract ABI primitives: type grammar, selectors, calldata codec.
//!
//! The decoder is the only component that touches untrusted bytes. It follows
//! the standard head/tail layout (static head slots, offsets into a dynamic
//! tail) and reports every malformed payload as a `DecodeError`.

pub mod decode;
pub mod encode;
pub mod types;
pub mod value;

pub use decode::{decode_call, decode_params};
pub use encode::{encode_call, encode_params};
pub use types::{MethodSignature, ParamType, Selector, MAX_TYPE_DEPTH, SELECTOR_LEN};
pub use value::Value;
