//! Transport layer (HTTP/JSON).
//!
//! Read-only surface: validation and rule-set inspection. Owner mutations go
//! through the library API.

pub mod http;
