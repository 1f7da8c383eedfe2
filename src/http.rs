//! Request, response and per-request context types.

pub use ravel_http::*;
