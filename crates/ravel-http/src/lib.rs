//! # Ravel HTTP
//!
//! Request, response and per-request context types.
//!
//! ## Example
//!
//! ```
//! use ravel_http::{HttpContext, Request};
//! use http::{Method, StatusCode, Uri};
//!
//! let context = HttpContext::new(Request::new(Method::GET, Uri::from_static("/products")));
//! context.response_mut().status = StatusCode::NOT_FOUND;
//! assert_eq!(context.response().status, StatusCode::NOT_FOUND);
//! ```

pub mod context;
pub mod extensions;
pub mod request;
pub mod response;

pub use context::HttpContext;
pub use extensions::Extensions;
pub use request::Request;
pub use response::Response;
