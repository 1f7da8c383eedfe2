//! Filter pipeline, handler invocation and action results.

pub use ravel_invoker::*;
