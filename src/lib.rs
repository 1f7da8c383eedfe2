//! # Ravel
//!
//! The action-dispatch core of a Rust web framework: it picks the controller
//! action matching a request's route values and runs it through a layered
//! filter pipeline.
//!
//! A request flows through three pieces:
//!
//! 1. [`actions::ActionSelector`] narrows the current descriptor collection down
//!    to candidates by route values, then applies action constraints in order
//!    groups to pick a single best action.
//! 2. [`invoker::ActionInvokerFactory`] builds a
//!    [`invoker::ControllerActionInvoker`] from cached per-descriptor state.
//! 3. The invoker runs authorization, resource, exception, action and result
//!    filters around the controller handler.
//!
//! [`invoker::MvcRouteHandler`] wires these together for a router.
//!
//! ## Feature Flags
//!
//! - `actions` - Action descriptors, change tokens and action selection
//! - `invoker` - Filter pipeline, handler invocation and results (pulls in `actions`)
//! - `full` (default) - All features enabled
//!
//! ## Quick Example
//!
//! ```
//! use ravel::prelude::*;
//! use std::sync::Arc;
//!
//! let handler = HandlerMethod::new(
//! 	MethodSignature::new("Index", ReturnType::action_result()),
//! 	|_, _| Ok(MethodReturn::result(Arc::new(ContentResult::new("hello")))),
//! );
//! #[derive(Default)]
//! struct Home;
//!
//! let action = ControllerAction::new(handler, Arc::new(DefaultControllerFactory::<Home>::new()));
//! let descriptor = ActionDescriptor::builder("Home.Index")
//! 	.route_value("controller", "Home")
//! 	.route_value("action", "Index")
//! 	.metadata(action)
//! 	.build();
//!
//! let provider = DefaultActionDescriptorCollectionProvider::new(
//! 	vec![Arc::new(StaticActionDescriptorProvider::new(0, vec![Arc::new(descriptor)]))],
//! 	vec![],
//! );
//! let route_handler = MvcRouteHandler::new(provider, Arc::new(MvcOptions::default()));
//! # let _ = route_handler;
//! ```

#[cfg(feature = "actions")]
pub mod actions;
pub mod core;
pub mod http;
#[cfg(feature = "invoker")]
pub mod invoker;

// Re-export core types
pub use ravel_core::exception::{Error, Result};
pub use ravel_core::settings::MvcSettings;

// Re-export HTTP types
pub use ravel_http::{Extensions, HttpContext, Request, Response};

// Re-export action selection
#[cfg(feature = "actions")]
pub use ravel_actions::{
	ActionContext, ActionDescriptor, ActionSelector, RouteContext, RouteData,
	RouteValueDictionary,
};

// Re-export invocation
#[cfg(feature = "invoker")]
pub use ravel_invoker::{
	ActionInvokerFactory, ControllerActionInvoker, MvcOptions, MvcRouteHandler,
};

/// Commonly used types
pub mod prelude {
	pub use crate::{Error, HttpContext, MvcSettings, Request, Response, Result};

	#[cfg(feature = "actions")]
	pub use ravel_actions::prelude::*;

	#[cfg(feature = "invoker")]
	pub use ravel_invoker::prelude::*;
}
