//! # Ravel Invoker
//!
//! Runs a selected controller action: the filter pipeline, the handler call
//! and the action result.
//!
//! A request that [`route_handler::MvcRouteHandler`] matched to an action is
//! handed to a [`pipeline::ControllerActionInvoker`] built by
//! [`factory::ActionInvokerFactory`]. Everything about the action that does not
//! change between requests (filters, controller factory, argument binder and
//! the return-shape strategy chosen by [`executor::ActionMethodExecutor`]) is
//! kept in [`cache::ControllerActionInvokerCache`] until the descriptor
//! collection changes.
//!
//! ## Pipeline
//!
//! | Stage         | Sync trait                        | Async trait                             |
//! |---------------|-----------------------------------|-----------------------------------------|
//! | Authorization | [`filters::AuthorizationFilter`]  | [`filters::AsyncAuthorizationFilter`]   |
//! | Resource      | [`filters::ResourceFilter`]       | [`filters::AsyncResourceFilter`]        |
//! | Exception     | [`filters::ExceptionFilter`]      | [`filters::AsyncExceptionFilter`]       |
//! | Action        | [`filters::ActionFilter`]         | [`filters::AsyncActionFilter`]          |
//! | Result        | [`filters::ResultFilter`]         | [`filters::AsyncResultFilter`]          |

pub mod cache;
pub mod controller;
pub mod executor;
pub mod factory;
pub mod filters;
pub mod method;
pub mod options;
pub mod pipeline;
pub mod result;
pub mod route_handler;

pub use cache::{ControllerActionInvokerCache, ControllerActionInvokerCacheEntry};
pub use controller::{
	ActionArguments, ControllerAction, ControllerArgumentBinder, ControllerFactory,
	ControllerInstance, DefaultControllerFactory, FnControllerFactory, RouteValueArgumentBinder,
};
pub use executor::ActionMethodExecutor;
pub use factory::ActionInvokerFactory;
pub use method::{
	HandlerInvocationContext, HandlerInvocationFilter, HandlerInvocationNext, HandlerMethod,
	MethodReturn, MethodSignature, ObjectMethodExecutor, ParameterInfo, ReturnKind, ReturnType,
};
pub use options::MvcOptions;
pub use pipeline::ControllerActionInvoker;
pub use result::{
	ActionResult, ActionResultRef, ActionResultTypeMapper, ContentResult,
	DefaultActionResultTypeMapper, EmptyResult, ObjectResult, StatusCodeResult,
};
pub use route_handler::MvcRouteHandler;

/// Commonly used types
pub mod prelude {
	pub use crate::filters::{
		ActionFilter, AsyncActionFilter, AsyncAuthorizationFilter, AsyncExceptionFilter,
		AsyncResourceFilter, AsyncResultFilter, AuthorizationFilter, ExceptionFilter, Filter,
		FilterDescriptor, FilterScope, ResourceFilter, ResultFilter,
	};
	pub use crate::{
		ActionResult, ActionResultRef, ContentResult, ControllerAction, ControllerFactory,
		ControllerInstance, DefaultControllerFactory, EmptyResult, HandlerMethod, MethodReturn,
		MethodSignature, MvcOptions, MvcRouteHandler, ObjectResult, ParameterInfo, ReturnType,
		StatusCodeResult,
	};
}
