//! Filter capabilities.
//!
//! A filter is any type implementing [`Filter`]. It opts into pipeline stages
//! by overriding the matching `as_*` accessor, once for each capability it
//! implements:
//!
//! ```
//! use async_trait::async_trait;
//! use ravel_core::exception::Result;
//! use ravel_invoker::filters::{AsyncResourceFilter, Filter, ResourceNext};
//!
//! struct Timing;
//!
//! #[async_trait]
//! impl AsyncResourceFilter for Timing {
//! 	async fn on_resource_execution(&self, mut next: ResourceNext<'_>) -> Result<()> {
//! 		let started = std::time::Instant::now();
//! 		let executed = next.run().await?;
//! 		let _ = (executed.canceled, started.elapsed());
//! 		Ok(())
//! 	}
//! }
//!
//! impl Filter for Timing {
//! 	fn as_async_resource(&self) -> Option<&dyn AsyncResourceFilter> {
//! 		Some(self)
//! 	}
//! }
//! ```
//!
//! When a filter offers both the synchronous and the asynchronous form of a
//! capability, only the asynchronous form is used.

pub mod context;
pub(crate) mod cursor;
pub mod factory;

pub use crate::pipeline::next::{ActionNext, ResourceNext, ResultNext};
pub use context::{
	ActionExecutedContext, ActionExecutingContext, AuthorizationFilterContext, ExceptionContext,
	ResourceExecutedContext, ResourceExecutingContext, ResultExecutedContext,
	ResultExecutingContext,
};
pub use factory::{
	FilterDescriptor, FilterFactory, FilterFactoryResult, FilterItem, FilterScope, FilterSource,
};

use async_trait::async_trait;
use ravel_core::exception::Result;
use std::any::type_name;
use std::fmt;

/// Base trait of every filter.
pub trait Filter: Send + Sync {
	/// Position among the filters of a request, ascending
	fn order(&self) -> i32 {
		0
	}

	/// Result filters that also run when an earlier stage short-circuited
	fn always_run(&self) -> bool {
		false
	}

	fn filter_name(&self) -> &str {
		type_name::<Self>()
	}

	fn as_authorization(&self) -> Option<&dyn AuthorizationFilter> {
		None
	}

	fn as_async_authorization(&self) -> Option<&dyn AsyncAuthorizationFilter> {
		None
	}

	fn as_resource(&self) -> Option<&dyn ResourceFilter> {
		None
	}

	fn as_async_resource(&self) -> Option<&dyn AsyncResourceFilter> {
		None
	}

	fn as_action(&self) -> Option<&dyn ActionFilter> {
		None
	}

	fn as_async_action(&self) -> Option<&dyn AsyncActionFilter> {
		None
	}

	fn as_exception(&self) -> Option<&dyn ExceptionFilter> {
		None
	}

	fn as_async_exception(&self) -> Option<&dyn AsyncExceptionFilter> {
		None
	}

	fn as_result(&self) -> Option<&dyn ResultFilter> {
		None
	}

	fn as_async_result(&self) -> Option<&dyn AsyncResultFilter> {
		None
	}
}

impl fmt::Debug for dyn Filter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Filter")
			.field("name", &self.filter_name())
			.field("order", &self.order())
			.finish()
	}
}

/// Runs first. Setting `context.result` short-circuits the request.
pub trait AuthorizationFilter: Send + Sync {
	fn on_authorization(&self, context: &mut AuthorizationFilterContext) -> Result<()>;
}

#[async_trait]
pub trait AsyncAuthorizationFilter: Send + Sync {
	async fn on_authorization(&self, context: &mut AuthorizationFilterContext) -> Result<()>;
}

/// Surrounds everything after authorization.
pub trait ResourceFilter: Send + Sync {
	/// Setting `context.result` short-circuits the rest of the pipeline.
	fn on_resource_executing(&self, context: &mut ResourceExecutingContext) -> Result<()>;

	fn on_resource_executed(&self, _context: &mut ResourceExecutedContext) -> Result<()> {
		Ok(())
	}
}

/// Asynchronous resource filter.
///
/// Call [`ResourceNext::run`] at most once to run the rest of the pipeline,
/// or set a result on [`ResourceNext::context_mut`] and return without calling
/// it. Doing both is a protocol violation that fails the request.
#[async_trait]
pub trait AsyncResourceFilter: Send + Sync {
	async fn on_resource_execution(&self, next: ResourceNext<'_>) -> Result<()>;
}

/// Surrounds the handler call.
pub trait ActionFilter: Send + Sync {
	fn on_action_executing(&self, context: &mut ActionExecutingContext) -> Result<()>;

	fn on_action_executed(&self, _context: &mut ActionExecutedContext) -> Result<()> {
		Ok(())
	}
}

#[async_trait]
pub trait AsyncActionFilter: Send + Sync {
	async fn on_action_execution(&self, next: ActionNext<'_>) -> Result<()>;
}

/// Observes errors raised by action filters and the handler.
///
/// Called only while an unhandled error is pending. Clearing
/// `context.exception`, setting `context.exception_handled` or assigning
/// `context.result` handles it.
pub trait ExceptionFilter: Send + Sync {
	fn on_exception(&self, context: &mut ExceptionContext) -> Result<()>;
}

#[async_trait]
pub trait AsyncExceptionFilter: Send + Sync {
	async fn on_exception(&self, context: &mut ExceptionContext) -> Result<()>;
}

/// Surrounds result execution.
pub trait ResultFilter: Send + Sync {
	/// Setting `context.cancel` skips result execution.
	fn on_result_executing(&self, context: &mut ResultExecutingContext) -> Result<()>;

	fn on_result_executed(&self, _context: &mut ResultExecutedContext) -> Result<()> {
		Ok(())
	}
}

#[async_trait]
pub trait AsyncResultFilter: Send + Sync {
	async fn on_result_execution(&self, next: ResultNext<'_>) -> Result<()>;
}
