//! Per-stage filter contexts.
//!
//! Every context carries the action context and the request's filter list.
//! "Executing" contexts are handed to filters before the inner pipeline runs,
//! "executed" contexts after it. An executed context holding an unhandled
//! error is rethrown when its stage unwinds.

use super::Filter;
use crate::controller::{ActionArguments, ControllerInstance};
use crate::result::ActionResultRef;
use ravel_actions::ActionContext;
use ravel_core::exception::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// The filter list of a request.
pub type FilterList = Arc<[Arc<dyn Filter>]>;

fn rethrow(exception: &mut Option<Error>, handled: bool) -> Result<()> {
	if handled {
		return Ok(());
	}
	match exception.take() {
		Some(error) => Err(error),
		None => Ok(()),
	}
}

macro_rules! debug_context {
	($name:ident { $($field:ident),* }) => {
		impl fmt::Debug for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.debug_struct(stringify!($name))
					.field("action", &self.action_context.action_descriptor.display_name())
					$(.field(stringify!($field), &self.$field))*
					.finish_non_exhaustive()
			}
		}
	};
}

pub struct AuthorizationFilterContext {
	pub action_context: ActionContext,
	pub filters: FilterList,
	/// Setting a result short-circuits the request
	pub result: Option<ActionResultRef>,
}

impl AuthorizationFilterContext {
	pub(crate) fn new(action_context: ActionContext, filters: FilterList) -> Self {
		Self {
			action_context,
			filters,
			result: None,
		}
	}
}

debug_context!(AuthorizationFilterContext { result });

pub struct ResourceExecutingContext {
	pub action_context: ActionContext,
	pub filters: FilterList,
	pub result: Option<ActionResultRef>,
}

impl ResourceExecutingContext {
	pub(crate) fn new(action_context: ActionContext, filters: FilterList) -> Self {
		Self {
			action_context,
			filters,
			result: None,
		}
	}
}

debug_context!(ResourceExecutingContext { result });

pub struct ResourceExecutedContext {
	pub action_context: ActionContext,
	pub filters: FilterList,
	/// A resource filter short-circuited the pipeline
	pub canceled: bool,
	pub result: Option<ActionResultRef>,
	pub exception: Option<Error>,
	pub exception_handled: bool,
}

impl ResourceExecutedContext {
	pub(crate) fn new(action_context: ActionContext, filters: FilterList) -> Self {
		Self {
			action_context,
			filters,
			canceled: false,
			result: None,
			exception: None,
			exception_handled: false,
		}
	}

	/// Take the pending error unless it was handled
	pub fn rethrow(&mut self) -> Result<()> {
		rethrow(&mut self.exception, self.exception_handled)
	}
}

debug_context!(ResourceExecutedContext { canceled, result, exception, exception_handled });

pub struct ExceptionContext {
	pub action_context: ActionContext,
	pub filters: FilterList,
	pub exception: Option<Error>,
	pub exception_handled: bool,
	pub result: Option<ActionResultRef>,
}

impl ExceptionContext {
	pub(crate) fn new(action_context: ActionContext, filters: FilterList, exception: Error) -> Self {
		Self {
			action_context,
			filters,
			exception: Some(exception),
			exception_handled: false,
			result: None,
		}
	}

	/// Whether a filter dealt with the error
	pub fn is_handled(&self) -> bool {
		self.result.is_some() || self.exception.is_none() || self.exception_handled
	}

	pub fn rethrow(&mut self) -> Result<()> {
		rethrow(&mut self.exception, self.exception_handled)
	}
}

debug_context!(ExceptionContext { exception, exception_handled, result });

pub struct ActionExecutingContext {
	pub action_context: ActionContext,
	pub filters: FilterList,
	pub controller: ControllerInstance,
	/// Arguments the handler will be called with
	pub action_arguments: ActionArguments,
	/// Setting a result skips the handler
	pub result: Option<ActionResultRef>,
}

impl ActionExecutingContext {
	pub(crate) fn new(
		action_context: ActionContext,
		filters: FilterList,
		controller: ControllerInstance,
		action_arguments: ActionArguments,
	) -> Self {
		Self {
			action_context,
			filters,
			controller,
			action_arguments,
			result: None,
		}
	}
}

debug_context!(ActionExecutingContext { action_arguments, result });

pub struct ActionExecutedContext {
	pub action_context: ActionContext,
	pub filters: FilterList,
	pub controller: ControllerInstance,
	pub canceled: bool,
	pub result: Option<ActionResultRef>,
	pub exception: Option<Error>,
	pub exception_handled: bool,
}

impl ActionExecutedContext {
	pub(crate) fn new(
		action_context: ActionContext,
		filters: FilterList,
		controller: ControllerInstance,
	) -> Self {
		Self {
			action_context,
			filters,
			controller,
			canceled: false,
			result: None,
			exception: None,
			exception_handled: false,
		}
	}

	pub fn rethrow(&mut self) -> Result<()> {
		rethrow(&mut self.exception, self.exception_handled)
	}
}

debug_context!(ActionExecutedContext { canceled, result, exception, exception_handled });

pub struct ResultExecutingContext {
	pub action_context: ActionContext,
	pub filters: FilterList,
	/// `None` when no controller was created, as after an authorization short-circuit
	pub controller: Option<ControllerInstance>,
	/// The result to execute; filters may replace it
	pub result: ActionResultRef,
	/// Skip result execution
	pub cancel: bool,
}

impl ResultExecutingContext {
	pub(crate) fn new(
		action_context: ActionContext,
		filters: FilterList,
		controller: Option<ControllerInstance>,
		result: ActionResultRef,
	) -> Self {
		Self {
			action_context,
			filters,
			controller,
			result,
			cancel: false,
		}
	}
}

debug_context!(ResultExecutingContext { result, cancel });

pub struct ResultExecutedContext {
	pub action_context: ActionContext,
	pub filters: FilterList,
	pub controller: Option<ControllerInstance>,
	pub canceled: bool,
	pub result: ActionResultRef,
	pub exception: Option<Error>,
	pub exception_handled: bool,
}

impl ResultExecutedContext {
	pub(crate) fn new(
		action_context: ActionContext,
		filters: FilterList,
		controller: Option<ControllerInstance>,
		result: ActionResultRef,
	) -> Self {
		Self {
			action_context,
			filters,
			controller,
			canceled: false,
			result,
			exception: None,
			exception_handled: false,
		}
	}

	pub fn rethrow(&mut self) -> Result<()> {
		rethrow(&mut self.exception, self.exception_handled)
	}
}

debug_context!(ResultExecutedContext { canceled, result, exception, exception_handled });
