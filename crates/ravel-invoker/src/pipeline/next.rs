//! Continuations handed to asynchronous resource, action and result filters.
//!
//! Each continuation may run the rest of the pipeline once. Short-circuiting
//! (or cancelling) and then calling [`run`](ResourceNext::run) anyway is a
//! protocol violation; so is calling `run` a second time.

use super::ControllerActionInvoker;
use super::result::ResultKind;
use crate::controller::ControllerInstance;
use crate::filters::context::{
	ActionExecutedContext, ActionExecutingContext, ResourceExecutedContext,
	ResourceExecutingContext, ResultExecutedContext, ResultExecutingContext,
};
use ravel_actions::ActionContext;
use ravel_core::exception::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NextKind {
	Resource,
	Action,
	Result,
}

impl NextKind {
	fn filter(self) -> &'static str {
		match self {
			Self::Resource => "AsyncResourceFilter",
			Self::Action => "AsyncActionFilter",
			Self::Result => "AsyncResultFilter",
		}
	}

	fn property(self) -> &'static str {
		match self {
			Self::Result => "cancel",
			Self::Resource | Self::Action => "result",
		}
	}

	fn context(self) -> &'static str {
		match self {
			Self::Resource => "ResourceExecutingContext",
			Self::Action => "ActionExecutingContext",
			Self::Result => "ResultExecutingContext",
		}
	}

	fn delegate(self) -> &'static str {
		match self {
			Self::Resource => "ResourceNext",
			Self::Action => "ActionNext",
			Self::Result => "ResultNext",
		}
	}
}

/// A misuse of a continuation. Always fatal for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProtocolViolation {
	ShortCircuitAndNext(NextKind),
	NextCalledTwice(NextKind),
}

impl ProtocolViolation {
	pub(crate) fn into_error(self) -> Error {
		match self {
			Self::ShortCircuitAndNext(kind @ NextKind::Result) => Error::InvalidCancellation {
				filter: kind.filter(),
				property: kind.property(),
				context: kind.context(),
				delegate: kind.delegate(),
			},
			Self::ShortCircuitAndNext(kind) => Error::InvalidShortCircuit {
				filter: kind.filter(),
				property: kind.property(),
				context: kind.context(),
				delegate: kind.delegate(),
			},
			Self::NextCalledTwice(kind) => Error::NextCalledTwice {
				filter: kind.filter(),
				delegate: kind.delegate(),
			},
		}
	}
}

/// Runs the remaining resource filters, the action stage and the result stage.
pub struct ResourceNext<'a> {
	invoker: &'a mut ControllerActionInvoker,
	called: bool,
}

impl<'a> ResourceNext<'a> {
	pub(crate) fn new(invoker: &'a mut ControllerActionInvoker) -> Self {
		Self {
			invoker,
			called: false,
		}
	}

	pub fn action_context(&self) -> &ActionContext {
		self.invoker.action_context()
	}

	/// Set `result` here and return without calling [`run`](Self::run) to short-circuit.
	pub fn context_mut(&mut self) -> &mut ResourceExecutingContext {
		self.invoker.resource_executing_context()
	}

	pub async fn run(&mut self) -> Result<&mut ResourceExecutedContext> {
		if self.called {
			return Err(self
				.invoker
				.record_violation(ProtocolViolation::NextCalledTwice(NextKind::Resource)));
		}
		self.called = true;
		if self.invoker.resource_executing_context().result.is_some() {
			return Err(self
				.invoker
				.record_violation(ProtocolViolation::ShortCircuitAndNext(NextKind::Resource)));
		}

		self.invoker.invoke_next_resource_filter().await?;
		self.invoker.resource_executed_context()
	}
}

/// Runs the remaining action filters and the handler.
pub struct ActionNext<'a> {
	invoker: &'a mut ControllerActionInvoker,
	controller: ControllerInstance,
	called: bool,
}

impl<'a> ActionNext<'a> {
	pub(crate) fn new(invoker: &'a mut ControllerActionInvoker, controller: ControllerInstance) -> Self {
		Self {
			invoker,
			controller,
			called: false,
		}
	}

	pub fn action_context(&self) -> &ActionContext {
		self.invoker.action_context()
	}

	/// The controller instance of this request
	pub fn controller(&self) -> &ControllerInstance {
		&self.controller
	}

	/// Arguments can be changed here before the handler runs.
	pub fn context_mut(&mut self) -> &mut ActionExecutingContext {
		self.invoker.action_executing_context_for(&self.controller)
	}

	pub async fn run(&mut self) -> Result<&mut ActionExecutedContext> {
		if self.called {
			return Err(self
				.invoker
				.record_violation(ProtocolViolation::NextCalledTwice(NextKind::Action)));
		}
		self.called = true;
		if self.context_mut().result.is_some() {
			return Err(self
				.invoker
				.record_violation(ProtocolViolation::ShortCircuitAndNext(NextKind::Action)));
		}

		self.invoker.invoke_next_action_filter().await?;
		self.invoker.action_executed_context()
	}
}

/// Runs the remaining result filters and then the result.
pub struct ResultNext<'a> {
	invoker: &'a mut ControllerActionInvoker,
	kind: ResultKind,
	called: bool,
}

impl<'a> ResultNext<'a> {
	pub(crate) fn new(invoker: &'a mut ControllerActionInvoker, kind: ResultKind) -> Self {
		Self {
			invoker,
			kind,
			called: false,
		}
	}

	pub fn action_context(&self) -> &ActionContext {
		self.invoker.action_context()
	}

	/// Replace `result` here, or set `cancel` and return without calling [`run`](Self::run).
	pub fn context_mut(&mut self) -> &mut ResultExecutingContext {
		self.invoker.result_executing_context()
	}

	pub async fn run(&mut self) -> Result<&mut ResultExecutedContext> {
		if self.called {
			return Err(self
				.invoker
				.record_violation(ProtocolViolation::NextCalledTwice(NextKind::Result)));
		}
		self.called = true;
		if self.invoker.result_executing_context().cancel {
			return Err(self
				.invoker
				.record_violation(ProtocolViolation::ShortCircuitAndNext(NextKind::Result)));
		}

		self.invoker.invoke_next_result_filter(self.kind).await?;
		self.invoker.result_executed_context()
	}
}

macro_rules! debug_next {
	($($next:ident),+) => {
		$(
			impl fmt::Debug for $next<'_> {
				fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
					f.debug_struct(stringify!($next))
						.field("invoker", &self.invoker)
						.field("called", &self.called)
						.finish()
				}
			}
		)+
	};
}

debug_next!(ResourceNext, ActionNext, ResultNext);
