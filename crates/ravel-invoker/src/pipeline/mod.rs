//! The filter pipeline of a controller action.
//!
//! A request moves through five stages in a fixed order: authorization,
//! resource, exception, action and result. The driver is an explicit state
//! machine. Stages that wrap the rest of the pipeline (resource, action and
//! result filters calling `next`, exception filters unwinding) re-enter the
//! driver at a nested [`Scope`], which stops at the end of its own stage
//! instead of running the whole machine to completion.
//!
//! User errors raised inside a nested scope are captured into that stage's
//! executed-context and rethrown when the stage unwinds, unless a filter
//! marks them handled. Protocol violations and other fatal errors are never
//! captured.

mod action;
pub mod next;
mod result;

use crate::cache::ControllerActionInvokerCacheEntry;
use crate::controller::{ActionArguments, ControllerInstance};
use crate::filters::context::{
	ActionExecutedContext, ActionExecutingContext, AuthorizationFilterContext, ExceptionContext,
	FilterList, ResourceExecutedContext, ResourceExecutingContext, ResultExecutedContext,
	ResultExecutingContext,
};
use crate::filters::cursor::{CursorItem, FilterCursor, FilterStage};
use crate::filters::Filter;
use crate::result::{ActionResultRef, ActionResultTypeMapper, EmptyResult};
use action::ActionState;
use futures::future::BoxFuture;
use next::{ProtocolViolation, ResourceNext};
use ravel_actions::ActionContext;
use ravel_core::exception::{Error, Result};
use result::ResultKind;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Who entered the driver, and so where it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
	Invoker,
	Resource,
	Exception,
	Action,
	Result,
}

enum State {
	InvokeBegin,
	AuthorizationBegin,
	AuthorizationNext,
	AuthorizationAsync(Arc<dyn Filter>),
	AuthorizationSync(Arc<dyn Filter>),
	AuthorizationShortCircuit(Arc<dyn Filter>),
	AuthorizationEnd,
	ResourceBegin,
	ResourceNext,
	ResourceAsyncBegin(Arc<dyn Filter>),
	ResourceAsyncEnd(Arc<dyn Filter>),
	ResourceSyncBegin(Arc<dyn Filter>),
	ResourceSyncEnd(Arc<dyn Filter>),
	ResourceShortCircuit(Arc<dyn Filter>),
	ResourceInside,
	ResourceInsideEnd,
	ResourceEnd,
	ExceptionBegin,
	ExceptionNext,
	ExceptionAsync(Arc<dyn Filter>),
	ExceptionSync(Arc<dyn Filter>),
	ExceptionInside,
	ExceptionHandled,
	ExceptionEnd,
	ActionBegin,
	ActionEnd,
	InvokeEnd,
}

fn missing_capability(filter: &dyn Filter, stage: FilterStage) -> Error {
	Error::Internal(format!(
		"filter '{}' was scheduled for the {} stage but does not implement it",
		filter.filter_name(),
		stage.name()
	))
}

fn missing_context(name: &str) -> Error {
	Error::Internal(format!("the {name} context was used before it was created"))
}

/// Runs the filter pipeline and the handler for one request.
///
/// Created per request by [`crate::factory::ActionInvokerFactory`] and consumed by
/// [`ControllerActionInvoker::invoke`].
pub struct ControllerActionInvoker {
	action_context: ActionContext,
	cache_entry: Arc<ControllerActionInvokerCacheEntry>,
	filters: FilterList,
	mapper: Arc<dyn ActionResultTypeMapper>,
	log_execution_plan: bool,
	cursor: FilterCursor,
	instance: Option<ControllerInstance>,
	arguments: ActionArguments,
	result: Option<ActionResultRef>,
	authorization_context: Option<AuthorizationFilterContext>,
	resource_executing_context: Option<ResourceExecutingContext>,
	resource_executed_context: Option<ResourceExecutedContext>,
	exception_context: Option<ExceptionContext>,
	action_executing_context: Option<ActionExecutingContext>,
	action_executed_context: Option<ActionExecutedContext>,
	result_executing_context: Option<ResultExecutingContext>,
	result_executed_context: Option<ResultExecutedContext>,
	violation: Option<ProtocolViolation>,
}

impl ControllerActionInvoker {
	pub(crate) fn new(
		action_context: ActionContext,
		cache_entry: Arc<ControllerActionInvokerCacheEntry>,
		filters: FilterList,
		mapper: Arc<dyn ActionResultTypeMapper>,
		log_execution_plan: bool,
	) -> Self {
		Self {
			action_context,
			cache_entry,
			filters,
			mapper,
			log_execution_plan,
			cursor: FilterCursor::default(),
			instance: None,
			arguments: ActionArguments::new(),
			result: None,
			authorization_context: None,
			resource_executing_context: None,
			resource_executed_context: None,
			exception_context: None,
			action_executing_context: None,
			action_executed_context: None,
			result_executing_context: None,
			result_executed_context: None,
			violation: None,
		}
	}

	pub fn action_context(&self) -> &ActionContext {
		&self.action_context
	}

	/// The filters of this request, in execution order
	pub fn filters(&self) -> &FilterList {
		&self.filters
	}

	/// Run the pipeline, then release the controller if one was created.
	///
	/// The controller is released exactly once on every path. A release
	/// failure is combined with the pipeline outcome rather than replacing it.
	pub async fn invoke(mut self) -> Result<()> {
		let started = Instant::now();
		let action = self.action_context.action_descriptor.display_name().to_string();
		tracing::debug!(action = %action, "executing action");
		if self.log_execution_plan {
			self.log_filter_execution_plan();
		}

		let outcome = self.run_pipeline(Scope::Invoker, State::InvokeBegin).await;
		let released = self.release_controller().await;

		tracing::debug!(
			action = %action,
			elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
			succeeded = outcome.is_ok(),
			"executed action"
		);
		Error::combine(outcome, released)
	}

	async fn release_controller(&mut self) -> Result<()> {
		let Some(controller) = self.instance.take() else {
			return Ok(());
		};
		let released = self
			.cache_entry
			.controller_factory
			.release_controller(&self.action_context, controller)
			.await;
		if let Err(error) = &released {
			tracing::warn!(
				action = %self.action_context.action_descriptor.display_name(),
				error = %error,
				"failed to release controller"
			);
		}
		released
	}

	fn log_filter_execution_plan(&self) {
		for stage in FilterStage::ALL {
			let names: Vec<&str> = self
				.filters
				.iter()
				.filter(|filter| stage.accepts(filter.as_ref()))
				.map(|filter| filter.filter_name())
				.collect();
			let plan = if names.is_empty() {
				"None".to_string()
			} else {
				names.join(", ")
			};
			tracing::trace!(stage = stage.name(), filters = %plan, "filter execution plan");
		}
	}

	fn log_short_circuit(&self, stage: FilterStage, filter: &dyn Filter) {
		tracing::debug!(
			action = %self.action_context.action_descriptor.display_name(),
			stage = stage.name(),
			filter = filter.filter_name(),
			"request was short-circuited by filter"
		);
	}

	fn record_violation(&mut self, violation: ProtocolViolation) -> Error {
		let first = *self.violation.get_or_insert(violation);
		tracing::error!(violation = ?first, "filter broke the pipeline protocol");
		violation.into_error()
	}

	/// A violation fails the request even when the offending filter swallowed the error.
	fn check_violation(&self) -> Result<()> {
		match self.violation {
			Some(violation) => Err(violation.into_error()),
			None => Ok(()),
		}
	}

	fn controller(&self) -> Result<ControllerInstance> {
		self.instance
			.clone()
			.ok_or_else(|| Error::Internal("no controller has been created".to_string()))
	}

	// ===== Context accessors =====

	fn authorization_context(&mut self) -> &mut AuthorizationFilterContext {
		let (action_context, filters) = (&self.action_context, &self.filters);
		self.authorization_context.get_or_insert_with(|| {
			AuthorizationFilterContext::new(action_context.clone(), Arc::clone(filters))
		})
	}

	pub(crate) fn resource_executing_context(&mut self) -> &mut ResourceExecutingContext {
		let (action_context, filters) = (&self.action_context, &self.filters);
		self.resource_executing_context.get_or_insert_with(|| {
			ResourceExecutingContext::new(action_context.clone(), Arc::clone(filters))
		})
	}

	pub(crate) fn resource_executed_context(&mut self) -> Result<&mut ResourceExecutedContext> {
		self.resource_executed_context
			.as_mut()
			.ok_or_else(|| missing_context("resource executed"))
	}

	fn new_resource_executed_context(&self) -> ResourceExecutedContext {
		ResourceExecutedContext::new(self.action_context.clone(), Arc::clone(&self.filters))
	}

	/// Short-circuit bookkeeping: the executed context mirrors the executing result.
	fn cancel_resource_execution(&mut self) -> Option<ActionResultRef> {
		let result = self.resource_executing_context().result.clone();
		let mut executed = self.new_resource_executed_context();
		executed.canceled = true;
		executed.result = result.clone();
		self.resource_executed_context = Some(executed);
		result
	}

	// ===== Driver =====

	fn run_pipeline(&mut self, scope: Scope, mut state: State) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			loop {
				state = match state {
					State::InvokeBegin => State::AuthorizationBegin,

					State::AuthorizationBegin => {
						self.cursor.reset();
						State::AuthorizationNext
					}

					State::AuthorizationNext => {
						match self.cursor.next_filter(&self.filters, FilterStage::Authorization) {
							Some(CursorItem::Async(filter)) => State::AuthorizationAsync(filter),
							Some(CursorItem::Sync(filter)) => State::AuthorizationSync(filter),
							None => State::AuthorizationEnd,
						}
					}

					State::AuthorizationAsync(filter) => {
						let Some(authorize) = filter.as_async_authorization() else {
							return Err(missing_capability(filter.as_ref(), FilterStage::Authorization));
						};
						let context = self.authorization_context();
						authorize.on_authorization(context).await?;
						if context.result.is_some() {
							State::AuthorizationShortCircuit(filter)
						} else {
							State::AuthorizationNext
						}
					}

					State::AuthorizationSync(filter) => {
						let Some(authorize) = filter.as_authorization() else {
							return Err(missing_capability(filter.as_ref(), FilterStage::Authorization));
						};
						let context = self.authorization_context();
						authorize.on_authorization(context)?;
						if context.result.is_some() {
							State::AuthorizationShortCircuit(filter)
						} else {
							State::AuthorizationNext
						}
					}

					State::AuthorizationShortCircuit(filter) => {
						tracing::info!(
							action = %self.action_context.action_descriptor.display_name(),
							filter = filter.filter_name(),
							"authorization failed for the request"
						);
						self.result = self
							.authorization_context
							.as_ref()
							.and_then(|context| context.result.clone());
						self.invoke_result_filters(ResultKind::AlwaysRun).await?;
						return Ok(());
					}

					State::AuthorizationEnd => State::ResourceBegin,

					State::ResourceBegin => {
						self.cursor.reset();
						State::ResourceNext
					}

					State::ResourceNext => {
						match self.cursor.next_filter(&self.filters, FilterStage::Resource) {
							Some(CursorItem::Async(filter)) => {
								self.resource_executing_context();
								State::ResourceAsyncBegin(filter)
							}
							Some(CursorItem::Sync(filter)) => {
								self.resource_executing_context();
								State::ResourceSyncBegin(filter)
							}
							None => State::ResourceInside,
						}
					}

					State::ResourceAsyncBegin(filter) => {
						let Some(resource) = filter.as_async_resource() else {
							return Err(missing_capability(filter.as_ref(), FilterStage::Resource));
						};
						let outcome = resource.on_resource_execution(ResourceNext::new(self)).await;
						self.check_violation()?;
						outcome?;
						State::ResourceAsyncEnd(filter)
					}

					State::ResourceAsyncEnd(filter) => {
						if self.resource_executed_context.is_none() {
							// The filter returned without calling next.
							if self.cancel_resource_execution().is_some() {
								State::ResourceShortCircuit(filter)
							} else {
								State::ResourceEnd
							}
						} else {
							State::ResourceEnd
						}
					}

					State::ResourceSyncBegin(filter) => {
						let Some(resource) = filter.as_resource() else {
							return Err(missing_capability(filter.as_ref(), FilterStage::Resource));
						};
						let context = self.resource_executing_context();
						resource.on_resource_executing(context)?;
						if context.result.is_some() {
							self.cancel_resource_execution();
							State::ResourceShortCircuit(filter)
						} else {
							self.invoke_next_resource_filter().await?;
							State::ResourceSyncEnd(filter)
						}
					}

					State::ResourceSyncEnd(filter) => {
						let Some(resource) = filter.as_resource() else {
							return Err(missing_capability(filter.as_ref(), FilterStage::Resource));
						};
						resource.on_resource_executed(self.resource_executed_context()?)?;
						State::ResourceEnd
					}

					State::ResourceShortCircuit(filter) => {
						self.log_short_circuit(FilterStage::Resource, filter.as_ref());
						self.result = self.resource_executing_context().result.clone();
						self.invoke_result_filters(ResultKind::AlwaysRun).await?;
						State::ResourceEnd
					}

					State::ResourceInside => State::ExceptionBegin,

					State::ExceptionBegin => {
						self.cursor.reset();
						State::ExceptionNext
					}

					State::ExceptionNext => {
						match self.cursor.next_filter(&self.filters, FilterStage::Exception) {
							Some(CursorItem::Async(filter)) => State::ExceptionAsync(filter),
							Some(CursorItem::Sync(filter)) => State::ExceptionSync(filter),
							None if scope == Scope::Exception => State::ExceptionInside,
							None => State::ActionBegin,
						}
					}

					State::ExceptionAsync(filter) => {
						let Some(on_exception) = filter.as_async_exception() else {
							return Err(missing_capability(filter.as_ref(), FilterStage::Exception));
						};
						self.invoke_next_exception_filter().await?;
						if let Some(context) = self.exception_context.as_mut()
							&& context.exception.is_some()
							&& !context.exception_handled
						{
							on_exception.on_exception(context).await?;
							if context.exception.is_none() || context.exception_handled {
								self.log_short_circuit(FilterStage::Exception, filter.as_ref());
							}
						}
						State::ExceptionEnd
					}

					State::ExceptionSync(filter) => {
						let Some(on_exception) = filter.as_exception() else {
							return Err(missing_capability(filter.as_ref(), FilterStage::Exception));
						};
						self.invoke_next_exception_filter().await?;
						if let Some(context) = self.exception_context.as_mut()
							&& context.exception.is_some()
							&& !context.exception_handled
						{
							on_exception.on_exception(context)?;
							if context.exception.is_none() || context.exception_handled {
								self.log_short_circuit(FilterStage::Exception, filter.as_ref());
							}
						}
						State::ExceptionEnd
					}

					State::ExceptionInside => State::ActionBegin,

					State::ExceptionHandled => {
						let context = self
							.exception_context
							.as_mut()
							.ok_or_else(|| missing_context("exception"))?;
						let result = Arc::clone(context.result.get_or_insert_with(EmptyResult::shared));
						self.result = Some(result);
						self.invoke_result_filters(ResultKind::AlwaysRun).await?;
						State::ResourceInsideEnd
					}

					State::ExceptionEnd => {
						if scope == Scope::Exception {
							return Ok(());
						}
						match self.exception_context.as_mut() {
							Some(context) => {
								if !context.is_handled() {
									context.rethrow()?;
								}
								State::ExceptionHandled
							}
							None => {
								self.invoke_result_filters(ResultKind::Ordinary).await?;
								State::ResourceInsideEnd
							}
						}
					}

					State::ActionBegin => {
						self.run_action(Scope::Invoker, ActionState::Begin).await?;
						State::ActionEnd
					}

					State::ActionEnd => {
						if scope == Scope::Exception {
							// Exception filters unwind before any result runs.
							return Ok(());
						}
						self.invoke_result_filters(ResultKind::Ordinary).await?;
						State::ResourceInsideEnd
					}

					State::ResourceInsideEnd => {
						if scope == Scope::Resource {
							let mut executed = self.new_resource_executed_context();
							executed.result = self.result.clone();
							self.resource_executed_context = Some(executed);
							State::ResourceEnd
						} else {
							State::InvokeEnd
						}
					}

					State::ResourceEnd => {
						if scope == Scope::Resource {
							return Ok(());
						}
						if let Some(executed) = self.resource_executed_context.as_mut() {
							executed.rethrow()?;
						}
						State::InvokeEnd
					}

					State::InvokeEnd => return Ok(()),
				};
			}
		})
	}

	// ===== Capture points =====

	/// Run the remaining resource filters and everything inside them.
	pub(crate) async fn invoke_next_resource_filter(&mut self) -> Result<()> {
		match self.run_pipeline(Scope::Resource, State::ResourceNext).await {
			Ok(()) => {}
			Err(error) if error.is_recoverable() => {
				let mut executed = self.new_resource_executed_context();
				executed.exception = Some(error);
				self.resource_executed_context = Some(executed);
			}
			Err(error) => return Err(error),
		}
		self.resource_executed_context().map(|_| ())
	}

	async fn invoke_next_exception_filter(&mut self) -> Result<()> {
		match self.run_pipeline(Scope::Exception, State::ExceptionNext).await {
			Ok(()) => Ok(()),
			Err(error) if error.is_recoverable() => {
				tracing::debug!(
					action = %self.action_context.action_descriptor.display_name(),
					error = %error,
					"error captured for exception filters"
				);
				self.exception_context = Some(ExceptionContext::new(
					self.action_context.clone(),
					Arc::clone(&self.filters),
					error,
				));
				Ok(())
			}
			Err(error) => Err(error),
		}
	}
}

impl fmt::Debug for ControllerActionInvoker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ControllerActionInvoker")
			.field("action", &self.action_context.action_descriptor.display_name())
			.field("filters", &self.filters.len())
			.field("controller_created", &self.instance.is_some())
			.finish_non_exhaustive()
	}
}
