//! The action stage: controller creation, argument binding, action filters and the handler call.

use super::next::ActionNext;
use super::{ControllerActionInvoker, Scope, missing_capability, missing_context};
use crate::controller::{ActionArguments, ControllerInstance};
use crate::filters::Filter;
use crate::filters::context::{ActionExecutedContext, ActionExecutingContext};
use crate::filters::cursor::{CursorItem, FilterStage};
use futures::future::BoxFuture;
use ravel_core::exception::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

pub(super) enum ActionState {
	Begin,
	Next,
	AsyncBegin(Arc<dyn Filter>),
	AsyncEnd(Arc<dyn Filter>),
	SyncBegin(Arc<dyn Filter>),
	SyncEnd(Arc<dyn Filter>),
	Inside,
	End,
}

impl ControllerActionInvoker {
	pub(crate) fn action_executing_context_for(
		&mut self,
		controller: &ControllerInstance,
	) -> &mut ActionExecutingContext {
		let (action_context, filters, arguments) = (&self.action_context, &self.filters, &self.arguments);
		self.action_executing_context.get_or_insert_with(|| {
			ActionExecutingContext::new(
				action_context.clone(),
				Arc::clone(filters),
				Arc::clone(controller),
				arguments.clone(),
			)
		})
	}

	fn action_executing_context(&mut self) -> Result<&mut ActionExecutingContext> {
		let controller = self.controller()?;
		Ok(self.action_executing_context_for(&controller))
	}

	pub(crate) fn action_executed_context(&mut self) -> Result<&mut ActionExecutedContext> {
		self.action_executed_context
			.as_mut()
			.ok_or_else(|| missing_context("action executed"))
	}

	fn new_action_executed_context(&self) -> Result<ActionExecutedContext> {
		Ok(ActionExecutedContext::new(
			self.action_context.clone(),
			Arc::clone(&self.filters),
			self.controller()?,
		))
	}

	fn cancel_action_execution(&mut self) -> Result<()> {
		let result = self.action_executing_context()?.result.clone();
		let mut executed = self.new_action_executed_context()?;
		executed.canceled = true;
		executed.result = result;
		self.action_executed_context = Some(executed);
		Ok(())
	}

	pub(super) fn run_action(&mut self, scope: Scope, mut state: ActionState) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			loop {
				state = match state {
					ActionState::Begin => {
						self.cursor.reset();
						let entry = Arc::clone(&self.cache_entry);
						let controller = entry.controller_factory.create_controller(&self.action_context)?;
						self.instance = Some(Arc::clone(&controller));
						self.arguments = ActionArguments::new();
						if let Some(binder) = &entry.argument_binder {
							binder
								.bind_arguments(
									&self.action_context,
									&controller,
									entry.object_method_executor.parameters(),
									&mut self.arguments,
								)
								.await?;
						}
						ActionState::Next
					}

					ActionState::Next => match self.cursor.next_filter(&self.filters, FilterStage::Action) {
						Some(CursorItem::Async(filter)) => {
							self.action_executing_context()?;
							ActionState::AsyncBegin(filter)
						}
						Some(CursorItem::Sync(filter)) => {
							self.action_executing_context()?;
							ActionState::SyncBegin(filter)
						}
						None => ActionState::Inside,
					},

					ActionState::AsyncBegin(filter) => {
						let Some(action) = filter.as_async_action() else {
							return Err(missing_capability(filter.as_ref(), FilterStage::Action));
						};
						let controller = self.controller()?;
						let outcome = action
							.on_action_execution(ActionNext::new(self, controller))
							.await;
						self.check_violation()?;
						outcome?;
						ActionState::AsyncEnd(filter)
					}

					ActionState::AsyncEnd(filter) => {
						if self.action_executed_context.is_none() {
							// The filter returned without calling next.
							self.log_short_circuit(FilterStage::Action, filter.as_ref());
							self.cancel_action_execution()?;
						}
						ActionState::End
					}

					ActionState::SyncBegin(filter) => {
						let Some(action) = filter.as_action() else {
							return Err(missing_capability(filter.as_ref(), FilterStage::Action));
						};
						let context = self.action_executing_context()?;
						action.on_action_executing(context)?;
						if context.result.is_some() {
							self.log_short_circuit(FilterStage::Action, filter.as_ref());
							self.cancel_action_execution()?;
							ActionState::End
						} else {
							self.invoke_next_action_filter().await?;
							ActionState::SyncEnd(filter)
						}
					}

					ActionState::SyncEnd(filter) => {
						let Some(action) = filter.as_action() else {
							return Err(missing_capability(filter.as_ref(), FilterStage::Action));
						};
						action.on_action_executed(self.action_executed_context()?)?;
						ActionState::End
					}

					ActionState::Inside => {
						self.invoke_action_method().await?;
						ActionState::End
					}

					ActionState::End => {
						if scope == Scope::Action {
							if self.action_executed_context.is_none() {
								let mut executed = self.new_action_executed_context()?;
								executed.result = self.result.clone();
								self.action_executed_context = Some(executed);
							}
							return Ok(());
						}
						if let Some(executed) = self.action_executed_context.as_mut() {
							executed.rethrow()?;
							self.result = executed.result.clone();
						}
						return Ok(());
					}
				};
			}
		})
	}

	/// Run the remaining action filters and the handler.
	pub(crate) async fn invoke_next_action_filter(&mut self) -> Result<()> {
		match self.run_action(Scope::Action, ActionState::Next).await {
			Ok(()) => {}
			Err(error) if error.is_recoverable() => {
				let mut executed = self.new_action_executed_context()?;
				executed.exception = Some(error);
				self.action_executed_context = Some(executed);
			}
			Err(error) => return Err(error),
		}
		self.action_executed_context().map(|_| ())
	}

	/// Lay the bound arguments out in parameter order, falling back to declared defaults.
	fn prepare_arguments(&self) -> Vec<Value> {
		let executor = &self.cache_entry.object_method_executor;
		let arguments = match &self.action_executing_context {
			Some(context) => &context.action_arguments,
			None => &self.arguments,
		};
		executor
			.parameters()
			.iter()
			.enumerate()
			.map(|(index, parameter)| match arguments.get(&parameter.name) {
				Some(value) => value.clone(),
				None => executor.default_value_for_parameter(index),
			})
			.collect()
	}

	async fn invoke_action_method(&mut self) -> Result<()> {
		let entry = Arc::clone(&self.cache_entry);
		let controller = self.controller()?;
		let arguments = self.prepare_arguments();
		let method = &entry.object_method_executor.signature().name;

		tracing::trace!(
			action = %self.action_context.action_descriptor.display_name(),
			method = %method,
			arguments = arguments.len(),
			"executing action method"
		);
		let started = Instant::now();
		let result = entry
			.action_method_executor
			.execute(
				self.mapper.as_ref(),
				&entry.object_method_executor,
				&self.action_context,
				controller,
				arguments,
			)
			.await;
		tracing::trace!(
			method = %method,
			elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
			succeeded = result.is_ok(),
			"executed action method"
		);

		self.result = Some(result?);
		Ok(())
	}
}

