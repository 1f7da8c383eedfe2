//! The result stage, shared by ordinary and always-run result filters.

use super::next::ResultNext;
use super::{ControllerActionInvoker, Scope, missing_capability, missing_context};
use crate::filters::Filter;
use crate::filters::context::{ResultExecutedContext, ResultExecutingContext};
use crate::filters::cursor::{CursorItem, FilterStage};
use crate::result::{ActionResultRef, EmptyResult};
use futures::future::BoxFuture;
use ravel_core::exception::Result;
use std::sync::Arc;

/// Which result filters a result-stage run visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResultKind {
	Ordinary,
	/// Used after a short-circuit or a handled error
	AlwaysRun,
}

impl ResultKind {
	fn stage(self) -> FilterStage {
		match self {
			Self::Ordinary => FilterStage::Result,
			Self::AlwaysRun => FilterStage::AlwaysRunResult,
		}
	}
}

pub(super) enum ResultState {
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
	fn current_result(&self) -> ActionResultRef {
		self.result.clone().unwrap_or_else(EmptyResult::shared)
	}

	pub(crate) fn result_executing_context(&mut self) -> &mut ResultExecutingContext {
		let result = self.current_result();
		let (action_context, filters, instance) = (&self.action_context, &self.filters, &self.instance);
		self.result_executing_context.get_or_insert_with(|| {
			ResultExecutingContext::new(
				action_context.clone(),
				Arc::clone(filters),
				instance.clone(),
				result,
			)
		})
	}

	pub(crate) fn result_executed_context(&mut self) -> Result<&mut ResultExecutedContext> {
		self.result_executed_context
			.as_mut()
			.ok_or_else(|| missing_context("result executed"))
	}

	fn new_result_executed_context(&self, result: ActionResultRef) -> ResultExecutedContext {
		ResultExecutedContext::new(
			self.action_context.clone(),
			Arc::clone(&self.filters),
			self.instance.clone(),
			result,
		)
	}

	fn cancel_result_execution(&mut self) {
		let result = Arc::clone(&self.result_executing_context().result);
		let mut executed = self.new_result_executed_context(result);
		executed.canceled = true;
		self.result_executed_context = Some(executed);
	}

	pub(super) async fn invoke_result_filters(&mut self, kind: ResultKind) -> Result<()> {
		self.run_result_filters(Scope::Invoker, kind, ResultState::Begin)
			.await
	}

	fn run_result_filters(
		&mut self,
		scope: Scope,
		kind: ResultKind,
		mut state: ResultState,
	) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			let stage = kind.stage();
			loop {
				state = match state {
					ResultState::Begin => {
						self.cursor.reset();
						ResultState::Next
					}

					ResultState::Next => match self.cursor.next_filter(&self.filters, stage) {
						Some(CursorItem::Async(filter)) => {
							self.result_executing_context();
							ResultState::AsyncBegin(filter)
						}
						Some(CursorItem::Sync(filter)) => {
							self.result_executing_context();
							ResultState::SyncBegin(filter)
						}
						None => ResultState::Inside,
					},

					ResultState::AsyncBegin(filter) => {
						let Some(result_filter) = filter.as_async_result() else {
							return Err(missing_capability(filter.as_ref(), stage));
						};
						let outcome = result_filter
							.on_result_execution(ResultNext::new(self, kind))
							.await;
						self.check_violation()?;
						outcome?;
						ResultState::AsyncEnd(filter)
					}

					ResultState::AsyncEnd(filter) => {
						let canceled = self.result_executing_context().cancel;
						if self.result_executed_context.is_none() || canceled {
							// Not calling next and setting cancel both skip the result.
							self.log_short_circuit(stage, filter.as_ref());
							self.cancel_result_execution();
						}
						ResultState::End
					}

					ResultState::SyncBegin(filter) => {
						let Some(result_filter) = filter.as_result() else {
							return Err(missing_capability(filter.as_ref(), stage));
						};
						let context = self.result_executing_context();
						result_filter.on_result_executing(context)?;
						if context.cancel {
							self.log_short_circuit(stage, filter.as_ref());
							self.cancel_result_execution();
							ResultState::End
						} else {
							self.invoke_next_result_filter(kind).await?;
							ResultState::SyncEnd(filter)
						}
					}

					ResultState::SyncEnd(filter) => {
						let Some(result_filter) = filter.as_result() else {
							return Err(missing_capability(filter.as_ref(), stage));
						};
						result_filter.on_result_executed(self.result_executed_context()?)?;
						ResultState::End
					}

					ResultState::Inside => {
						// Filters may have replaced the result.
						if let Some(context) = &self.result_executing_context {
							self.result = Some(Arc::clone(&context.result));
						}
						let result = Arc::clone(self.result.get_or_insert_with(EmptyResult::shared));
						tracing::trace!(
							action = %self.action_context.action_descriptor.display_name(),
							result = ?result,
							"executing result"
						);
						result.execute_result(&self.action_context).await?;
						ResultState::End
					}

					ResultState::End => {
						if scope == Scope::Result {
							if self.result_executed_context.is_none() {
								let executed = self.new_result_executed_context(self.current_result());
								self.result_executed_context = Some(executed);
							}
							return Ok(());
						}
						if let Some(executed) = self.result_executed_context.as_mut() {
							executed.rethrow()?;
						}
						return Ok(());
					}
				};
			}
		})
	}

	/// Run the remaining result filters and the result itself.
	pub(crate) async fn invoke_next_result_filter(&mut self, kind: ResultKind) -> Result<()> {
		match self.run_result_filters(Scope::Result, kind, ResultState::Next).await {
			Ok(()) => {}
			Err(error) if error.is_recoverable() => {
				let mut executed = self.new_result_executed_context(self.current_result());
				executed.exception = Some(error);
				self.result_executed_context = Some(executed);
			}
			Err(error) => return Err(error),
		}
		self.result_executed_context().map(|_| ())
	}
}
