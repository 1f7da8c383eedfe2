//! Return-shape dispatch for handler methods.
//!
//! A handler's declared return type is classified once into one of a closed
//! set of shapes. Each shape knows how to call the handler, await it when the
//! shape is asynchronous and turn what came back into an [`ActionResultRef`].

use crate::controller::ControllerInstance;
use crate::method::{MethodReturn, MethodSignature, ObjectMethodExecutor, ReturnKind, ReturnType};
use crate::result::{ActionResultRef, ActionResultTypeMapper, EmptyResult};
use ravel_actions::ActionContext;
use ravel_core::exception::{Error, Result};
use serde_json::Value;

/// How a handler method is called and its return value normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionMethodExecutor {
	/// `fn(..)`
	Void,
	/// `fn(..) -> ActionResultRef`
	SyncActionResult,
	/// A bare task with no output
	Task,
	/// `async fn(..)`
	Awaitable,
	/// `async fn(..) -> ActionResultRef`
	AwaitableOfActionResult,
	/// `async fn(..) -> T`
	AwaitableOfObject,
	/// `fn(..) -> T`, the synchronous catch-all
	SyncObject,
}

/// Classifiers in the order they are tried; the catch-all comes last.
const EXECUTORS: [ActionMethodExecutor; 7] = [
	ActionMethodExecutor::Void,
	ActionMethodExecutor::SyncActionResult,
	ActionMethodExecutor::Task,
	ActionMethodExecutor::Awaitable,
	ActionMethodExecutor::AwaitableOfActionResult,
	ActionMethodExecutor::AwaitableOfObject,
	ActionMethodExecutor::SyncObject,
];

impl ActionMethodExecutor {
	fn can_execute(self, kind: &ReturnKind) -> bool {
		match (self, kind) {
			(Self::Void, ReturnKind::Unit)
			| (Self::SyncActionResult, ReturnKind::ActionResult)
			| (Self::Task, ReturnKind::Task) => true,
			(Self::Awaitable, ReturnKind::Awaitable(inner)) => **inner == ReturnKind::Unit,
			(Self::AwaitableOfActionResult, ReturnKind::Awaitable(inner)) => {
				**inner == ReturnKind::ActionResult
			}
			(Self::AwaitableOfObject, ReturnKind::Awaitable(inner)) => **inner == ReturnKind::Object,
			(Self::SyncObject, kind) => !kind.is_async(),
			_ => false,
		}
	}

	/// Classify a handler signature.
	///
	/// # Examples
	///
	/// ```
	/// use ravel_invoker::executor::ActionMethodExecutor;
	/// use ravel_invoker::method::{MethodSignature, ReturnType};
	///
	/// let signature = MethodSignature::new("Index", ReturnType::future_action_result());
	/// assert_eq!(
	/// 	ActionMethodExecutor::get_executor(&signature).unwrap(),
	/// 	ActionMethodExecutor::AwaitableOfActionResult,
	/// );
	/// ```
	pub fn get_executor(signature: &MethodSignature) -> Result<Self> {
		let kind = signature.return_type.kind();
		EXECUTORS
			.into_iter()
			.find(|executor| executor.can_execute(kind))
			.ok_or_else(|| Error::UnsupportedReturnType {
				method: signature.name.clone(),
				return_type: signature.return_type.name().to_string(),
			})
	}

	pub fn is_async(self) -> bool {
		matches!(
			self,
			Self::Task | Self::Awaitable | Self::AwaitableOfActionResult | Self::AwaitableOfObject
		)
	}

	/// Call the handler and produce its action result.
	pub async fn execute(
		self,
		mapper: &dyn ActionResultTypeMapper,
		executor: &ObjectMethodExecutor,
		action_context: &ActionContext,
		controller: ControllerInstance,
		arguments: Vec<Value>,
	) -> Result<ActionResultRef> {
		let return_type = executor.return_type();

		if executor.has_filters() {
			let returned = executor
				.execute_filtered(action_context, controller, arguments)
				.await?;
			return convert_filtered(mapper, executor, returned);
		}

		let returned = executor.execute(controller, arguments)?;
		if self.is_async() {
			// Completed returns skip the await.
			let returned = returned.resolve().await?;
			return match (self, returned) {
				(Self::Task | Self::Awaitable, MethodReturn::Unit) => Ok(EmptyResult::shared()),
				(Self::AwaitableOfActionResult, MethodReturn::Result(result)) => {
					require_result(result, return_type)
				}
				(Self::AwaitableOfObject, MethodReturn::Value(value)) => {
					convert_value(mapper, value, return_type)
				}
				(_, other) => Err(mismatch(executor, &other)),
			};
		}

		match (self, returned) {
			(Self::Void, MethodReturn::Unit) => Ok(EmptyResult::shared()),
			(Self::SyncActionResult, MethodReturn::Result(result)) => {
				require_result(result, return_type)
			}
			(Self::SyncObject, MethodReturn::Value(value)) => convert_value(mapper, value, return_type),
			(_, other) => Err(mismatch(executor, &other)),
		}
	}
}

/// Invocation filters may change what comes back, so any completed return is accepted.
fn convert_filtered(
	mapper: &dyn ActionResultTypeMapper,
	executor: &ObjectMethodExecutor,
	returned: MethodReturn,
) -> Result<ActionResultRef> {
	let return_type = executor.return_type();
	match returned {
		MethodReturn::Unit => Ok(EmptyResult::shared()),
		MethodReturn::Result(result) => require_result(result, return_type),
		MethodReturn::Value(value) => convert_value(mapper, value, return_type),
		pending @ MethodReturn::Pending(_) => Err(mismatch(executor, &pending)),
	}
}

fn require_result(result: Option<ActionResultRef>, return_type: &ReturnType) -> Result<ActionResultRef> {
	result.ok_or_else(|| Error::NullActionResult {
		return_type: return_type.name().to_string(),
	})
}

fn convert_value(
	mapper: &dyn ActionResultTypeMapper,
	value: Value,
	return_type: &ReturnType,
) -> Result<ActionResultRef> {
	require_result(mapper.convert(value, return_type), return_type)
}

fn mismatch(executor: &ObjectMethodExecutor, returned: &MethodReturn) -> Error {
	Error::ReturnShapeMismatch {
		method: executor.signature().name.clone(),
		declared: executor.return_type().name().to_string(),
		actual: returned.describe(),
	}
}
