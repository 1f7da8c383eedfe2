//! Handler method metadata and the raw method call.
//!
//! A handler is described by a [`MethodSignature`] (name, parameters and the
//! declared return shape) and a type-erased callable. The callable receives
//! the controller instance and the ordered argument list and reports what it
//! produced as a [`MethodReturn`].

use crate::controller::ControllerInstance;
use crate::result::ActionResultRef;
use async_trait::async_trait;
use futures::future::BoxFuture;
use ravel_actions::ActionContext;
use ravel_core::exception::Result;
use serde_json::Value;
use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// The declared return shape of a handler method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnKind {
	/// Returns nothing
	Unit,
	/// Returns an action result
	ActionResult,
	/// Returns an arbitrary serializable value
	Object,
	/// Returns a bare task: a boxed future with no output
	Task,
	/// Returns some other future whose output has the inner shape
	Awaitable(Box<ReturnKind>),
}

impl ReturnKind {
	pub fn is_async(&self) -> bool {
		matches!(self, Self::Task | Self::Awaitable(_))
	}
}

/// A declared return type: its display name plus its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnType {
	name: String,
	kind: ReturnKind,
}

impl ReturnType {
	pub fn new(name: impl Into<String>, kind: ReturnKind) -> Self {
		Self {
			name: name.into(),
			kind,
		}
	}

	pub fn unit() -> Self {
		Self::new("()", ReturnKind::Unit)
	}

	pub fn action_result() -> Self {
		Self::new("ActionResultRef", ReturnKind::ActionResult)
	}

	pub fn object<T: ?Sized>() -> Self {
		Self::new(type_name::<T>(), ReturnKind::Object)
	}

	pub fn task() -> Self {
		Self::new("Task", ReturnKind::Task)
	}

	pub fn future_unit() -> Self {
		Self::new(
			"impl Future<Output = ()>",
			ReturnKind::Awaitable(Box::new(ReturnKind::Unit)),
		)
	}

	pub fn future_action_result() -> Self {
		Self::new(
			"impl Future<Output = ActionResultRef>",
			ReturnKind::Awaitable(Box::new(ReturnKind::ActionResult)),
		)
	}

	pub fn future_object<T: ?Sized>() -> Self {
		Self::new(
			format!("impl Future<Output = {}>", type_name::<T>()),
			ReturnKind::Awaitable(Box::new(ReturnKind::Object)),
		)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn kind(&self) -> &ReturnKind {
		&self.kind
	}
}

impl fmt::Display for ReturnType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

/// A handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
	pub name: String,
	/// Used when binding produced no value for the parameter
	pub default_value: Option<Value>,
}

impl ParameterInfo {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			default_value: None,
		}
	}

	pub fn with_default(mut self, value: impl Into<Value>) -> Self {
		self.default_value = Some(value.into());
		self
	}
}

/// Name, parameters and return type of a handler method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
	pub name: String,
	pub parameters: Vec<ParameterInfo>,
	pub return_type: ReturnType,
}

impl MethodSignature {
	pub fn new(name: impl Into<String>, return_type: ReturnType) -> Self {
		Self {
			name: name.into(),
			parameters: Vec::new(),
			return_type,
		}
	}

	pub fn parameter(mut self, parameter: ParameterInfo) -> Self {
		self.parameters.push(parameter);
		self
	}
}

/// What a handler call produced.
pub enum MethodReturn {
	Unit,
	/// An action result; `None` models a handler that returned no result
	Result(Option<ActionResultRef>),
	Value(Value),
	/// The call is still running
	Pending(BoxFuture<'static, Result<MethodReturn>>),
}

impl MethodReturn {
	pub fn result(result: ActionResultRef) -> Self {
		Self::Result(Some(result))
	}

	pub fn pending<F>(future: F) -> Self
	where
		F: Future<Output = Result<MethodReturn>> + Send + 'static,
	{
		Self::Pending(Box::pin(future))
	}

	pub(crate) fn describe(&self) -> &'static str {
		match self {
			Self::Unit => "no value",
			Self::Result(Some(_)) => "an action result",
			Self::Result(None) => "no action result",
			Self::Value(_) => "a value",
			Self::Pending(_) => "a pending future",
		}
	}

	/// Await a pending return; completed returns are passed through.
	pub async fn resolve(self) -> Result<MethodReturn> {
		match self {
			Self::Pending(future) => future.await,
			completed => Ok(completed),
		}
	}
}

impl fmt::Debug for MethodReturn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Unit => f.write_str("Unit"),
			Self::Result(result) => f.debug_tuple("Result").field(result).finish(),
			Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Self::Pending(_) => f.write_str("Pending"),
		}
	}
}

/// Type-erased handler call.
pub type MethodCallable =
	Arc<dyn Fn(ControllerInstance, Vec<Value>) -> Result<MethodReturn> + Send + Sync>;

/// A handler method: signature plus callable.
#[derive(Clone)]
pub struct HandlerMethod {
	signature: MethodSignature,
	callable: MethodCallable,
}

impl HandlerMethod {
	/// # Examples
	///
	/// ```
	/// use ravel_invoker::method::{HandlerMethod, MethodReturn, MethodSignature, ReturnType};
	/// use serde_json::json;
	///
	/// let method = HandlerMethod::new(
	/// 	MethodSignature::new("Count", ReturnType::object::<u32>()),
	/// 	|_controller, _arguments| Ok(MethodReturn::Value(json!(3))),
	/// );
	/// assert_eq!(method.signature().name, "Count");
	/// ```
	pub fn new<F>(signature: MethodSignature, callable: F) -> Self
	where
		F: Fn(ControllerInstance, Vec<Value>) -> Result<MethodReturn> + Send + Sync + 'static,
	{
		Self {
			signature,
			callable: Arc::new(callable),
		}
	}

	pub fn signature(&self) -> &MethodSignature {
		&self.signature
	}

	pub fn call(&self, controller: ControllerInstance, arguments: Vec<Value>) -> Result<MethodReturn> {
		(self.callable)(controller, arguments)
	}
}

impl fmt::Debug for HandlerMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HandlerMethod")
			.field("signature", &self.signature)
			.finish_non_exhaustive()
	}
}

/// State visible to handler invocation filters.
pub struct HandlerInvocationContext {
	pub action_context: ActionContext,
	pub controller: ControllerInstance,
	/// Arguments in parameter order; filters may rewrite them
	pub arguments: Vec<Value>,
}

/// Wraps the raw handler call.
///
/// Filters run in registration order. Each receives the rest of the chain as
/// `next`; the last link calls the handler and awaits it.
#[async_trait]
pub trait HandlerInvocationFilter: Send + Sync {
	async fn invoke(
		&self,
		context: &mut HandlerInvocationContext,
		next: HandlerInvocationNext<'_>,
	) -> Result<MethodReturn>;
}

/// The remainder of a handler invocation filter chain.
pub struct HandlerInvocationNext<'a> {
	filters: &'a [Arc<dyn HandlerInvocationFilter>],
	method: &'a HandlerMethod,
}

impl<'a> HandlerInvocationNext<'a> {
	pub async fn run(self, context: &mut HandlerInvocationContext) -> Result<MethodReturn> {
		match self.filters.split_first() {
			Some((filter, rest)) => {
				let next = HandlerInvocationNext {
					filters: rest,
					method: self.method,
				};
				filter.invoke(context, next).await
			}
			None => {
				self.method
					.call(Arc::clone(&context.controller), context.arguments.clone())?
					.resolve()
					.await
			}
		}
	}
}

/// Calls a handler method, through its invocation filters when it has any.
#[derive(Clone)]
pub struct ObjectMethodExecutor {
	method: HandlerMethod,
	filters: Arc<[Arc<dyn HandlerInvocationFilter>]>,
}

impl ObjectMethodExecutor {
	pub fn new(method: HandlerMethod, filters: Vec<Arc<dyn HandlerInvocationFilter>>) -> Self {
		Self {
			method,
			filters: filters.into(),
		}
	}

	pub fn signature(&self) -> &MethodSignature {
		self.method.signature()
	}

	pub fn parameters(&self) -> &[ParameterInfo] {
		&self.method.signature().parameters
	}

	pub fn return_type(&self) -> &ReturnType {
		&self.method.signature().return_type
	}

	pub fn has_filters(&self) -> bool {
		!self.filters.is_empty()
	}

	/// Default for the parameter at `index`, or `null`
	pub fn default_value_for_parameter(&self, index: usize) -> Value {
		self.parameters()
			.get(index)
			.and_then(|parameter| parameter.default_value.clone())
			.unwrap_or(Value::Null)
	}

	/// Call the raw method. The return may still be pending.
	pub fn execute(&self, controller: ControllerInstance, arguments: Vec<Value>) -> Result<MethodReturn> {
		self.method.call(controller, arguments)
	}

	/// Run the invocation filter chain around the method. The return is always completed.
	pub async fn execute_filtered(
		&self,
		action_context: &ActionContext,
		controller: ControllerInstance,
		arguments: Vec<Value>,
	) -> Result<MethodReturn> {
		let mut context = HandlerInvocationContext {
			action_context: action_context.clone(),
			controller,
			arguments,
		};
		let next = HandlerInvocationNext {
			filters: &self.filters,
			method: &self.method,
		};
		next.run(&mut context).await
	}
}

impl fmt::Debug for ObjectMethodExecutor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ObjectMethodExecutor")
			.field("method", &self.method)
			.field("filters", &self.filters.len())
			.finish()
	}
}
