//! Controllers: creation, release, argument binding and the descriptor metadata
//! that ties an action to its handler.

use crate::filters::{Filter, FilterDescriptor, FilterScope};
use crate::method::{HandlerInvocationFilter, HandlerMethod, ParameterInfo};
use async_trait::async_trait;
use ravel_actions::ActionContext;
use ravel_actions::values::ValueDictionary;
use ravel_core::exception::Result;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A constructed controller instance.
pub type ControllerInstance = Arc<dyn Any + Send + Sync>;

/// Bound action arguments, keyed case-insensitively by parameter name.
pub type ActionArguments = ValueDictionary;

/// Creates and releases controller instances.
///
/// The invoker calls `release_controller` exactly once for every instance that
/// `create_controller` produced, whatever the outcome of the request.
#[async_trait]
pub trait ControllerFactory: Send + Sync {
	fn create_controller(&self, context: &ActionContext) -> Result<ControllerInstance>;

	async fn release_controller(
		&self,
		_context: &ActionContext,
		_controller: ControllerInstance,
	) -> Result<()> {
		Ok(())
	}
}

/// Creates controllers through `T::default()`.
pub struct DefaultControllerFactory<T> {
	_marker: PhantomData<fn() -> T>,
}

impl<T> DefaultControllerFactory<T> {
	pub fn new() -> Self {
		Self {
			_marker: PhantomData,
		}
	}
}

impl<T> Default for DefaultControllerFactory<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> fmt::Debug for DefaultControllerFactory<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DefaultControllerFactory")
			.field("controller", &std::any::type_name::<T>())
			.finish()
	}
}

#[async_trait]
impl<T> ControllerFactory for DefaultControllerFactory<T>
where
	T: Default + Send + Sync + 'static,
{
	fn create_controller(&self, _context: &ActionContext) -> Result<ControllerInstance> {
		Ok(Arc::new(T::default()))
	}
}

type CreateFn = dyn Fn(&ActionContext) -> Result<ControllerInstance> + Send + Sync;

/// Creates controllers with a closure.
pub struct FnControllerFactory {
	create: Box<CreateFn>,
}

impl FnControllerFactory {
	pub fn new<F>(create: F) -> Self
	where
		F: Fn(&ActionContext) -> Result<ControllerInstance> + Send + Sync + 'static,
	{
		Self {
			create: Box::new(create),
		}
	}
}

#[async_trait]
impl ControllerFactory for FnControllerFactory {
	fn create_controller(&self, context: &ActionContext) -> Result<ControllerInstance> {
		(self.create)(context)
	}
}

/// Fills [`ActionArguments`] for a controller before action filters run.
#[async_trait]
pub trait ControllerArgumentBinder: Send + Sync {
	async fn bind_arguments(
		&self,
		context: &ActionContext,
		controller: &ControllerInstance,
		parameters: &[ParameterInfo],
		arguments: &mut ActionArguments,
	) -> Result<()>;
}

/// Binds each parameter from the route value of the same name.
///
/// Parameters without a matching route value are left unbound so that their
/// declared default applies.
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteValueArgumentBinder;

#[async_trait]
impl ControllerArgumentBinder for RouteValueArgumentBinder {
	async fn bind_arguments(
		&self,
		context: &ActionContext,
		_controller: &ControllerInstance,
		parameters: &[ParameterInfo],
		arguments: &mut ActionArguments,
	) -> Result<()> {
		for parameter in parameters {
			if let Some(value) = context.route_data.values.get(&parameter.name) {
				arguments.insert(parameter.name.clone(), value.clone());
			}
		}
		Ok(())
	}
}

/// Everything needed to run a controller-backed action.
///
/// Stored as typed metadata on the action descriptor:
///
/// ```
/// use ravel_actions::ActionDescriptor;
/// use ravel_invoker::controller::{ControllerAction, DefaultControllerFactory};
/// use ravel_invoker::method::{HandlerMethod, MethodReturn, MethodSignature, ReturnType};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct HomeController;
///
/// let action = ControllerAction::new(
/// 	HandlerMethod::new(MethodSignature::new("Index", ReturnType::unit()), |_, _| {
/// 		Ok(MethodReturn::Unit)
/// 	}),
/// 	Arc::new(DefaultControllerFactory::<HomeController>::new()),
/// );
/// let descriptor = ActionDescriptor::builder("Home.Index")
/// 	.route_value("controller", "Home")
/// 	.route_value("action", "Index")
/// 	.metadata(action)
/// 	.build();
/// assert!(descriptor.metadata::<ControllerAction>().is_some());
/// ```
#[derive(Clone)]
pub struct ControllerAction {
	pub method: HandlerMethod,
	pub controller_factory: Arc<dyn ControllerFactory>,
	pub argument_binder: Option<Arc<dyn ControllerArgumentBinder>>,
	pub filters: Vec<FilterDescriptor>,
	pub invocation_filters: Vec<Arc<dyn HandlerInvocationFilter>>,
}

impl ControllerAction {
	pub fn new(method: HandlerMethod, controller_factory: Arc<dyn ControllerFactory>) -> Self {
		Self {
			method,
			controller_factory,
			argument_binder: None,
			filters: Vec::new(),
			invocation_filters: Vec::new(),
		}
	}

	pub fn with_argument_binder(mut self, binder: Arc<dyn ControllerArgumentBinder>) -> Self {
		self.argument_binder = Some(binder);
		self
	}

	pub fn with_filter_descriptor(mut self, descriptor: FilterDescriptor) -> Self {
		self.filters.push(descriptor);
		self
	}

	/// Add a filter instance at action scope
	pub fn with_filter(self, filter: Arc<dyn Filter>) -> Self {
		self.with_filter_descriptor(FilterDescriptor::instance(filter, FilterScope::ACTION))
	}

	pub fn with_invocation_filter(mut self, filter: Arc<dyn HandlerInvocationFilter>) -> Self {
		self.invocation_filters.push(filter);
		self
	}
}

impl fmt::Debug for ControllerAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ControllerAction")
			.field("method", &self.method)
			.field("filters", &self.filters.len())
			.field("invocation_filters", &self.invocation_filters.len())
			.finish_non_exhaustive()
	}
}
