//! Entry point from the router: select an action, then invoke it.

use crate::factory::ActionInvokerFactory;
use crate::options::MvcOptions;
use ravel_actions::{ActionContext, ActionDescriptorCollectionProvider, ActionSelector, RouteContext};
use ravel_core::exception::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Handles a routed request by running the matching controller action.
///
/// ```
/// use ravel_actions::prelude::*;
/// use ravel_http::{HttpContext, Request};
/// use ravel_invoker::prelude::*;
/// use http::{Method, Uri};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct HomeController;
///
/// let method = HandlerMethod::new(
/// 	MethodSignature::new("Index", ReturnType::action_result()),
/// 	|_, _| Ok(MethodReturn::result(Arc::new(ContentResult::new("hello")))),
/// );
/// let index = Arc::new(
/// 	ActionDescriptor::builder("Home.Index")
/// 		.route_value("controller", "Home")
/// 		.route_value("action", "Index")
/// 		.metadata(ControllerAction::new(method, Arc::new(DefaultControllerFactory::<HomeController>::new())))
/// 		.build(),
/// );
/// let provider = DefaultActionDescriptorCollectionProvider::new(
/// 	vec![Arc::new(StaticActionDescriptorProvider::new(0, vec![index]))],
/// 	vec![],
/// );
/// let handler = MvcRouteHandler::new(provider, Arc::new(MvcOptions::default()));
///
/// let http_context = HttpContext::new(Request::new(Method::GET, Uri::from_static("/")));
/// let route_context = RouteContext::new(
/// 	http_context.clone(),
/// 	RouteData::new(RouteValueDictionary::from([("controller", "Home"), ("action", "Index")])),
/// );
/// let handled = tokio_test::block_on(handler.route_async(&route_context)).unwrap();
///
/// assert!(handled);
/// assert_eq!(http_context.response().body, "hello");
/// ```
pub struct MvcRouteHandler {
	selector: ActionSelector,
	invoker_factory: ActionInvokerFactory,
}

impl MvcRouteHandler {
	pub fn new(
		collection_provider: Arc<dyn ActionDescriptorCollectionProvider>,
		options: Arc<MvcOptions>,
	) -> Self {
		let selector = ActionSelector::new(Arc::clone(&collection_provider), options.settings.clone());
		let invoker_factory = ActionInvokerFactory::new(collection_provider, options);
		Self {
			selector,
			invoker_factory,
		}
	}

	pub fn selector(&self) -> &ActionSelector {
		&self.selector
	}

	pub fn invoker_factory(&self) -> &ActionInvokerFactory {
		&self.invoker_factory
	}

	/// Returns `Ok(false)` when no action matches, leaving the request to the next route.
	pub async fn route_async(&self, route_context: &RouteContext) -> Result<bool> {
		let candidates = self.selector.select_candidates(route_context);
		if candidates.is_empty() {
			return Ok(false);
		}

		let Some(action) = self
			.selector
			.select_best_candidate(route_context, &candidates)?
		else {
			return Ok(false);
		};

		let action_context = ActionContext::from_route(route_context, Arc::clone(&action));
		let Some(invoker) = self.invoker_factory.create_invoker(action_context)? else {
			return Err(Error::Internal(format!(
				"An action invoker could not be created for action '{}'.",
				action.display_name()
			)));
		};

		tracing::debug!(
			action = %action.display_name(),
			path = %route_context.http_context.request().path(),
			"route matched action"
		);
		invoker.invoke().await?;
		Ok(true)
	}
}

impl fmt::Debug for MvcRouteHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MvcRouteHandler")
			.field("invoker_factory", &self.invoker_factory)
			.finish_non_exhaustive()
	}
}
