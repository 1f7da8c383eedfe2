use crate::descriptor::ActionDescriptor;
use crate::route::{RouteContext, RouteData};
use ravel_http::HttpContext;
use std::sync::Arc;

/// The selected action together with the request it runs for.
///
/// Passed explicitly to every filter, handler and result; there is no
/// ambient "current action" accessor.
#[derive(Debug, Clone)]
pub struct ActionContext {
	pub http_context: HttpContext,
	pub route_data: RouteData,
	pub action_descriptor: Arc<ActionDescriptor>,
}

impl ActionContext {
	pub fn new(
		http_context: HttpContext,
		route_data: RouteData,
		action_descriptor: Arc<ActionDescriptor>,
	) -> Self {
		Self {
			http_context,
			route_data,
			action_descriptor,
		}
	}

	/// Build the context for an action chosen from `route_context`
	pub fn from_route(route_context: &RouteContext, action_descriptor: Arc<ActionDescriptor>) -> Self {
		Self::new(
			route_context.http_context.clone(),
			route_context.route_data.clone(),
			action_descriptor,
		)
	}
}
