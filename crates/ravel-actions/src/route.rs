use crate::values::RouteValueDictionary;
use ravel_http::HttpContext;

/// Values produced by the (external) router for the current request.
#[derive(Debug, Clone, Default)]
pub struct RouteData {
	pub values: RouteValueDictionary,
}

impl RouteData {
	pub fn new(values: RouteValueDictionary) -> Self {
		Self { values }
	}
}

/// Input to action selection: the request plus its route values.
#[derive(Debug, Clone)]
pub struct RouteContext {
	pub http_context: HttpContext,
	pub route_data: RouteData,
}

impl RouteContext {
	pub fn new(http_context: HttpContext, route_data: RouteData) -> Self {
		Self {
			http_context,
			route_data,
		}
	}
}
