//! Shared fixtures for cross-crate integration tests.
//!
//! The fixtures describe a small product catalogue: a `Products` controller
//! with a `GET` action rendering a product as JSON and a `DELETE` action
//! answering `204 No Content`. Both actions share the same route values, so
//! only the HTTP method tells them apart.

use async_trait::async_trait;
use http::header::HeaderValue;
use http::{Method, StatusCode, Uri};
use ravel::invoker::filters::ActionNext;
use ravel::prelude::*;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Products;

pub struct Product;

/// Adds an `x-served-by` response header once the handler ran.
pub struct ServedBy;

#[async_trait]
impl AsyncActionFilter for ServedBy {
	async fn on_action_execution(&self, mut next: ActionNext<'_>) -> Result<()> {
		next.run().await?;
		next.action_context()
			.http_context
			.response_mut()
			.headers
			.insert("x-served-by", HeaderValue::from_static("ravel"));
		Ok(())
	}
}

impl Filter for ServedBy {
	fn as_async_action(&self) -> Option<&dyn AsyncActionFilter> {
		Some(self)
	}
}

/// `GET`: renders `{ "id": <route id>, "name": "lamp" }`.
pub fn show_product() -> ActionDescriptor {
	let handler = HandlerMethod::new(
		MethodSignature::new("Show", ReturnType::object::<Product>())
			.parameter(ParameterInfo::new("id")),
		|_, arguments| Ok(MethodReturn::Value(json!({ "id": arguments[0], "name": "lamp" }))),
	);
	let action = ControllerAction::new(handler, Arc::new(DefaultControllerFactory::<Products>::new()))
		.with_filter(Arc::new(ServedBy));
	ActionDescriptor::builder("Products.Show")
		.route_value("controller", "Products")
		.route_value("action", "Item")
		.http_methods(["GET"])
		.metadata(action)
		.build()
}

/// `DELETE`: answers `204 No Content`.
pub fn delete_product() -> ActionDescriptor {
	let handler = HandlerMethod::new(
		MethodSignature::new("Delete", ReturnType::action_result()),
		|_, _| {
			Ok(MethodReturn::result(Arc::new(StatusCodeResult::new(
				StatusCode::NO_CONTENT,
			))))
		},
	);
	let action = ControllerAction::new(handler, Arc::new(DefaultControllerFactory::<Products>::new()));
	ActionDescriptor::builder("Products.Delete")
		.route_value("controller", "Products")
		.route_value("action", "Item")
		.http_methods(["DELETE"])
		.metadata(action)
		.build()
}

/// A route handler serving the product catalogue.
pub fn catalogue_route_handler(settings: MvcSettings) -> MvcRouteHandler {
	let provider = DefaultActionDescriptorCollectionProvider::new(
		vec![Arc::new(StaticActionDescriptorProvider::new(
			0,
			vec![Arc::new(show_product()), Arc::new(delete_product())],
		))],
		vec![],
	);
	MvcRouteHandler::new(provider, Arc::new(MvcOptions::new(settings)))
}

/// Route context for `/products/item/7` with the given method.
pub fn product_route_context(method: Method) -> RouteContext {
	RouteContext::new(
		HttpContext::new(Request::new(method, Uri::from_static("/products/item/7"))),
		RouteData::new(RouteValueDictionary::from([
			("controller", "products"),
			("action", "item"),
			("id", "7"),
		])),
	)
}
