//! End-to-end dispatch through the `ravel` facade
//!
//! Tests cover:
//! - HTTP method constraints choosing between actions sharing route values
//! - Handler values rendered as JSON object results
//! - Asynchronous action filters wrapping the handler
//! - Settings loaded from TOML driving selection

use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use ravel::{Error, MvcSettings};
use ravel_integration_tests::{catalogue_route_handler, product_route_context};
use rstest::rstest;
use serde_json::{Value, json};

#[rstest]
#[tokio::test]
async fn test_get_renders_product_as_json() {
	// Arrange
	let handler = catalogue_route_handler(MvcSettings::default());
	let context = product_route_context(Method::GET);

	// Act
	let handled = handler.route_async(&context).await.unwrap();

	// Assert
	assert!(handled);
	let response = context.http_context.response();
	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(
		response.headers.get(CONTENT_TYPE).unwrap(),
		"application/json"
	);
	assert_eq!(response.headers.get("x-served-by").unwrap(), "ravel");
	let body: Value = serde_json::from_slice(&response.body).unwrap();
	assert_eq!(body, json!({ "id": "7", "name": "lamp" }));
}

#[rstest]
#[tokio::test]
async fn test_delete_selects_other_action() {
	// Arrange
	let handler = catalogue_route_handler(MvcSettings::default());
	let context = product_route_context(Method::DELETE);

	// Act
	let handled = handler.route_async(&context).await.unwrap();

	// Assert
	assert!(handled);
	let response = context.http_context.response();
	assert_eq!(response.status, StatusCode::NO_CONTENT);
	assert!(response.headers.get("x-served-by").is_none());
}

#[rstest]
#[tokio::test]
async fn test_unsupported_method_is_declined() {
	// Arrange
	let handler = catalogue_route_handler(MvcSettings::default());
	let context = product_route_context(Method::PUT);

	// Act
	let handled = handler.route_async(&context).await.unwrap();

	// Assert
	assert!(!handled);
}

#[rstest]
#[tokio::test]
async fn test_ignoring_method_constraints_makes_selection_ambiguous() {
	// Arrange
	let settings = MvcSettings::from_toml_str("respect_http_method_constraints = false").unwrap();
	let handler = catalogue_route_handler(settings);
	let context = product_route_context(Method::GET);

	// Act
	let error = handler.route_async(&context).await.unwrap_err();

	// Assert
	assert!(matches!(error, Error::AmbiguousAction { .. }));
}
