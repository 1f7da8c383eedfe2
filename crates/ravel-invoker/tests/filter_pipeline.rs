//! Integration tests for the controller action filter pipeline
//!
//! Tests cover:
//! - Stage ordering and filter ordering by order and scope
//! - Authorization and resource short-circuits
//! - Protocol violations of asynchronous continuations
//! - Exception filters and error capture by resource and action filters
//! - Result filter cancellation and result replacement

mod helpers;

use async_trait::async_trait;
use helpers::{CountingFactory, Log, LoggedResult, body, failing_handler, invoke, ok_handler};
use http::StatusCode;
use ravel_core::exception::{Error, Result};
use ravel_invoker::filters::{
	ActionExecutedContext, ActionExecutingContext, ActionNext, AuthorizationFilterContext,
	ExceptionContext, ResourceExecutingContext, ResourceNext, ResultExecutedContext,
	ResultExecutingContext, ResultNext,
};
use ravel_invoker::prelude::*;
use rstest::rstest;
use std::sync::Arc;

// ===== Filters =====

struct Authorize {
	log: Log,
	deny: bool,
}

impl AuthorizationFilter for Authorize {
	fn on_authorization(&self, context: &mut AuthorizationFilterContext) -> Result<()> {
		self.log.push("authorization");
		if self.deny {
			context.result = Some(StatusCodeResult::forbidden());
		}
		Ok(())
	}
}

impl Filter for Authorize {
	fn as_authorization(&self) -> Option<&dyn AuthorizationFilter> {
		Some(self)
	}
}

/// Wraps the rest of the pipeline and records what it saw on the way out.
struct WrapResource {
	log: Log,
	name: &'static str,
	handle: bool,
}

#[async_trait]
impl AsyncResourceFilter for WrapResource {
	async fn on_resource_execution(&self, mut next: ResourceNext<'_>) -> Result<()> {
		self.log.push(format!("{}:before", self.name));
		let executed = next.run().await?;
		let error = executed
			.exception
			.as_ref()
			.map(ToString::to_string)
			.unwrap_or_default();
		self.log.push(format!(
			"{}:after canceled={} error={}",
			self.name, executed.canceled, error
		));
		if self.handle && executed.exception.is_some() {
			executed.exception_handled = true;
		}
		Ok(())
	}
}

impl Filter for WrapResource {
	fn as_async_resource(&self) -> Option<&dyn AsyncResourceFilter> {
		Some(self)
	}
}

struct ShortCircuitResource {
	log: Log,
}

impl ResourceFilter for ShortCircuitResource {
	fn on_resource_executing(&self, context: &mut ResourceExecutingContext) -> Result<()> {
		self.log.push("short");
		context.result = Some(LoggedResult::shared(&self.log, "short"));
		Ok(())
	}
}

impl Filter for ShortCircuitResource {
	fn as_resource(&self) -> Option<&dyn ResourceFilter> {
		Some(self)
	}
}

/// Sets a result and still calls next.
struct DualSignalResource {
	log: Log,
	swallow: bool,
}

#[async_trait]
impl AsyncResourceFilter for DualSignalResource {
	async fn on_resource_execution(&self, mut next: ResourceNext<'_>) -> Result<()> {
		next.context_mut().result = Some(LoggedResult::shared(&self.log, "short"));
		let outcome = next.run().await.map(|_| ());
		if self.swallow {
			return Ok(());
		}
		outcome
	}
}

impl Filter for DualSignalResource {
	fn as_async_resource(&self) -> Option<&dyn AsyncResourceFilter> {
		Some(self)
	}
}

struct TwiceResource;

#[async_trait]
impl AsyncResourceFilter for TwiceResource {
	async fn on_resource_execution(&self, mut next: ResourceNext<'_>) -> Result<()> {
		next.run().await?;
		next.run().await?;
		Ok(())
	}
}

impl Filter for TwiceResource {
	fn as_async_resource(&self) -> Option<&dyn AsyncResourceFilter> {
		Some(self)
	}
}

struct LogAction {
	log: Log,
	name: &'static str,
	order: i32,
}

impl ActionFilter for LogAction {
	fn on_action_executing(&self, _context: &mut ActionExecutingContext) -> Result<()> {
		self.log.push(format!("{}:executing", self.name));
		Ok(())
	}

	fn on_action_executed(&self, _context: &mut ActionExecutedContext) -> Result<()> {
		self.log.push(format!("{}:executed", self.name));
		Ok(())
	}
}

impl Filter for LogAction {
	fn order(&self) -> i32 {
		self.order
	}

	fn as_action(&self) -> Option<&dyn ActionFilter> {
		Some(self)
	}
}

struct ShortCircuitAction {
	log: Log,
}

impl ActionFilter for ShortCircuitAction {
	fn on_action_executing(&self, context: &mut ActionExecutingContext) -> Result<()> {
		context.result = Some(LoggedResult::shared(&self.log, "short"));
		Ok(())
	}
}

impl Filter for ShortCircuitAction {
	fn as_action(&self) -> Option<&dyn ActionFilter> {
		Some(self)
	}
}

struct DualSignalAction {
	log: Log,
}

#[async_trait]
impl AsyncActionFilter for DualSignalAction {
	async fn on_action_execution(&self, mut next: ActionNext<'_>) -> Result<()> {
		next.context_mut().result = Some(LoggedResult::shared(&self.log, "short"));
		next.run().await?;
		Ok(())
	}
}

impl Filter for DualSignalAction {
	fn as_async_action(&self) -> Option<&dyn AsyncActionFilter> {
		Some(self)
	}
}

/// Turns a handler error into a result.
struct RecoverAction {
	log: Log,
}

impl ActionFilter for RecoverAction {
	fn on_action_executing(&self, _context: &mut ActionExecutingContext) -> Result<()> {
		Ok(())
	}

	fn on_action_executed(&self, context: &mut ActionExecutedContext) -> Result<()> {
		if let Some(error) = &context.exception {
			self.log.push(format!("recovered:{error}"));
			context.exception_handled = true;
			context.result = Some(LoggedResult::shared(&self.log, "recovered"));
		}
		Ok(())
	}
}

impl Filter for RecoverAction {
	fn as_action(&self) -> Option<&dyn ActionFilter> {
		Some(self)
	}
}

/// Offers both forms of the action capability.
struct BothForms {
	log: Log,
}

impl ActionFilter for BothForms {
	fn on_action_executing(&self, _context: &mut ActionExecutingContext) -> Result<()> {
		self.log.push("sync");
		Ok(())
	}
}

#[async_trait]
impl AsyncActionFilter for BothForms {
	async fn on_action_execution(&self, mut next: ActionNext<'_>) -> Result<()> {
		self.log.push("async");
		next.run().await?;
		Ok(())
	}
}

impl Filter for BothForms {
	fn as_action(&self) -> Option<&dyn ActionFilter> {
		Some(self)
	}

	fn as_async_action(&self) -> Option<&dyn AsyncActionFilter> {
		Some(self)
	}
}

struct HandleException {
	log: Log,
	handle: bool,
}

impl ExceptionFilter for HandleException {
	fn on_exception(&self, context: &mut ExceptionContext) -> Result<()> {
		if let Some(error) = &context.exception {
			self.log.push(format!("exception:{error}"));
		}
		if self.handle {
			context.result = Some(LoggedResult::shared(&self.log, "handled"));
		}
		Ok(())
	}
}

impl Filter for HandleException {
	fn as_exception(&self) -> Option<&dyn ExceptionFilter> {
		Some(self)
	}
}

struct AsyncHandleException {
	log: Log,
}

#[async_trait]
impl AsyncExceptionFilter for AsyncHandleException {
	async fn on_exception(&self, context: &mut ExceptionContext) -> Result<()> {
		self.log.push("async-exception");
		context.exception_handled = true;
		Ok(())
	}
}

impl Filter for AsyncHandleException {
	fn as_async_exception(&self) -> Option<&dyn AsyncExceptionFilter> {
		Some(self)
	}
}

struct LogResult {
	log: Log,
	name: &'static str,
	always_run: bool,
}

impl ResultFilter for LogResult {
	fn on_result_executing(&self, _context: &mut ResultExecutingContext) -> Result<()> {
		self.log.push(format!("{}:executing", self.name));
		Ok(())
	}

	fn on_result_executed(&self, _context: &mut ResultExecutedContext) -> Result<()> {
		self.log.push(format!("{}:executed", self.name));
		Ok(())
	}
}

impl Filter for LogResult {
	fn always_run(&self) -> bool {
		self.always_run
	}

	fn as_result(&self) -> Option<&dyn ResultFilter> {
		Some(self)
	}
}

struct CancelResult;

impl ResultFilter for CancelResult {
	fn on_result_executing(&self, context: &mut ResultExecutingContext) -> Result<()> {
		context.cancel = true;
		Ok(())
	}
}

impl Filter for CancelResult {
	fn as_result(&self) -> Option<&dyn ResultFilter> {
		Some(self)
	}
}

struct ReplaceResult {
	log: Log,
}

#[async_trait]
impl AsyncResultFilter for ReplaceResult {
	async fn on_result_execution(&self, mut next: ResultNext<'_>) -> Result<()> {
		next.context_mut().result = LoggedResult::shared(&self.log, "replaced");
		next.run().await?;
		Ok(())
	}
}

impl Filter for ReplaceResult {
	fn as_async_result(&self) -> Option<&dyn AsyncResultFilter> {
		Some(self)
	}
}

struct CancelThenNext;

#[async_trait]
impl AsyncResultFilter for CancelThenNext {
	async fn on_result_execution(&self, mut next: ResultNext<'_>) -> Result<()> {
		next.context_mut().cancel = true;
		next.run().await?;
		Ok(())
	}
}

impl Filter for CancelThenNext {
	fn as_async_result(&self) -> Option<&dyn AsyncResultFilter> {
		Some(self)
	}
}

fn counting_factory() -> Arc<CountingFactory> {
	Arc::new(CountingFactory::default())
}

// ===== Ordering Tests =====

#[rstest]
#[tokio::test]
async fn test_stages_run_in_pipeline_order() {
	// Arrange
	let log = Log::default();
	let action = ControllerAction::new(ok_handler(&log), counting_factory())
		.with_filter(Arc::new(LogResult {
			log: log.clone(),
			name: "result-filter",
			always_run: false,
		}))
		.with_filter(Arc::new(LogAction {
			log: log.clone(),
			name: "action-filter",
			order: 0,
		}))
		.with_filter(Arc::new(WrapResource {
			log: log.clone(),
			name: "resource",
			handle: false,
		}))
		.with_filter(Arc::new(Authorize {
			log: log.clone(),
			deny: false,
		}));

	// Act
	let (outcome, http_context) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(outcome.is_ok());
	assert_eq!(body(&http_context), "ok");
	assert_eq!(
		log.entries(),
		vec![
			"authorization",
			"resource:before",
			"action-filter:executing",
			"handler",
			"action-filter:executed",
			"result-filter:executing",
			"result:ok",
			"result-filter:executed",
			"resource:after canceled=false error=",
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_filters_sort_by_order_then_scope() {
	// Arrange
	let log = Log::default();
	let mut options = MvcOptions::default();
	options.add_filter(Arc::new(LogAction {
		log: log.clone(),
		name: "global",
		order: 0,
	}));
	let action = ControllerAction::new(ok_handler(&log), counting_factory())
		.with_filter(Arc::new(LogAction {
			log: log.clone(),
			name: "action",
			order: 0,
		}))
		.with_filter(Arc::new(LogAction {
			log: log.clone(),
			name: "early",
			order: -1,
		}));

	// Act
	let (outcome, _) = invoke(action, options).await;

	// Assert
	assert!(outcome.is_ok());
	let executing: Vec<String> = log
		.entries()
		.into_iter()
		.filter(|entry| entry.ends_with(":executing"))
		.collect();
	assert_eq!(
		executing,
		vec!["early:executing", "global:executing", "action:executing"]
	);
}

#[rstest]
#[tokio::test]
async fn test_async_form_is_preferred_when_both_are_offered() {
	// Arrange
	let log = Log::default();
	let action = ControllerAction::new(ok_handler(&log), counting_factory())
		.with_filter(Arc::new(BothForms { log: log.clone() }));

	// Act
	let (outcome, _) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(outcome.is_ok());
	assert!(log.contains("async"));
	assert!(!log.contains("sync"));
}

// ===== Short-Circuit Tests =====

#[rstest]
#[tokio::test]
async fn test_authorization_short_circuit_runs_only_always_run_result_filters() {
	// Arrange
	let log = Log::default();
	let factory = counting_factory();
	let action = ControllerAction::new(ok_handler(&log), factory.clone())
		.with_filter(Arc::new(Authorize {
			log: log.clone(),
			deny: true,
		}))
		.with_filter(Arc::new(WrapResource {
			log: log.clone(),
			name: "resource",
			handle: false,
		}))
		.with_filter(Arc::new(LogAction {
			log: log.clone(),
			name: "action-filter",
			order: 0,
		}))
		.with_filter(Arc::new(HandleException {
			log: log.clone(),
			handle: true,
		}))
		.with_filter(Arc::new(LogResult {
			log: log.clone(),
			name: "ordinary",
			always_run: false,
		}))
		.with_filter(Arc::new(LogResult {
			log: log.clone(),
			name: "always",
			always_run: true,
		}));

	// Act
	let (outcome, http_context) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(outcome.is_ok());
	assert_eq!(http_context.response().status, StatusCode::FORBIDDEN);
	assert_eq!(
		log.entries(),
		vec!["authorization", "always:executing", "always:executed"]
	);
	assert_eq!(factory.created(), 0);
	assert_eq!(factory.released(), 0);
}

#[rstest]
#[tokio::test]
async fn test_resource_short_circuit_skips_action_and_cancels_outer_filter() {
	// Arrange
	let log = Log::default();
	let factory = counting_factory();
	let action = ControllerAction::new(ok_handler(&log), factory.clone())
		.with_filter(Arc::new(WrapResource {
			log: log.clone(),
			name: "outer",
			handle: false,
		}))
		.with_filter(Arc::new(ShortCircuitResource { log: log.clone() }))
		.with_filter(Arc::new(LogResult {
			log: log.clone(),
			name: "ordinary",
			always_run: false,
		}));

	// Act
	let (outcome, http_context) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(outcome.is_ok());
	assert_eq!(body(&http_context), "short");
	assert_eq!(
		log.entries(),
		vec![
			"outer:before",
			"short",
			"result:short",
			"outer:after canceled=true error=",
		]
	);
	assert_eq!(factory.created(), 0);
}

#[rstest]
#[tokio::test]
async fn test_action_short_circuit_skips_handler() {
	// Arrange
	let log = Log::default();
	let factory = counting_factory();
	let action = ControllerAction::new(ok_handler(&log), factory.clone())
		.with_filter(Arc::new(ShortCircuitAction { log: log.clone() }));

	// Act
	let (outcome, http_context) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(outcome.is_ok());
	assert_eq!(body(&http_context), "short");
	assert!(!log.contains("handler"));
	assert_eq!(factory.created(), 1);
	assert_eq!(factory.released(), 1);
}

// ===== Protocol Violation Tests =====

#[rstest]
#[case::propagated(false)]
#[case::swallowed(true)]
#[tokio::test]
async fn test_resource_result_and_next_is_fatal(#[case] swallow: bool) {
	// Arrange
	let log = Log::default();
	let factory = counting_factory();
	let action = ControllerAction::new(ok_handler(&log), factory.clone())
		.with_filter(Arc::new(DualSignalResource {
			log: log.clone(),
			swallow,
		}));

	// Act
	let (outcome, _) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(matches!(
		outcome,
		Err(Error::InvalidShortCircuit {
			delegate: "ResourceNext",
			..
		})
	));
	assert!(log.entries().is_empty());
	assert_eq!(factory.created(), 0);
}

#[rstest]
#[tokio::test]
async fn test_resource_violation_is_not_absorbed_by_outer_filter() {
	// Arrange
	let log = Log::default();
	let action = ControllerAction::new(ok_handler(&log), counting_factory())
		.with_filter(Arc::new(WrapResource {
			log: log.clone(),
			name: "outer",
			handle: true,
		}))
		.with_filter(Arc::new(DualSignalResource {
			log: log.clone(),
			swallow: false,
		}));

	// Act
	let (outcome, _) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(matches!(outcome, Err(Error::InvalidShortCircuit { .. })));
	assert_eq!(log.entries(), vec!["outer:before"]);
}

#[rstest]
#[tokio::test]
async fn test_action_result_and_next_is_fatal_and_releases_controller() {
	// Arrange
	let log = Log::default();
	let factory = counting_factory();
	let action = ControllerAction::new(ok_handler(&log), factory.clone())
		.with_filter(Arc::new(DualSignalAction { log: log.clone() }));

	// Act
	let (outcome, _) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(matches!(
		outcome,
		Err(Error::InvalidShortCircuit {
			filter: "AsyncActionFilter",
			delegate: "ActionNext",
			..
		})
	));
	assert!(!log.contains("handler"));
	assert_eq!(factory.created(), 1);
	assert_eq!(factory.released(), 1);
}

#[rstest]
#[tokio::test]
async fn test_result_cancel_and_next_is_invalid_cancellation() {
	// Arrange
	let log = Log::default();
	let action = ControllerAction::new(ok_handler(&log), counting_factory())
		.with_filter(Arc::new(CancelThenNext));

	// Act
	let (outcome, http_context) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(matches!(
		outcome,
		Err(Error::InvalidCancellation {
			property: "cancel",
			..
		})
	));
	assert!(!log.contains("result:ok"));
	assert!(http_context.response().body.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_next_called_twice_is_fatal() {
	// Arrange
	let log = Log::default();
	let factory = counting_factory();
	let action = ControllerAction::new(ok_handler(&log), factory.clone())
		.with_filter(Arc::new(TwiceResource));

	// Act
	let (outcome, _) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(matches!(
		outcome,
		Err(Error::NextCalledTwice {
			delegate: "ResourceNext",
			..
		})
	));
	let handled = log.entries().iter().filter(|entry| *entry == "handler").count();
	assert_eq!(handled, 1);
	assert_eq!(factory.released(), 1);
}

// ===== Exception Tests =====

#[rstest]
#[tokio::test]
async fn test_exception_filter_result_replaces_failed_action() {
	// Arrange
	let log = Log::default();
	let action = ControllerAction::new(failing_handler(&log), counting_factory())
		.with_filter(Arc::new(HandleException {
			log: log.clone(),
			handle: true,
		}))
		.with_filter(Arc::new(LogResult {
			log: log.clone(),
			name: "ordinary",
			always_run: false,
		}))
		.with_filter(Arc::new(LogResult {
			log: log.clone(),
			name: "always",
			always_run: true,
		}));

	// Act
	let (outcome, http_context) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(outcome.is_ok());
	assert_eq!(body(&http_context), "handled");
	assert_eq!(
		log.entries(),
		vec![
			"handler",
			"exception:boom",
			"always:executing",
			"result:handled",
			"always:executed",
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_async_exception_filter_marks_error_handled() {
	// Arrange
	let log = Log::default();
	let action = ControllerAction::new(failing_handler(&log), counting_factory())
		.with_filter(Arc::new(AsyncHandleException { log: log.clone() }));

	// Act
	let (outcome, http_context) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(outcome.is_ok());
	assert!(log.contains("async-exception"));
	assert!(http_context.response().body.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_unhandled_error_reaches_caller() {
	// Arrange
	let log = Log::default();
	let factory = counting_factory();
	let action = ControllerAction::new(failing_handler(&log), factory.clone())
		.with_filter(Arc::new(HandleException {
			log: log.clone(),
			handle: false,
		}))
		.with_filter(Arc::new(LogResult {
			log: log.clone(),
			name: "always",
			always_run: true,
		}));

	// Act
	let (outcome, _) = invoke(action, MvcOptions::default()).await;

	// Assert
	let error = outcome.unwrap_err();
	assert!(error.is_recoverable());
	assert_eq!(error.to_string(), "boom");
	assert_eq!(log.entries(), vec!["handler", "exception:boom"]);
	assert_eq!(factory.released(), 1);
}

#[rstest]
#[tokio::test]
async fn test_action_filter_recovers_from_handler_error() {
	// Arrange
	let log = Log::default();
	let action = ControllerAction::new(failing_handler(&log), counting_factory())
		.with_filter(Arc::new(RecoverAction { log: log.clone() }));

	// Act
	let (outcome, http_context) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(outcome.is_ok());
	assert_eq!(body(&http_context), "recovered");
	assert!(log.contains("recovered:boom"));
}

#[rstest]
#[case::observed(false)]
#[case::handled(true)]
#[tokio::test]
async fn test_resource_filter_sees_captured_error(#[case] handle: bool) {
	// Arrange
	let log = Log::default();
	let action = ControllerAction::new(failing_handler(&log), counting_factory())
		.with_filter(Arc::new(WrapResource {
			log: log.clone(),
			name: "resource",
			handle,
		}));

	// Act
	let (outcome, _) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(log.contains("resource:after canceled=false error=boom"));
	assert_eq!(outcome.is_ok(), handle);
}

// ===== Result Tests =====

#[rstest]
#[tokio::test]
async fn test_result_filter_cancel_skips_result() {
	// Arrange
	let log = Log::default();
	let action = ControllerAction::new(ok_handler(&log), counting_factory())
		.with_filter(Arc::new(CancelResult));

	// Act
	let (outcome, http_context) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(outcome.is_ok());
	assert!(log.contains("handler"));
	assert!(!log.contains("result:ok"));
	assert!(http_context.response().body.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_async_result_filter_replaces_result() {
	// Arrange
	let log = Log::default();
	let action = ControllerAction::new(ok_handler(&log), counting_factory())
		.with_filter(Arc::new(ReplaceResult { log: log.clone() }));

	// Act
	let (outcome, http_context) = invoke(action, MvcOptions::default()).await;

	// Assert
	assert!(outcome.is_ok());
	assert_eq!(body(&http_context), "replaced");
	assert!(!log.contains("result:ok"));
}
