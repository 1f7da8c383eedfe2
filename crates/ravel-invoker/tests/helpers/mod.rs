//! Shared fixtures for invoker integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use http::{Method, Uri};
use parking_lot::Mutex;
use ravel_actions::prelude::*;
use ravel_core::exception::{Error, Result};
use ravel_http::{HttpContext, Request};
use ravel_invoker::prelude::*;
use ravel_invoker::ActionInvokerFactory;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Ordered record of everything the pipeline touched.
#[derive(Debug, Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
	pub fn push(&self, entry: impl Into<String>) {
		self.0.lock().push(entry.into());
	}

	pub fn entries(&self) -> Vec<String> {
		self.0.lock().clone()
	}

	pub fn contains(&self, entry: &str) -> bool {
		self.0.lock().iter().any(|logged| logged == entry)
	}
}

/// A result that records its execution and writes `content` as the body.
#[derive(Debug)]
pub struct LoggedResult {
	pub log: Log,
	pub content: &'static str,
}

impl LoggedResult {
	pub fn shared(log: &Log, content: &'static str) -> ActionResultRef {
		Arc::new(Self {
			log: log.clone(),
			content,
		})
	}
}

#[async_trait]
impl ActionResult for LoggedResult {
	async fn execute_result(&self, context: &ActionContext) -> Result<()> {
		self.log.push(format!("result:{}", self.content));
		context.http_context.response_mut().body = self.content.into();
		Ok(())
	}
}

#[derive(Debug, Default)]
pub struct Controller;

/// Counts controller creations and releases, optionally failing either.
#[derive(Debug, Default)]
pub struct CountingFactory {
	pub created: AtomicUsize,
	pub released: AtomicUsize,
	pub fail_create: bool,
	pub fail_release: bool,
}

impl CountingFactory {
	pub fn created(&self) -> usize {
		self.created.load(Ordering::SeqCst)
	}

	pub fn released(&self) -> usize {
		self.released.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ControllerFactory for CountingFactory {
	fn create_controller(&self, _context: &ActionContext) -> Result<ControllerInstance> {
		if self.fail_create {
			return Err(Error::msg("controller construction failed"));
		}
		self.created.fetch_add(1, Ordering::SeqCst);
		Ok(Arc::new(Controller))
	}

	async fn release_controller(
		&self,
		_context: &ActionContext,
		_controller: ControllerInstance,
	) -> Result<()> {
		self.released.fetch_add(1, Ordering::SeqCst);
		if self.fail_release {
			return Err(Error::msg("controller release failed"));
		}
		Ok(())
	}
}

/// A handler returning a [`LoggedResult`] with body `"ok"`.
pub fn ok_handler(log: &Log) -> HandlerMethod {
	let log = log.clone();
	HandlerMethod::new(
		MethodSignature::new("Index", ReturnType::action_result()),
		move |_, _| {
			log.push("handler");
			Ok(MethodReturn::result(LoggedResult::shared(&log, "ok")))
		},
	)
}

/// A handler failing with a user error `"boom"`.
pub fn failing_handler(log: &Log) -> HandlerMethod {
	let log = log.clone();
	HandlerMethod::new(
		MethodSignature::new("Index", ReturnType::action_result()),
		move |_, _| {
			log.push("handler");
			Err(Error::msg("boom"))
		},
	)
}

pub fn descriptor(action: ControllerAction) -> Arc<ActionDescriptor> {
	Arc::new(
		ActionDescriptor::builder("Home.Index")
			.route_value("controller", "Home")
			.route_value("action", "Index")
			.metadata(action)
			.build(),
	)
}

pub fn http_context() -> HttpContext {
	HttpContext::new(Request::new(Method::GET, Uri::from_static("/home/index")))
}

pub fn collection_provider(
	descriptors: Vec<Arc<ActionDescriptor>>,
) -> Arc<dyn ActionDescriptorCollectionProvider> {
	DefaultActionDescriptorCollectionProvider::new(
		vec![Arc::new(StaticActionDescriptorProvider::new(0, descriptors))],
		vec![],
	)
}

/// Run `action` once through a fresh invoker factory.
pub async fn invoke(action: ControllerAction, options: MvcOptions) -> (Result<()>, HttpContext) {
	invoke_with_route(action, options, RouteData::default()).await
}

pub async fn invoke_with_route(
	action: ControllerAction,
	options: MvcOptions,
	route_data: RouteData,
) -> (Result<()>, HttpContext) {
	let descriptor = descriptor(action);
	let factory = ActionInvokerFactory::new(
		collection_provider(vec![Arc::clone(&descriptor)]),
		Arc::new(options),
	);
	let http_context = http_context();
	let action_context = ActionContext::new(http_context.clone(), route_data, descriptor);

	let outcome = match factory.create_invoker(action_context) {
		Ok(Some(invoker)) => invoker.invoke().await,
		Ok(None) => Err(Error::Internal("no invoker".to_string())),
		Err(error) => Err(error),
	};
	(outcome, http_context)
}

pub fn body(http_context: &HttpContext) -> String {
	String::from_utf8_lossy(&http_context.response().body).into_owned()
}
