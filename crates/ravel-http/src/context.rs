use crate::{Extensions, Request, Response};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Per-request state shared by routing, filters, handlers and results.
///
/// Cloning is cheap; every clone refers to the same request and response.
#[derive(Clone, Debug)]
pub struct HttpContext {
	inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
	request: Request,
	response: Mutex<Response>,
	services: Extensions,
	items: Extensions,
}

impl HttpContext {
	/// Create a context whose response starts as an empty `200 OK`
	///
	/// # Examples
	///
	/// ```
	/// use ravel_http::{HttpContext, Request};
	/// use http::{Method, StatusCode, Uri};
	///
	/// let context = HttpContext::new(Request::new(Method::GET, Uri::from_static("/")));
	/// assert_eq!(context.response().status, StatusCode::OK);
	/// ```
	pub fn new(request: Request) -> Self {
		Self::with_services(request, Extensions::new())
	}

	/// Create a context with a pre-populated service store
	pub fn with_services(request: Request, services: Extensions) -> Self {
		Self {
			inner: Arc::new(Inner {
				request,
				response: Mutex::new(Response::ok()),
				services,
				items: Extensions::new(),
			}),
		}
	}

	pub fn request(&self) -> &Request {
		&self.inner.request
	}

	/// Lock the response for writing
	///
	/// The guard must not be held across an `.await`.
	pub fn response_mut(&self) -> MutexGuard<'_, Response> {
		self.inner.response.lock()
	}

	/// A snapshot of the response as written so far
	pub fn response(&self) -> Response {
		self.inner.response.lock().clone()
	}

	/// Services available to controller factories, filter factories and argument binders
	pub fn services(&self) -> &Extensions {
		&self.inner.services
	}

	/// Per-request values shared between filters
	pub fn items(&self) -> &Extensions {
		&self.inner.items
	}
}
