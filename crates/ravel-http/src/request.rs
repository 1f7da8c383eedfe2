use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};

/// Incoming HTTP request as seen by action selection and filters.
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Request {
	/// Create a request with no headers and an empty body
	///
	/// # Examples
	///
	/// ```
	/// use ravel_http::Request;
	/// use http::{Method, Uri};
	///
	/// let request = Request::new(Method::GET, Uri::from_static("/home/index"));
	/// assert_eq!(request.path(), "/home/index");
	/// ```
	pub fn new(method: Method, uri: Uri) -> Self {
		Self {
			method,
			uri,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Add a header; invalid names or values are ignored
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let Ok(header_name) = HeaderName::from_bytes(name.as_bytes())
			&& let Ok(header_value) = HeaderValue::from_str(value)
		{
			self.headers.insert(header_name, header_value);
		}
		self
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Returns a header value as a string, if present and valid UTF-8
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}
}
