use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::Serialize;

/// HTTP response written by action results.
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Default for Response {
	fn default() -> Self {
		Self::ok()
	}
}

impl Response {
	/// Create a response with the given status code and an empty body
	///
	/// # Examples
	///
	/// ```
	/// use ravel_http::Response;
	/// use http::StatusCode;
	///
	/// let response = Response::new(StatusCode::ACCEPTED);
	/// assert_eq!(response.status, StatusCode::ACCEPTED);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	/// Replace the body
	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Add a header; invalid names or values are ignored
	///
	/// # Examples
	///
	/// ```
	/// use ravel_http::Response;
	///
	/// let response = Response::ok().with_header("X-Request-Id", "abc");
	/// assert_eq!(response.headers.get("x-request-id").unwrap(), "abc");
	/// ```
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let Ok(header_name) = HeaderName::from_bytes(name.as_bytes())
			&& let Ok(header_value) = HeaderValue::from_str(value)
		{
			self.headers.insert(header_name, header_value);
		}
		self
	}

	/// Serialize `data` as the JSON body and set the content type
	pub fn write_json<T: Serialize>(&mut self, data: &T) -> Result<(), serde_json::Error> {
		self.body = Bytes::from(serde_json::to_vec(data)?);
		self.headers.insert(
			CONTENT_TYPE,
			HeaderValue::from_static("application/json"),
		);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_default_is_empty_ok() {
		let response = Response::default();

		assert_eq!(response.status, StatusCode::OK);
		assert!(response.headers.is_empty());
		assert!(response.body.is_empty());
	}

	#[rstest]
	fn test_write_json_sets_body_and_content_type() {
		// Arrange
		let payload = serde_json::json!({ "id": 5 });
		let mut response = Response::ok().with_body("stale");

		// Act
		response.write_json(&payload).unwrap();

		// Assert
		assert_eq!(response.headers.get(CONTENT_TYPE).unwrap(), "application/json");
		assert_eq!(response.body, Bytes::from_static(br#"{"id":5}"#));
	}

	#[rstest]
	fn test_invalid_header_is_ignored() {
		let response = Response::ok().with_header("bad header", "value");

		assert!(response.headers.is_empty());
	}
}
