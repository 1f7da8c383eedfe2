//! Action results: executable descriptions of the response to produce.

use crate::method::ReturnType;
use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderValue};
use ravel_actions::ActionContext;
use ravel_core::exception::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Writes a response for the current request.
#[async_trait]
pub trait ActionResult: Send + Sync + fmt::Debug {
	async fn execute_result(&self, context: &ActionContext) -> Result<()>;
}

/// Shared handle to an action result.
pub type ActionResultRef = Arc<dyn ActionResult>;

static EMPTY_RESULT: LazyLock<ActionResultRef> = LazyLock::new(|| Arc::new(EmptyResult));

/// A result that writes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyResult;

impl EmptyResult {
	/// The process-wide empty result instance
	pub fn shared() -> ActionResultRef {
		Arc::clone(&EMPTY_RESULT)
	}
}

#[async_trait]
impl ActionResult for EmptyResult {
	async fn execute_result(&self, _context: &ActionContext) -> Result<()> {
		Ok(())
	}
}

/// Sets the response status code.
#[derive(Debug, Clone, Copy)]
pub struct StatusCodeResult {
	pub status: StatusCode,
}

impl StatusCodeResult {
	pub fn new(status: StatusCode) -> Self {
		Self { status }
	}

	pub fn forbidden() -> ActionResultRef {
		Arc::new(Self::new(StatusCode::FORBIDDEN))
	}

	pub fn not_found() -> ActionResultRef {
		Arc::new(Self::new(StatusCode::NOT_FOUND))
	}
}

#[async_trait]
impl ActionResult for StatusCodeResult {
	async fn execute_result(&self, context: &ActionContext) -> Result<()> {
		context.http_context.response_mut().status = self.status;
		Ok(())
	}
}

/// Writes a text body.
#[derive(Debug, Clone)]
pub struct ContentResult {
	pub status: Option<StatusCode>,
	pub content_type: Option<String>,
	pub content: String,
}

impl ContentResult {
	pub fn new(content: impl Into<String>) -> Self {
		Self {
			status: None,
			content_type: None,
			content: content.into(),
		}
	}

	pub fn with_status(mut self, status: StatusCode) -> Self {
		self.status = Some(status);
		self
	}

	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());
		self
	}
}

#[async_trait]
impl ActionResult for ContentResult {
	async fn execute_result(&self, context: &ActionContext) -> Result<()> {
		let content_type = self
			.content_type
			.as_deref()
			.unwrap_or("text/plain; charset=utf-8");
		let content_type = HeaderValue::from_str(content_type)
			.map_err(Error::handler)?;

		let mut response = context.http_context.response_mut();
		if let Some(status) = self.status {
			response.status = status;
		}
		response.headers.insert(CONTENT_TYPE, content_type);
		response.body = Bytes::from(self.content.clone());
		Ok(())
	}
}

/// Serializes a value as the JSON response body.
#[derive(Debug, Clone)]
pub struct ObjectResult {
	pub value: Value,
	pub status: Option<StatusCode>,
	/// Display name of the type the value was produced as
	pub declared_type: Option<String>,
}

impl ObjectResult {
	pub fn new(value: Value) -> Self {
		Self {
			value,
			status: None,
			declared_type: None,
		}
	}

	pub fn with_status(mut self, status: StatusCode) -> Self {
		self.status = Some(status);
		self
	}
}

#[async_trait]
impl ActionResult for ObjectResult {
	async fn execute_result(&self, context: &ActionContext) -> Result<()> {
		let mut response = context.http_context.response_mut();
		if let Some(status) = self.status {
			response.status = status;
		}
		response.write_json(&self.value).map_err(Error::handler)?;
		Ok(())
	}
}

/// Converts plain handler values into action results.
pub trait ActionResultTypeMapper: Send + Sync {
	/// `None` means the value has no result representation.
	fn convert(&self, value: Value, return_type: &ReturnType) -> Option<ActionResultRef>;
}

/// Wraps every value in an [`ObjectResult`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultActionResultTypeMapper;

impl ActionResultTypeMapper for DefaultActionResultTypeMapper {
	fn convert(&self, value: Value, return_type: &ReturnType) -> Option<ActionResultRef> {
		Some(Arc::new(ObjectResult {
			value,
			status: None,
			declared_type: Some(return_type.name().to_string()),
		}))
	}
}
