//! Error types shared by every Ravel crate.
//!
//! Errors fall into two groups. User errors raised by filters, handlers or
//! controller factories are *recoverable*: the filter pipeline captures them
//! into the executed-context of the stage that observed them, where exception
//! filters or outer resource filters may mark them handled. Everything else
//! (ambiguous selection, filter protocol violations, null action results) is
//! fatal and unwinds straight to the caller of the pipeline.
//!
//! ```
//! use ravel_core::exception::Error;
//!
//! let error = Error::handler(anyhow::anyhow!("database unavailable"));
//! assert!(error.is_recoverable());
//!
//! let error = Error::NullActionResult {
//! 	return_type: "ActionResult".to_string(),
//! };
//! assert!(!error.is_recoverable());
//! ```

use thiserror::Error;

/// Result type used throughout Ravel.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while selecting or invoking an action.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// More than one action survived constraint evaluation.
	#[error(
		"Request matched multiple actions resulting in ambiguity. Matching actions: {}",
		.names.join("\n")
	)]
	AmbiguousAction {
		/// Display names of every surviving candidate, in candidate order
		names: Vec<String>,
	},

	/// An async filter set a short-circuit result and still invoked its continuation.
	#[error(
		"If an {filter} provides a result value by setting the {property} property of {context} to a non-null value, then it cannot call the next filter by invoking {delegate}."
	)]
	InvalidShortCircuit {
		/// Name of the filter capability
		filter: &'static str,
		/// Name of the short-circuit property
		property: &'static str,
		/// Name of the executing-context type
		context: &'static str,
		/// Name of the continuation type
		delegate: &'static str,
	},

	/// An async result filter cancelled execution and still invoked its continuation.
	#[error(
		"If an {filter} cancels execution by setting the {property} property of {context} to 'true', then it cannot call the next filter by invoking {delegate}."
	)]
	InvalidCancellation {
		/// Name of the filter capability
		filter: &'static str,
		/// Name of the cancellation property
		property: &'static str,
		/// Name of the executing-context type
		context: &'static str,
		/// Name of the continuation type
		delegate: &'static str,
	},

	/// An async filter invoked its continuation more than once.
	#[error("{delegate} was invoked more than once by the same {filter}.")]
	NextCalledTwice {
		/// Name of the filter capability
		filter: &'static str,
		/// Name of the continuation type
		delegate: &'static str,
	},

	/// A handler or the value-to-result mapper produced no result where one is required.
	#[error("Cannot return null from an action method with a return type of '{return_type}'.")]
	NullActionResult {
		/// Display name of the declared return type
		return_type: String,
	},

	/// The handler produced a value that does not fit its declared return shape.
	#[error("Action method '{method}' declares a return type of '{declared}' but produced {actual}.")]
	ReturnShapeMismatch {
		/// Name of the action method
		method: String,
		/// Display name of the declared return type
		declared: String,
		/// Description of what was actually produced
		actual: &'static str,
	},

	/// No invocation strategy accepts the declared return type.
	#[error("The return type '{return_type}' of action method '{method}' is not supported.")]
	UnsupportedReturnType {
		/// Name of the action method
		method: String,
		/// Display name of the declared return type
		return_type: String,
	},

	/// Several errors surfaced together, such as a pipeline failure followed by a release failure.
	#[error("One or more errors occurred. {}", format_aggregate(.errors))]
	Aggregate {
		/// The collected errors, in the order they occurred
		errors: Vec<Error>,
	},

	/// An error raised by user code: a filter, a handler, a factory or a result.
	#[error(transparent)]
	Handler(#[from] anyhow::Error),

	/// A pipeline invariant was broken.
	#[error("Internal error: {0}")]
	Internal(String),
}

impl Error {
	/// Wraps a user error so that it can flow through the filter pipeline.
	///
	/// # Examples
	///
	/// ```
	/// use ravel_core::exception::Error;
	///
	/// let error = Error::handler(std::io::Error::other("disk full"));
	/// assert_eq!(error.to_string(), "disk full");
	/// ```
	pub fn handler<E>(error: E) -> Self
	where
		E: Into<anyhow::Error>,
	{
		Self::Handler(error.into())
	}

	/// Creates a user error from a message.
	pub fn msg<M>(message: M) -> Self
	where
		M: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
	{
		Self::Handler(anyhow::Error::msg(message))
	}

	/// Returns `true` for errors that exception filters and resource filters may absorb.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, Self::Handler(_))
	}

	/// Returns the wrapped user error, if this is one.
	pub fn as_handler_error(&self) -> Option<&anyhow::Error> {
		match self {
			Self::Handler(error) => Some(error),
			_ => None,
		}
	}

	/// Combines a pipeline outcome with a cleanup outcome without dropping either error.
	///
	/// # Examples
	///
	/// ```
	/// use ravel_core::exception::Error;
	///
	/// let combined = Error::combine(Err(Error::msg("invoke")), Err(Error::msg("release")));
	/// match combined {
	/// 	Err(Error::Aggregate { errors }) => assert_eq!(errors.len(), 2),
	/// 	other => panic!("unexpected outcome: {other:?}"),
	/// }
	/// ```
	pub fn combine(outcome: Result<()>, cleanup: Result<()>) -> Result<()> {
		match (outcome, cleanup) {
			(Ok(()), Ok(())) => Ok(()),
			(Err(error), Ok(())) | (Ok(()), Err(error)) => Err(error),
			(Err(first), Err(second)) => Err(Self::Aggregate {
				errors: vec![first, second],
			}),
		}
	}
}

fn format_aggregate(errors: &[Error]) -> String {
	errors
		.iter()
		.map(|error| format!("({error})"))
		.collect::<Vec<_>>()
		.join(" ")
}
