//! Action constraints.

use crate::descriptor::ActionDescriptor;
use crate::route::RouteContext;
use std::fmt;
use std::sync::Arc;

/// Order used by [`HttpMethodActionConstraint`].
pub const HTTP_METHOD_CONSTRAINT_ORDER: i32 = 100;

/// Decides whether a candidate action may handle the current request.
///
/// Constraints are evaluated in bands of equal [`order`](Self::order),
/// lowest first.
pub trait ActionConstraint: Send + Sync {
	fn order(&self) -> i32;

	fn accept(&self, context: &ActionConstraintContext<'_>) -> bool;

	fn name(&self) -> &str {
		std::any::type_name::<Self>()
	}
}

impl fmt::Debug for dyn ActionConstraint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActionConstraint")
			.field("name", &self.name())
			.field("order", &self.order())
			.finish()
	}
}

/// An action under consideration together with its effective constraints.
#[derive(Debug, Clone)]
pub struct ActionSelectorCandidate {
	pub action: Arc<ActionDescriptor>,
	pub constraints: Vec<Arc<dyn ActionConstraint>>,
}

impl ActionSelectorCandidate {
	pub fn new(action: Arc<ActionDescriptor>, constraints: Vec<Arc<dyn ActionConstraint>>) -> Self {
		Self {
			action,
			constraints,
		}
	}
}

/// Input to [`ActionConstraint::accept`].
pub struct ActionConstraintContext<'a> {
	/// Every candidate in the band being evaluated
	pub candidates: &'a [ActionSelectorCandidate],
	pub current_candidate: &'a ActionSelectorCandidate,
	pub route_context: &'a RouteContext,
}

/// Accepts only requests whose method is in the allowed list.
///
/// An empty list allows every method.
#[derive(Debug, Clone)]
pub struct HttpMethodActionConstraint {
	http_methods: Vec<String>,
}

impl HttpMethodActionConstraint {
	pub fn new<I, S>(http_methods: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			http_methods: http_methods.into_iter().map(Into::into).collect(),
		}
	}

	pub fn http_methods(&self) -> &[String] {
		&self.http_methods
	}
}

impl ActionConstraint for HttpMethodActionConstraint {
	fn order(&self) -> i32 {
		HTTP_METHOD_CONSTRAINT_ORDER
	}

	fn accept(&self, context: &ActionConstraintContext<'_>) -> bool {
		if self.http_methods.is_empty() {
			return true;
		}
		let method = context.route_context.http_context.request().method.as_str();
		self.http_methods
			.iter()
			.any(|allowed| allowed.eq_ignore_ascii_case(method))
	}
}
