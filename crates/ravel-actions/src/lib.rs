//! # Ravel Actions
//!
//! Action descriptors and conventional action selection.
//!
//! Descriptors are gathered from [`provider::ActionDescriptorProvider`]s into a
//! versioned [`collection::ActionDescriptorCollection`]. The
//! [`selector::ActionSelector`] turns a request's route values into a list of
//! candidates through an [`selection_table::ActionSelectionTable`] and narrows
//! it down with [`constraint::ActionConstraint`]s.
//!
//! ```
//! use ravel_actions::prelude::*;
//! use ravel_core::settings::MvcSettings;
//! use ravel_http::{HttpContext, Request};
//! use http::{Method, Uri};
//! use std::sync::Arc;
//!
//! let index = Arc::new(
//! 	ActionDescriptor::builder("Home.Index")
//! 		.route_value("controller", "Home")
//! 		.route_value("action", "Index")
//! 		.build(),
//! );
//! let provider = DefaultActionDescriptorCollectionProvider::new(
//! 	vec![Arc::new(StaticActionDescriptorProvider::new(0, vec![index]))],
//! 	vec![],
//! );
//! let selector = ActionSelector::new(provider, MvcSettings::default());
//!
//! let route_context = RouteContext::new(
//! 	HttpContext::new(Request::new(Method::GET, Uri::from_static("/"))),
//! 	RouteData::new(RouteValueDictionary::from([("controller", "home"), ("action", "index")])),
//! );
//! let candidates = selector.select_candidates(&route_context);
//! let best = selector.select_best_candidate(&route_context, &candidates).unwrap();
//! assert_eq!(best.unwrap().display_name(), "Home.Index");
//! ```

pub mod change_token;
pub mod collection;
pub mod collection_provider;
pub mod constraint;
pub mod constraint_evaluator;
pub mod context;
pub mod descriptor;
pub mod provider;
pub mod route;
pub mod selection_table;
pub mod selector;
pub mod values;

pub use change_token::{
	CancellationChangeToken, ChangeRegistration, ChangeToken, ChangeTokenSource,
	CompositeChangeToken,
};
pub use collection::ActionDescriptorCollection;
pub use collection_provider::{
	ActionDescriptorCollectionProvider, DefaultActionDescriptorCollectionProvider,
};
pub use constraint::{
	ActionConstraint, ActionConstraintContext, ActionSelectorCandidate, HttpMethodActionConstraint,
};
pub use context::ActionContext;
pub use descriptor::{ActionDescriptor, ActionDescriptorBuilder, AttributeRouteInfo};
pub use provider::{
	ActionDescriptorChangeProvider, ActionDescriptorChangeSignal, ActionDescriptorProvider,
	ActionDescriptorProviderContext, DynamicActionDescriptorProvider,
	StaticActionDescriptorProvider,
};
pub use route::{RouteContext, RouteData};
pub use selection_table::ActionSelectionTable;
pub use selector::ActionSelector;
pub use values::{RouteValueDictionary, ValueDictionary};

/// Commonly used types
pub mod prelude {
	pub use crate::{
		ActionConstraint, ActionConstraintContext, ActionContext, ActionDescriptor,
		ActionDescriptorCollectionProvider, ActionDescriptorProvider, ActionSelector,
		ChangeToken, DefaultActionDescriptorCollectionProvider, RouteContext, RouteData,
		RouteValueDictionary, StaticActionDescriptorProvider,
	};
}
