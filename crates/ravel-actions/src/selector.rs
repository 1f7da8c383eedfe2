//! Conventional action selection.

use crate::collection_provider::ActionDescriptorCollectionProvider;
use crate::constraint::{ActionConstraint, ActionSelectorCandidate, HttpMethodActionConstraint};
use crate::constraint_evaluator;
use crate::descriptor::ActionDescriptor;
use crate::route::RouteContext;
use crate::selection_table::ActionSelectionTable;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use ravel_core::exception::{Error, Result};
use ravel_core::settings::MvcSettings;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

struct SelectorCache {
	table: ActionSelectionTable<Arc<ActionDescriptor>>,
	constraints: HashMap<Uuid, Vec<Arc<dyn ActionConstraint>>>,
}

impl SelectorCache {
	fn version(&self) -> u64 {
		self.table.version()
	}
}

/// Picks the action for a request from the current descriptor collection.
///
/// Derived lookup structures are rebuilt whenever the collection version
/// changes. Lookups read the current cache without locking; rebuilds are
/// serialized so the published cache only ever moves to a newer version.
pub struct ActionSelector {
	collection_provider: Arc<dyn ActionDescriptorCollectionProvider>,
	settings: MvcSettings,
	cache: ArcSwapOption<SelectorCache>,
	rebuild_lock: Mutex<()>,
}

impl ActionSelector {
	pub fn new(
		collection_provider: Arc<dyn ActionDescriptorCollectionProvider>,
		settings: MvcSettings,
	) -> Self {
		Self {
			collection_provider,
			settings,
			cache: ArcSwapOption::empty(),
			rebuild_lock: Mutex::new(()),
		}
	}

	fn current(&self) -> Arc<SelectorCache> {
		let version = self.collection_provider.action_descriptors().version();
		if let Some(cache) = self.cache.load_full()
			&& cache.version() == version
		{
			return cache;
		}

		let _guard = self.rebuild_lock.lock();
		// Read the collection again: a newer one may have been published while waiting.
		let collection = self.collection_provider.action_descriptors();
		if let Some(cache) = self.cache.load_full()
			&& cache.version() == collection.version()
		{
			return cache;
		}

		let constraints = collection
			.items()
			.iter()
			.map(|action| (action.id(), self.effective_constraints(action)))
			.collect();
		let cache = Arc::new(SelectorCache {
			table: ActionSelectionTable::create(&collection, self.settings.exclude_attribute_routed),
			constraints,
		});
		tracing::trace!(version = cache.version(), "action selection table rebuilt");
		self.cache.store(Some(Arc::clone(&cache)));
		cache
	}

	fn effective_constraints(&self, action: &ActionDescriptor) -> Vec<Arc<dyn ActionConstraint>> {
		let mut constraints = action.action_constraints().to_vec();
		if self.settings.respect_http_method_constraints && !action.http_methods().is_empty() {
			constraints.push(Arc::new(HttpMethodActionConstraint::new(
				action.http_methods().iter().cloned(),
			)));
		}
		constraints
	}

	/// Actions whose required route values match the request's route values
	pub fn select_candidates(&self, route_context: &RouteContext) -> Arc<[Arc<ActionDescriptor>]> {
		let cache = self.current();
		let candidates = cache.table.select(&route_context.route_data.values);
		if candidates.is_empty() {
			tracing::trace!(
				path = %route_context.http_context.request().path(),
				"no action matched the route values"
			);
		}
		candidates
	}

	/// Narrow `candidates` down to the single action that should handle the request.
	///
	/// Returns `Ok(None)` when no candidate survives constraint evaluation and
	/// [`Error::AmbiguousAction`] when more than one does.
	pub fn select_best_candidate(
		&self,
		route_context: &RouteContext,
		candidates: &[Arc<ActionDescriptor>],
	) -> Result<Option<Arc<ActionDescriptor>>> {
		if candidates.is_empty() {
			return Ok(None);
		}

		let cache = self.current();
		let candidates: Vec<ActionSelectorCandidate> = candidates
			.iter()
			.map(|action| {
				let constraints = match cache.constraints.get(&action.id()) {
					Some(constraints) => constraints.clone(),
					None => self.effective_constraints(action),
				};
				ActionSelectorCandidate::new(Arc::clone(action), constraints)
			})
			.collect();

		let mut matches = constraint_evaluator::evaluate(route_context, &candidates, None);

		match matches.len() {
			0 => {
				tracing::debug!(
					path = %route_context.http_context.request().path(),
					"no actions matched the current request"
				);
				Ok(None)
			}
			1 => Ok(matches.pop().map(|candidate| candidate.action)),
			_ => {
				let names: Vec<String> = matches
					.iter()
					.map(|candidate| candidate.action.display_name().to_string())
					.collect();
				tracing::error!(
					actions = %names.join(", "),
					"request matched multiple actions resulting in ambiguity"
				);
				Err(Error::AmbiguousAction { names })
			}
		}
	}
}
