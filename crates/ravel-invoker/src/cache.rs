//! Per-action invocation data, cached against the descriptor collection version.

use crate::controller::{
	ControllerAction, ControllerArgumentBinder, ControllerFactory, RouteValueArgumentBinder,
};
use crate::executor::ActionMethodExecutor;
use crate::filters::context::FilterList;
use crate::filters::factory::{self, FilterItem};
use crate::method::ObjectMethodExecutor;
use crate::options::MvcOptions;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use ravel_actions::{ActionContext, ActionDescriptorCollectionProvider};
use ravel_core::exception::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Everything about an action that does not change between requests.
pub struct ControllerActionInvokerCacheEntry {
	pub(crate) filter_items: Vec<FilterItem>,
	pub(crate) cached_filters: Option<FilterList>,
	pub(crate) controller_factory: Arc<dyn ControllerFactory>,
	pub(crate) argument_binder: Option<Arc<dyn ControllerArgumentBinder>>,
	pub(crate) object_method_executor: ObjectMethodExecutor,
	pub(crate) action_method_executor: ActionMethodExecutor,
}

impl ControllerActionInvokerCacheEntry {
	pub fn action_method_executor(&self) -> ActionMethodExecutor {
		self.action_method_executor
	}

	pub fn object_method_executor(&self) -> &ObjectMethodExecutor {
		&self.object_method_executor
	}

	/// `None` when the handler takes no parameters
	pub fn argument_binder(&self) -> Option<&Arc<dyn ControllerArgumentBinder>> {
		self.argument_binder.as_ref()
	}

	pub fn filter_items(&self) -> &[FilterItem] {
		&self.filter_items
	}
}

impl fmt::Debug for ControllerActionInvokerCacheEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ControllerActionInvokerCacheEntry")
			.field("filter_items", &self.filter_items)
			.field("cached_filters", &self.cached_filters.is_some())
			.field("object_method_executor", &self.object_method_executor)
			.field("action_method_executor", &self.action_method_executor)
			.finish_non_exhaustive()
	}
}

type EntryMap = HashMap<Uuid, Arc<ControllerActionInvokerCacheEntry>>;

struct InnerCache {
	version: u64,
	entries: ArcSwap<EntryMap>,
}

impl InnerCache {
	fn new(version: u64) -> Self {
		Self {
			version,
			entries: ArcSwap::from_pointee(HashMap::new()),
		}
	}
}

/// Caches [`ControllerActionInvokerCacheEntry`] values by action id.
///
/// Reads go through lock-free snapshots. Writers copy the entry map, insert and
/// swap it back under `write_lock`. The whole cache is replaced when the
/// descriptor collection version moves on. Concurrent first requests for an
/// action may both build an entry; the first one stored is kept.
pub struct ControllerActionInvokerCache {
	collection_provider: Arc<dyn ActionDescriptorCollectionProvider>,
	options: Arc<MvcOptions>,
	current: ArcSwap<InnerCache>,
	write_lock: Mutex<()>,
}

impl ControllerActionInvokerCache {
	pub fn new(
		collection_provider: Arc<dyn ActionDescriptorCollectionProvider>,
		options: Arc<MvcOptions>,
	) -> Self {
		Self {
			collection_provider,
			options,
			current: ArcSwap::from_pointee(InnerCache::new(u64::MAX)),
			write_lock: Mutex::new(()),
		}
	}

	fn current_cache(&self) -> Arc<InnerCache> {
		let version = self.collection_provider.action_descriptors().version();
		let current = self.current.load_full();
		if current.version == version {
			return current;
		}

		let _guard = self.write_lock.lock();
		let version = self.collection_provider.action_descriptors().version();
		let current = self.current.load_full();
		if current.version == version {
			return current;
		}
		tracing::debug!(version, "invoker cache reset for new action descriptor collection");
		let fresh = Arc::new(InnerCache::new(version));
		self.current.store(Arc::clone(&fresh));
		fresh
	}

	/// Entry and filter list for the action of `action_context`.
	pub fn get_cached_result(
		&self,
		action_context: &ActionContext,
	) -> Result<(Arc<ControllerActionInvokerCacheEntry>, FilterList)> {
		let services = action_context.http_context.services();

		if !self.options.settings.cache_invokers {
			let (entry, filters) = self.create_entry(action_context)?;
			return Ok((Arc::new(entry), filters));
		}

		let cache = self.current_cache();
		let id = action_context.action_descriptor.id();

		if let Some(entry) = cache.entries.load().get(&id).cloned() {
			let filters = match &entry.cached_filters {
				Some(filters) => Arc::clone(filters),
				None => factory::create_uncached_filters(&entry.filter_items, services)?,
			};
			return Ok((entry, filters));
		}

		let (entry, filters) = self.create_entry(action_context)?;
		let _guard = self.write_lock.lock();
		let mut entries = EntryMap::clone(&cache.entries.load());
		let entry = Arc::clone(entries.entry(id).or_insert_with(|| Arc::new(entry)));
		cache.entries.store(Arc::new(entries));
		Ok((entry, filters))
	}

	fn create_entry(
		&self,
		action_context: &ActionContext,
	) -> Result<(ControllerActionInvokerCacheEntry, FilterList)> {
		let descriptor = &action_context.action_descriptor;
		let action = descriptor.metadata::<ControllerAction>().ok_or_else(|| {
			Error::Internal(format!(
				"Action '{}' has no controller action metadata",
				descriptor.display_name()
			))
		})?;

		let filter_result = factory::get_all_filters(
			&self.options.filters,
			&action.filters,
			action_context.http_context.services(),
		)?;

		let object_method_executor =
			ObjectMethodExecutor::new(action.method.clone(), action.invocation_filters.clone());
		let action_method_executor =
			ActionMethodExecutor::get_executor(object_method_executor.signature())?;

		let argument_binder = if object_method_executor.parameters().is_empty() {
			None
		} else {
			Some(
				action
					.argument_binder
					.clone()
					.unwrap_or_else(|| Arc::new(RouteValueArgumentBinder) as Arc<dyn ControllerArgumentBinder>),
			)
		};

		let entry = ControllerActionInvokerCacheEntry {
			cached_filters: filter_result
				.all_reusable
				.then(|| Arc::clone(&filter_result.filters)),
			filter_items: filter_result.cache_entries,
			controller_factory: Arc::clone(&action.controller_factory),
			argument_binder,
			object_method_executor,
			action_method_executor,
		};
		Ok((entry, filter_result.filters))
	}
}

impl fmt::Debug for ControllerActionInvokerCache {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ControllerActionInvokerCache")
			.field("version", &self.current.load().version)
			.finish_non_exhaustive()
	}
}
