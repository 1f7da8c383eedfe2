//! Filter registration and per-request filter resolution.

use super::Filter;
use super::context::FilterList;
use ravel_core::exception::Result;
use ravel_http::Extensions;
use std::fmt;
use std::sync::Arc;

/// Where a filter was registered. Lower scopes run first among filters of equal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilterScope(pub i32);

impl FilterScope {
	pub const GLOBAL: FilterScope = FilterScope(10);
	pub const CONTROLLER: FilterScope = FilterScope(20);
	pub const ACTION: FilterScope = FilterScope(30);
}

/// Creates filter instances from request services.
pub trait FilterFactory: Send + Sync {
	/// Whether one instance may serve every request
	fn is_reusable(&self) -> bool;

	fn create_instance(&self, services: &Extensions) -> Result<Arc<dyn Filter>>;

	fn order(&self) -> i32 {
		0
	}
}

#[derive(Clone)]
pub enum FilterSource {
	Instance(Arc<dyn Filter>),
	Factory(Arc<dyn FilterFactory>),
}

impl fmt::Debug for FilterSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Instance(filter) => f.debug_tuple("Instance").field(filter).finish(),
			Self::Factory(factory) => f
				.debug_struct("Factory")
				.field("reusable", &factory.is_reusable())
				.finish(),
		}
	}
}

/// A registered filter.
#[derive(Debug, Clone)]
pub struct FilterDescriptor {
	pub source: FilterSource,
	pub order: i32,
	pub scope: FilterScope,
}

impl FilterDescriptor {
	/// The order defaults to the filter's own [`Filter::order`].
	pub fn instance(filter: Arc<dyn Filter>, scope: FilterScope) -> Self {
		Self {
			order: filter.order(),
			source: FilterSource::Instance(filter),
			scope,
		}
	}

	pub fn factory(factory: Arc<dyn FilterFactory>, scope: FilterScope) -> Self {
		Self {
			order: factory.order(),
			source: FilterSource::Factory(factory),
			scope,
		}
	}

	pub fn with_order(mut self, order: i32) -> Self {
		self.order = order;
		self
	}
}

/// A descriptor together with its instance, when the instance can be shared.
#[derive(Debug, Clone)]
pub struct FilterItem {
	pub descriptor: FilterDescriptor,
	pub filter: Option<Arc<dyn Filter>>,
}

impl FilterItem {
	pub fn is_reusable(&self) -> bool {
		self.filter.is_some()
	}

	fn resolve(&self, services: &Extensions) -> Result<Arc<dyn Filter>> {
		match (&self.filter, &self.descriptor.source) {
			(Some(filter), _) | (None, FilterSource::Instance(filter)) => Ok(Arc::clone(filter)),
			(None, FilterSource::Factory(factory)) => factory.create_instance(services),
		}
	}
}

#[derive(Debug)]
pub struct FilterFactoryResult {
	/// Items to keep for later requests
	pub cache_entries: Vec<FilterItem>,
	/// Filters for the current request
	pub filters: FilterList,
	/// Whether `filters` may be reused by later requests as is
	pub all_reusable: bool,
}

/// Merge global and action filters, sort them and resolve them for the current request.
///
/// Filters are ordered by `(order, scope)`; the sort is stable so registration
/// order breaks the remaining ties.
pub fn get_all_filters(
	global: &[FilterDescriptor],
	action: &[FilterDescriptor],
	services: &Extensions,
) -> Result<FilterFactoryResult> {
	let mut descriptors: Vec<FilterDescriptor> = global.iter().chain(action).cloned().collect();
	descriptors.sort_by_key(|descriptor| (descriptor.order, descriptor.scope));

	let mut cache_entries = Vec::with_capacity(descriptors.len());
	let mut filters = Vec::with_capacity(descriptors.len());
	for descriptor in descriptors {
		let (filter, reusable) = match &descriptor.source {
			FilterSource::Instance(filter) => (Arc::clone(filter), true),
			FilterSource::Factory(factory) => (factory.create_instance(services)?, factory.is_reusable()),
		};
		filters.push(Arc::clone(&filter));
		cache_entries.push(FilterItem {
			descriptor,
			filter: reusable.then_some(filter),
		});
	}

	let all_reusable = cache_entries.iter().all(FilterItem::is_reusable);
	Ok(FilterFactoryResult {
		cache_entries,
		filters: filters.into(),
		all_reusable,
	})
}

/// Build the filter list for a request, creating non-reusable filters anew.
pub fn create_uncached_filters(items: &[FilterItem], services: &Extensions) -> Result<FilterList> {
	let filters = items
		.iter()
		.map(|item| item.resolve(services))
		.collect::<Result<Vec<_>>>()?;
	Ok(filters.into())
}
