use crate::filters::{Filter, FilterDescriptor, FilterScope};
use crate::result::{ActionResultTypeMapper, DefaultActionResultTypeMapper};
use ravel_core::settings::MvcSettings;
use std::fmt;
use std::sync::Arc;

/// Options of the invocation layer: settings, global filters and the value-to-result mapper.
#[derive(Clone)]
pub struct MvcOptions {
	pub settings: MvcSettings,
	/// Filters applied to every action
	pub filters: Vec<FilterDescriptor>,
	pub result_type_mapper: Arc<dyn ActionResultTypeMapper>,
}

impl MvcOptions {
	pub fn new(settings: MvcSettings) -> Self {
		Self {
			settings,
			filters: Vec::new(),
			result_type_mapper: Arc::new(DefaultActionResultTypeMapper),
		}
	}

	/// Register a global filter instance
	pub fn add_filter(&mut self, filter: Arc<dyn Filter>) -> &mut Self {
		self.filters
			.push(FilterDescriptor::instance(filter, FilterScope::GLOBAL));
		self
	}

	pub fn add_filter_descriptor(&mut self, descriptor: FilterDescriptor) -> &mut Self {
		self.filters.push(descriptor);
		self
	}

	pub fn with_result_type_mapper(mut self, mapper: Arc<dyn ActionResultTypeMapper>) -> Self {
		self.result_type_mapper = mapper;
		self
	}
}

impl Default for MvcOptions {
	fn default() -> Self {
		Self::new(MvcSettings::default())
	}
}

impl fmt::Debug for MvcOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MvcOptions")
			.field("settings", &self.settings)
			.field("filters", &self.filters)
			.finish_non_exhaustive()
	}
}
