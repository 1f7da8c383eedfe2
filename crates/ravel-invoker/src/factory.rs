//! Per-request invoker construction.

use crate::cache::ControllerActionInvokerCache;
use crate::controller::ControllerAction;
use crate::options::MvcOptions;
use crate::pipeline::ControllerActionInvoker;
use ravel_actions::{ActionContext, ActionDescriptorCollectionProvider};
use ravel_core::exception::Result;
use std::sync::Arc;

/// Creates a [`ControllerActionInvoker`] for each selected action.
#[derive(Debug)]
pub struct ActionInvokerFactory {
	cache: Arc<ControllerActionInvokerCache>,
	options: Arc<MvcOptions>,
}

impl ActionInvokerFactory {
	pub fn new(
		collection_provider: Arc<dyn ActionDescriptorCollectionProvider>,
		options: Arc<MvcOptions>,
	) -> Self {
		let cache = Arc::new(ControllerActionInvokerCache::new(
			collection_provider,
			Arc::clone(&options),
		));
		Self { cache, options }
	}

	pub fn cache(&self) -> &Arc<ControllerActionInvokerCache> {
		&self.cache
	}

	/// Build the invoker for `action_context`.
	///
	/// Returns `Ok(None)` for descriptors that are not controller actions.
	pub fn create_invoker(&self, action_context: ActionContext) -> Result<Option<ControllerActionInvoker>> {
		if action_context
			.action_descriptor
			.metadata::<ControllerAction>()
			.is_none()
		{
			return Ok(None);
		}

		let (entry, filters) = self.cache.get_cached_result(&action_context)?;
		Ok(Some(ControllerActionInvoker::new(
			action_context,
			entry,
			filters,
			Arc::clone(&self.options.result_type_mapper),
			self.options.settings.log_filter_execution_plan,
		)))
	}
}
