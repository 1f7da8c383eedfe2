use super::Filter;
use std::sync::Arc;

/// The pipeline stage a cursor walk is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FilterStage {
	Authorization,
	Resource,
	Exception,
	Action,
	Result,
	AlwaysRunResult,
}

impl FilterStage {
	pub(crate) const ALL: [FilterStage; 5] = [
		Self::Authorization,
		Self::Resource,
		Self::Action,
		Self::Exception,
		Self::Result,
	];

	pub(crate) fn name(self) -> &'static str {
		match self {
			Self::Authorization => "authorization",
			Self::Resource => "resource",
			Self::Exception => "exception",
			Self::Action => "action",
			Self::Result => "result",
			Self::AlwaysRunResult => "always-run result",
		}
	}

	fn has_async(self, filter: &dyn Filter) -> bool {
		match self {
			Self::Authorization => filter.as_async_authorization().is_some(),
			Self::Resource => filter.as_async_resource().is_some(),
			Self::Exception => filter.as_async_exception().is_some(),
			Self::Action => filter.as_async_action().is_some(),
			Self::Result => filter.as_async_result().is_some(),
			Self::AlwaysRunResult => filter.always_run() && filter.as_async_result().is_some(),
		}
	}

	fn has_sync(self, filter: &dyn Filter) -> bool {
		match self {
			Self::Authorization => filter.as_authorization().is_some(),
			Self::Resource => filter.as_resource().is_some(),
			Self::Exception => filter.as_exception().is_some(),
			Self::Action => filter.as_action().is_some(),
			Self::Result => filter.as_result().is_some(),
			Self::AlwaysRunResult => filter.always_run() && filter.as_result().is_some(),
		}
	}

	pub(crate) fn accepts(self, filter: &dyn Filter) -> bool {
		self.has_async(filter) || self.has_sync(filter)
	}
}

pub(crate) enum CursorItem {
	Async(Arc<dyn Filter>),
	Sync(Arc<dyn Filter>),
}

/// Index into the request's filter list, shared by every stage.
#[derive(Debug, Default)]
pub(crate) struct FilterCursor {
	index: usize,
}

impl FilterCursor {
	pub(crate) fn reset(&mut self) {
		self.index = 0;
	}

	/// Advance to the next filter taking part in `stage`.
	pub(crate) fn next_filter(
		&mut self,
		filters: &[Arc<dyn Filter>],
		stage: FilterStage,
	) -> Option<CursorItem> {
		while let Some(filter) = filters.get(self.index) {
			self.index += 1;
			if stage.has_async(filter.as_ref()) {
				return Some(CursorItem::Async(Arc::clone(filter)));
			}
			if stage.has_sync(filter.as_ref()) {
				return Some(CursorItem::Sync(Arc::clone(filter)));
			}
		}
		None
	}
}
