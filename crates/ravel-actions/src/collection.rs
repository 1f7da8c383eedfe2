use crate::descriptor::ActionDescriptor;
use std::sync::Arc;

/// An immutable snapshot of every known action plus its version.
///
/// Snapshots are rebuilt wholesale, never edited. A version change means
/// anything derived from the previous snapshot must be rebuilt.
#[derive(Debug, Clone)]
pub struct ActionDescriptorCollection {
	items: Arc<[Arc<ActionDescriptor>]>,
	version: u64,
}

impl ActionDescriptorCollection {
	pub fn new(items: Vec<Arc<ActionDescriptor>>, version: u64) -> Self {
		Self {
			items: items.into(),
			version,
		}
	}

	pub fn items(&self) -> &[Arc<ActionDescriptor>] {
		&self.items
	}

	pub fn version(&self) -> u64 {
		self.version
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}
