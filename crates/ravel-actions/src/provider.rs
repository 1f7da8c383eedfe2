//! Action descriptor providers and change signals.

use crate::change_token::{CancellationChangeToken, ChangeToken, ChangeTokenSource};
use crate::descriptor::ActionDescriptor;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared state of one collection pass.
#[derive(Debug, Default)]
pub struct ActionDescriptorProviderContext {
	pub results: Vec<Arc<ActionDescriptor>>,
}

/// Contributes descriptors to the action collection.
///
/// Providers run in two phases. `on_providers_executing` runs in ascending
/// [`order`](Self::order), then `on_providers_executed` runs in descending
/// order, so a low-order provider can see (and rewrite) what higher-order
/// providers added.
pub trait ActionDescriptorProvider: Send + Sync {
	fn order(&self) -> i32;

	fn on_providers_executing(&self, context: &mut ActionDescriptorProviderContext);

	fn on_providers_executed(&self, _context: &mut ActionDescriptorProviderContext) {}
}

/// Reports when the descriptors it influences are stale.
pub trait ActionDescriptorChangeProvider: Send + Sync {
	fn get_change_token(&self) -> Arc<dyn ChangeToken>;
}

/// A provider that contributes a fixed list of descriptors.
pub struct StaticActionDescriptorProvider {
	order: i32,
	descriptors: Vec<Arc<ActionDescriptor>>,
}

impl StaticActionDescriptorProvider {
	pub fn new(order: i32, descriptors: Vec<Arc<ActionDescriptor>>) -> Self {
		Self { order, descriptors }
	}
}

impl ActionDescriptorProvider for StaticActionDescriptorProvider {
	fn order(&self) -> i32 {
		self.order
	}

	fn on_providers_executing(&self, context: &mut ActionDescriptorProviderContext) {
		context.results.extend(self.descriptors.iter().cloned());
	}
}

/// A manually triggered change signal.
///
/// Every call to [`notify`](Self::notify) fires the current token and
/// installs a fresh one.
#[derive(Default)]
pub struct ActionDescriptorChangeSignal {
	source: Mutex<ChangeTokenSource>,
}

impl ActionDescriptorChangeSignal {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn notify(&self) {
		let previous = std::mem::replace(&mut *self.source.lock(), ChangeTokenSource::new());
		previous.cancel();
	}

	pub fn token(&self) -> CancellationChangeToken {
		self.source.lock().token()
	}
}

impl ActionDescriptorChangeProvider for ActionDescriptorChangeSignal {
	fn get_change_token(&self) -> Arc<dyn ChangeToken> {
		Arc::new(self.token())
	}
}

/// A provider whose descriptors can be added and removed at runtime.
///
/// Register it both as a provider and as a change provider; every edit
/// signals that the collection must be rebuilt.
pub struct DynamicActionDescriptorProvider {
	order: i32,
	descriptors: Mutex<Vec<Arc<ActionDescriptor>>>,
	signal: ActionDescriptorChangeSignal,
}

impl DynamicActionDescriptorProvider {
	pub fn new(order: i32) -> Self {
		Self {
			order,
			descriptors: Mutex::new(Vec::new()),
			signal: ActionDescriptorChangeSignal::new(),
		}
	}

	pub fn add(&self, descriptor: Arc<ActionDescriptor>) {
		self.descriptors.lock().push(descriptor);
		self.signal.notify();
	}

	/// Remove every descriptor with the given display name; returns how many were removed
	pub fn remove(&self, display_name: &str) -> usize {
		let removed = {
			let mut descriptors = self.descriptors.lock();
			let before = descriptors.len();
			descriptors.retain(|descriptor| descriptor.display_name() != display_name);
			before - descriptors.len()
		};
		if removed > 0 {
			self.signal.notify();
		}
		removed
	}
}

impl ActionDescriptorProvider for DynamicActionDescriptorProvider {
	fn order(&self) -> i32 {
		self.order
	}

	fn on_providers_executing(&self, context: &mut ActionDescriptorProviderContext) {
		context
			.results
			.extend(self.descriptors.lock().iter().cloned());
	}
}

impl ActionDescriptorChangeProvider for DynamicActionDescriptorProvider {
	fn get_change_token(&self) -> Arc<dyn ChangeToken> {
		self.signal.get_change_token()
	}
}
