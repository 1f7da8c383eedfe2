//! The versioned action descriptor collection.

use crate::change_token::{self, CancellationChangeToken, ChangeSubscription, ChangeToken, ChangeTokenSource};
use crate::collection::ActionDescriptorCollection;
use crate::provider::{
	ActionDescriptorChangeProvider, ActionDescriptorProvider, ActionDescriptorProviderContext,
};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Source of the current action descriptor snapshot.
pub trait ActionDescriptorCollectionProvider: Send + Sync {
	/// The current snapshot
	fn action_descriptors(&self) -> Arc<ActionDescriptorCollection>;

	/// A token that fires when the current snapshot is replaced
	fn get_change_token(&self) -> Arc<dyn ChangeToken>;
}

/// A published collection and the token that fires when it is replaced.
struct Snapshot {
	collection: Arc<ActionDescriptorCollection>,
	cancellation_source: ChangeTokenSource,
	change_token: CancellationChangeToken,
}

/// Builds the collection from a set of providers and rebuilds it whenever a
/// change provider signals.
///
/// Readers load the current snapshot without locking. Rebuilds are serialized
/// by `update_lock` and publish in a fixed order: the new collection and its
/// token are swapped in together, and only then is the old token fired. A
/// reader woken by the old token therefore always finds the new collection and
/// a token that has not fired yet.
pub struct DefaultActionDescriptorCollectionProvider {
	providers: Vec<Arc<dyn ActionDescriptorProvider>>,
	change_providers: Vec<Arc<dyn ActionDescriptorChangeProvider>>,
	snapshot: ArcSwapOption<Snapshot>,
	update_lock: Mutex<()>,
	_subscription: Option<ChangeSubscription>,
}

impl DefaultActionDescriptorCollectionProvider {
	/// Create the provider. The collection itself is built on first access.
	pub fn new(
		providers: Vec<Arc<dyn ActionDescriptorProvider>>,
		change_providers: Vec<Arc<dyn ActionDescriptorChangeProvider>>,
	) -> Arc<Self> {
		let mut providers = providers;
		providers.sort_by_key(|provider| provider.order());

		Arc::new_cyclic(|this: &Weak<Self>| {
			let subscription = (!change_providers.is_empty()).then(|| {
				let token_providers = change_providers.clone();
				let this = this.clone();
				change_token::on_change(
					move || {
						change_token::combine(
							token_providers
								.iter()
								.map(|provider| provider.get_change_token())
								.collect(),
						)
					},
					move || {
						if let Some(provider) = this.upgrade() {
							provider.update_collection();
						}
					},
				)
			});

			Self {
				providers,
				change_providers,
				snapshot: ArcSwapOption::empty(),
				update_lock: Mutex::new(()),
				_subscription: subscription,
			}
		})
	}

	pub fn providers(&self) -> &[Arc<dyn ActionDescriptorProvider>] {
		&self.providers
	}

	pub fn change_providers(&self) -> &[Arc<dyn ActionDescriptorChangeProvider>] {
		&self.change_providers
	}

	fn initialize(&self) -> Arc<Snapshot> {
		let _guard = self.update_lock.lock();
		if let Some(snapshot) = self.snapshot.load_full() {
			return snapshot;
		}
		self.publish()
	}

	fn update_collection(&self) {
		let _guard = self.update_lock.lock();
		self.publish();
	}

	fn current(&self) -> Arc<Snapshot> {
		match self.snapshot.load_full() {
			Some(snapshot) => snapshot,
			None => self.initialize(),
		}
	}

	/// Rebuild and publish a snapshot. Caller holds `update_lock`.
	fn publish(&self) -> Arc<Snapshot> {
		let mut context = ActionDescriptorProviderContext::default();
		for provider in &self.providers {
			provider.on_providers_executing(&mut context);
		}
		for provider in self.providers.iter().rev() {
			provider.on_providers_executed(&mut context);
		}

		let previous = self.snapshot.load_full();
		let version = previous
			.as_ref()
			.map_or(0, |current| current.collection.version() + 1);

		let cancellation_source = ChangeTokenSource::new();
		let snapshot = Arc::new(Snapshot {
			collection: Arc::new(ActionDescriptorCollection::new(context.results, version)),
			change_token: cancellation_source.token(),
			cancellation_source,
		});
		self.snapshot.store(Some(Arc::clone(&snapshot)));

		tracing::debug!(
			version,
			count = snapshot.collection.len(),
			"action descriptor collection published"
		);

		if let Some(previous) = previous {
			previous.cancellation_source.cancel();
		}

		snapshot
	}
}

impl ActionDescriptorCollectionProvider for DefaultActionDescriptorCollectionProvider {
	fn action_descriptors(&self) -> Arc<ActionDescriptorCollection> {
		Arc::clone(&self.current().collection)
	}

	fn get_change_token(&self) -> Arc<dyn ChangeToken> {
		Arc::new(self.current().change_token.clone())
	}
}
