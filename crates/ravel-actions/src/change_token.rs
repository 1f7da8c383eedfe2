//! One-shot invalidation tokens.
//!
//! A [`ChangeTokenSource`] owns the right to fire; the [`CancellationChangeToken`]s
//! it hands out observe the firing. Tokens fire at most once. Consumers that
//! want to follow a stream of changes use [`on_change`], which asks a producer
//! for a fresh token after every firing.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Once, Weak};

/// Callback run when a token fires.
pub type ChangeCallback = Box<dyn FnOnce() + Send>;

/// An observable invalidation signal.
pub trait ChangeToken: Send + Sync {
	/// Whether the token has fired
	fn has_changed(&self) -> bool;

	/// Run `callback` when the token fires, or right away if it already has.
	///
	/// Dropping the returned registration unregisters the callback.
	fn register_change_callback(&self, callback: ChangeCallback) -> ChangeRegistration;
}

/// Keeps a callback registered; unregisters it when dropped.
#[must_use = "dropping a registration unregisters its callback"]
pub struct ChangeRegistration {
	unregister: Option<Box<dyn FnOnce() + Send>>,
}

impl ChangeRegistration {
	/// A registration with nothing to undo
	pub fn empty() -> Self {
		Self { unregister: None }
	}

	fn new(unregister: impl FnOnce() + Send + 'static) -> Self {
		Self {
			unregister: Some(Box::new(unregister)),
		}
	}
}

impl Drop for ChangeRegistration {
	fn drop(&mut self) {
		if let Some(unregister) = self.unregister.take() {
			unregister();
		}
	}
}

#[derive(Default)]
struct TokenState {
	fired: AtomicBool,
	next_id: AtomicU64,
	callbacks: Mutex<Vec<(u64, ChangeCallback)>>,
}

impl TokenState {
	fn register(self: &Arc<Self>, callback: ChangeCallback) -> ChangeRegistration {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		{
			let mut callbacks = self.callbacks.lock();
			if !self.fired.load(Ordering::Acquire) {
				callbacks.push((id, callback));
				let state = Arc::downgrade(self);
				return ChangeRegistration::new(move || {
					if let Some(state) = state.upgrade() {
						state.callbacks.lock().retain(|(existing, _)| *existing != id);
					}
				});
			}
		}
		callback();
		ChangeRegistration::empty()
	}

	fn fire(&self) {
		if self.fired.swap(true, Ordering::AcqRel) {
			return;
		}
		let callbacks = std::mem::take(&mut *self.callbacks.lock());
		for (_, callback) in callbacks {
			callback();
		}
	}
}

/// The firing side of a [`CancellationChangeToken`].
#[derive(Clone, Default)]
pub struct ChangeTokenSource {
	state: Arc<TokenState>,
}

impl ChangeTokenSource {
	pub fn new() -> Self {
		Self::default()
	}

	/// A token observing this source
	pub fn token(&self) -> CancellationChangeToken {
		CancellationChangeToken {
			state: Arc::clone(&self.state),
		}
	}

	/// Fire every token of this source. Later calls do nothing.
	///
	/// # Examples
	///
	/// ```
	/// use ravel_actions::change_token::{ChangeToken, ChangeTokenSource};
	/// use std::sync::Arc;
	/// use std::sync::atomic::{AtomicBool, Ordering};
	///
	/// let source = ChangeTokenSource::new();
	/// let token = source.token();
	/// let fired = Arc::new(AtomicBool::new(false));
	/// let flag = fired.clone();
	/// let _registration = token.register_change_callback(Box::new(move || {
	/// 	flag.store(true, Ordering::SeqCst);
	/// }));
	///
	/// source.cancel();
	/// assert!(token.has_changed());
	/// assert!(fired.load(Ordering::SeqCst));
	/// ```
	pub fn cancel(&self) {
		self.state.fire();
	}

	pub fn is_cancelled(&self) -> bool {
		self.state.fired.load(Ordering::Acquire)
	}
}

/// Token that fires when its [`ChangeTokenSource`] is cancelled.
///
/// `Default` gives a token whose source is already gone, so it never fires.
#[derive(Clone, Default)]
pub struct CancellationChangeToken {
	state: Arc<TokenState>,
}

impl ChangeToken for CancellationChangeToken {
	fn has_changed(&self) -> bool {
		self.state.fired.load(Ordering::Acquire)
	}

	fn register_change_callback(&self, callback: ChangeCallback) -> ChangeRegistration {
		self.state.register(callback)
	}
}

/// Fires as soon as any of its member tokens fires.
pub struct CompositeChangeToken {
	tokens: Vec<Arc<dyn ChangeToken>>,
	source: ChangeTokenSource,
	wired: Once,
	member_registrations: Mutex<Vec<ChangeRegistration>>,
}

impl CompositeChangeToken {
	pub fn new(tokens: Vec<Arc<dyn ChangeToken>>) -> Self {
		Self {
			tokens,
			source: ChangeTokenSource::new(),
			wired: Once::new(),
			member_registrations: Mutex::new(Vec::new()),
		}
	}

	pub fn tokens(&self) -> &[Arc<dyn ChangeToken>] {
		&self.tokens
	}

	fn wire_members(&self) {
		self.wired.call_once(|| {
			let registrations = self
				.tokens
				.iter()
				.map(|token| {
					let source = self.source.clone();
					token.register_change_callback(Box::new(move || source.cancel()))
				})
				.collect();
			*self.member_registrations.lock() = registrations;
		});
	}
}

impl ChangeToken for CompositeChangeToken {
	fn has_changed(&self) -> bool {
		self.source.is_cancelled() || self.tokens.iter().any(|token| token.has_changed())
	}

	fn register_change_callback(&self, callback: ChangeCallback) -> ChangeRegistration {
		self.wire_members();
		self.source.token().register_change_callback(callback)
	}
}

/// Combine several tokens: a single token is passed through, several are
/// wrapped in a [`CompositeChangeToken`].
pub fn combine(mut tokens: Vec<Arc<dyn ChangeToken>>) -> Arc<dyn ChangeToken> {
	match tokens.len() {
		0 => Arc::new(CancellationChangeToken::default()),
		1 => tokens.remove(0),
		_ => Arc::new(CompositeChangeToken::new(tokens)),
	}
}

type TokenProducer = Box<dyn Fn() -> Arc<dyn ChangeToken> + Send + Sync>;
type ChangeConsumer = Box<dyn Fn() + Send + Sync>;

struct Subscription {
	producer: TokenProducer,
	consumer: ChangeConsumer,
	generation: AtomicU64,
	disposed: AtomicBool,
	registration: Mutex<Option<TokenRegistration>>,
}

/// A registration together with the token it was made on.
///
/// A composite token only forwards its members while it is alive, so the
/// subscription owns the token for as long as the registration is active.
struct TokenRegistration {
	_registration: ChangeRegistration,
	_token: Arc<dyn ChangeToken>,
}

impl Subscription {
	fn subscribe(this: &Arc<Self>) {
		if this.disposed.load(Ordering::Acquire) {
			return;
		}
		let generation = this.generation.fetch_add(1, Ordering::AcqRel) + 1;
		let token = (this.producer)();
		let weak: Weak<Self> = Arc::downgrade(this);
		let registration = token.register_change_callback(Box::new(move || {
			if let Some(subscription) = weak.upgrade()
				&& !subscription.disposed.load(Ordering::Acquire)
			{
				(subscription.consumer)();
				Subscription::subscribe(&subscription);
			}
		}));
		let registration = TokenRegistration {
			_registration: registration,
			_token: token,
		};

		// A token that had already fired re-subscribed inline; keep the newest registration.
		let superseded = {
			let mut slot = this.registration.lock();
			if this.generation.load(Ordering::Acquire) == generation {
				slot.replace(registration)
			} else {
				Some(registration)
			}
		};
		drop(superseded);
	}
}

/// Handle returned by [`on_change`]; dropping it stops the subscription.
pub struct ChangeSubscription {
	inner: Arc<Subscription>,
}

impl Drop for ChangeSubscription {
	fn drop(&mut self) {
		self.inner.disposed.store(true, Ordering::Release);
		let registration = self.inner.registration.lock().take();
		drop(registration);
	}
}

/// Call `consumer` every time the token produced by `producer` fires.
///
/// After each firing a new token is requested from `producer`, so the
/// consumer keeps following changes until the returned subscription is dropped.
pub fn on_change<P, C>(producer: P, consumer: C) -> ChangeSubscription
where
	P: Fn() -> Arc<dyn ChangeToken> + Send + Sync + 'static,
	C: Fn() + Send + Sync + 'static,
{
	let inner = Arc::new(Subscription {
		producer: Box::new(producer),
		consumer: Box::new(consumer),
		generation: AtomicU64::new(0),
		disposed: AtomicBool::new(false),
		registration: Mutex::new(None),
	});
	Subscription::subscribe(&inner);
	ChangeSubscription { inner }
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::atomic::AtomicUsize;

	fn counter() -> (Arc<AtomicUsize>, ChangeCallback) {
		let count = Arc::new(AtomicUsize::new(0));
		let handle = count.clone();
		(
			count,
			Box::new(move || {
				handle.fetch_add(1, Ordering::SeqCst);
			}),
		)
	}

	#[rstest]
	fn test_cancel_fires_callbacks_once() {
		// Arrange
		let source = ChangeTokenSource::new();
		let (count, callback) = counter();
		let _registration = source.token().register_change_callback(callback);

		// Act
		source.cancel();
		source.cancel();

		// Assert
		assert_eq!(count.load(Ordering::SeqCst), 1);
		assert!(source.is_cancelled());
	}

	#[rstest]
	fn test_register_after_cancel_runs_immediately() {
		let source = ChangeTokenSource::new();
		source.cancel();
		let (count, callback) = counter();

		let _registration = source.token().register_change_callback(callback);

		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	fn test_dropped_registration_is_not_called() {
		let source = ChangeTokenSource::new();
		let (count, callback) = counter();

		drop(source.token().register_change_callback(callback));
		source.cancel();

		assert_eq!(count.load(Ordering::SeqCst), 0);
	}

	#[rstest]
	fn test_composite_fires_when_any_member_fires() {
		// Arrange
		let first = ChangeTokenSource::new();
		let second = ChangeTokenSource::new();
		let composite = CompositeChangeToken::new(vec![
			Arc::new(first.token()),
			Arc::new(second.token()),
		]);
		let (count, callback) = counter();
		let _registration = composite.register_change_callback(callback);

		// Act
		second.cancel();

		// Assert
		assert!(composite.has_changed());
		assert_eq!(count.load(Ordering::SeqCst), 1);

		first.cancel();
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	fn test_combine_passes_single_token_through() {
		let source = ChangeTokenSource::new();
		let token: Arc<dyn ChangeToken> = Arc::new(source.token());

		let combined = combine(vec![token.clone()]);

		assert!(Arc::ptr_eq(&combined, &token));
	}

	#[rstest]
	fn test_on_change_resubscribes_after_each_firing() {
		// Arrange
		let current = Arc::new(Mutex::new(ChangeTokenSource::new()));
		let producer_source = current.clone();
		let calls = Arc::new(AtomicUsize::new(0));
		let consumer_calls = calls.clone();
		let subscription = on_change(
			move || Arc::new(producer_source.lock().token()) as Arc<dyn ChangeToken>,
			move || {
				consumer_calls.fetch_add(1, Ordering::SeqCst);
			},
		);
		let notify = |current: &Arc<Mutex<ChangeTokenSource>>| {
			let previous = std::mem::replace(&mut *current.lock(), ChangeTokenSource::new());
			previous.cancel();
		};

		// Act
		notify(&current);
		notify(&current);

		// Assert
		assert_eq!(calls.load(Ordering::SeqCst), 2);

		drop(subscription);
		notify(&current);
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[rstest]
	fn test_on_change_follows_composite_of_several_sources() {
		// Arrange
		let first = Arc::new(Mutex::new(ChangeTokenSource::new()));
		let second = Arc::new(Mutex::new(ChangeTokenSource::new()));
		let (producer_first, producer_second) = (first.clone(), second.clone());
		let calls = Arc::new(AtomicUsize::new(0));
		let consumer_calls = calls.clone();
		let _subscription = on_change(
			move || {
				combine(vec![
					Arc::new(producer_first.lock().token()),
					Arc::new(producer_second.lock().token()),
				])
			},
			move || {
				consumer_calls.fetch_add(1, Ordering::SeqCst);
			},
		);
		let notify = |current: &Arc<Mutex<ChangeTokenSource>>| {
			let previous = std::mem::replace(&mut *current.lock(), ChangeTokenSource::new());
			previous.cancel();
		};

		// Act
		notify(&second);
		notify(&first);

		// Assert
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}
}
