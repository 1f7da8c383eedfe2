//! Type-keyed storage attached to a request.
//!
//! An [`HttpContext`](crate::HttpContext) carries two of these: one for
//! request services (controller dependencies, filter factories' inputs) and
//! one for per-request items that filters hand to each other.

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Type-keyed value storage. Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct Extensions {
	map: Arc<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl Extensions {
	/// Create an empty store
	///
	/// # Examples
	///
	/// ```
	/// use ravel_http::Extensions;
	///
	/// let extensions = Extensions::new();
	/// assert!(extensions.is_empty());
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a value, returning the previous value of the same type
	///
	/// # Examples
	///
	/// ```
	/// use ravel_http::Extensions;
	///
	/// let extensions = Extensions::new();
	/// assert_eq!(extensions.insert(1u32), None);
	/// assert_eq!(extensions.insert(2u32), Some(1));
	/// ```
	pub fn insert<T: Send + Sync + 'static>(&self, value: T) -> Option<T> {
		self.map
			.lock()
			.insert(TypeId::of::<T>(), Box::new(value))
			.and_then(|previous| previous.downcast::<T>().ok())
			.map(|previous| *previous)
	}

	/// Get a clone of the stored value
	///
	/// Services are usually stored as `Arc<T>` so that this clone is cheap.
	pub fn get<T>(&self) -> Option<T>
	where
		T: Clone + Send + Sync + 'static,
	{
		self.map
			.lock()
			.get(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast_ref::<T>())
			.cloned()
	}

	pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
		self.map.lock().contains_key(&TypeId::of::<T>())
	}

	/// Remove a value and return it
	pub fn remove<T: Send + Sync + 'static>(&self) -> Option<T> {
		self.map
			.lock()
			.remove(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast::<T>().ok())
			.map(|value| *value)
	}

	pub fn len(&self) -> usize {
		self.map.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.map.lock().is_empty()
	}
}

impl std::fmt::Debug for Extensions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Extensions")
			.field("len", &self.len())
			.finish()
	}
}
