//! Case-insensitive, insertion-ordered value dictionaries.

use serde_json::Value;

/// A small map from case-insensitive keys to JSON values.
///
/// Keys keep the casing they were first inserted with. Lookups compare keys
/// with ASCII case folding, matching how route and argument names are
/// compared everywhere in Ravel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueDictionary {
	entries: Vec<(String, Value)>,
}

/// Route values extracted from a matched request.
pub type RouteValueDictionary = ValueDictionary;

impl ValueDictionary {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert or replace a value, returning the previous value for the key
	///
	/// # Examples
	///
	/// ```
	/// use ravel_actions::values::ValueDictionary;
	///
	/// let mut values = ValueDictionary::new();
	/// values.insert("Controller", "Home");
	/// let previous = values.insert("controller", "Blog");
	///
	/// assert_eq!(previous, Some("Home".into()));
	/// assert_eq!(values.get_str("CONTROLLER").as_deref(), Some("Blog"));
	/// assert_eq!(values.len(), 1);
	/// ```
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		let key = key.into();
		let value = value.into();
		match self.position(&key) {
			Some(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
			None => {
				self.entries.push((key, value));
				None
			}
		}
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.position(key).map(|index| &self.entries[index].1)
	}

	/// The value for `key` converted to its invariant string form.
	///
	/// `null` yields `None`; see [`value_to_string`].
	pub fn get_str(&self, key: &str) -> Option<String> {
		self.get(key).and_then(value_to_string)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.position(key).is_some()
	}

	pub fn remove(&mut self, key: &str) -> Option<Value> {
		self.position(key).map(|index| self.entries.remove(index).1)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(key, _)| key.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.entries.iter().map(|(key, value)| (key.as_str(), value))
	}

	fn position(&self, key: &str) -> Option<usize> {
		self.entries
			.iter()
			.position(|(existing, _)| existing.eq_ignore_ascii_case(key))
	}
}

impl<K, V> FromIterator<(K, V)> for ValueDictionary
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut values = Self::new();
		for (key, value) in iter {
			values.insert(key, value);
		}
		values
	}
}

impl<K, V, const N: usize> From<[(K, V); N]> for ValueDictionary
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from(entries: [(K, V); N]) -> Self {
		entries.into_iter().collect()
	}
}

/// Converts a route value to the string used for matching.
///
/// Strings are used as-is, `null` has no string form, and every other value
/// uses its culture-independent JSON rendering (`42`, `true`, `1.5`).
pub fn value_to_string(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(text) => Some(text.clone()),
		other => Some(other.to_string()),
	}
}
