//! Conventional route lookup table.
//!
//! Every descriptor is keyed by the tuple of its route values, laid out in
//! the sorted order of all route keys known to the collection. Two maps are
//! kept: one keyed by the exact tuple and one keyed case-insensitively. All
//! casings of the same logical tuple share a single candidate list, so an
//! exact-case hit and an ignore-case hit return the same list instance.

use crate::collection::ActionDescriptorCollection;
use crate::descriptor::ActionDescriptor;
use crate::values::{RouteValueDictionary, value_to_string};
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A tuple of route values compared case-insensitively.
#[derive(Debug, Clone)]
struct IgnoreCaseKey(Vec<String>);

/// Simple case fold: one char in, one char out. Characters whose lowercase
/// form expands to several chars (such as `İ`) are kept as they are.
fn fold_char(c: char) -> char {
	let mut lower = c.to_lowercase();
	match (lower.next(), lower.next()) {
		(Some(single), None) => single,
		_ => c,
	}
}

fn folded(value: &str) -> impl Iterator<Item = char> + '_ {
	value.chars().map(fold_char)
}

impl PartialEq for IgnoreCaseKey {
	fn eq(&self, other: &Self) -> bool {
		self.0.len() == other.0.len()
			&& self
				.0
				.iter()
				.zip(&other.0)
				.all(|(left, right)| folded(left).eq(folded(right)))
	}
}

impl Eq for IgnoreCaseKey {}

impl Hash for IgnoreCaseKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_usize(self.0.len());
		for value in &self.0 {
			for c in folded(value) {
				c.hash(state);
			}
			state.write_u8(0xff);
		}
	}
}

/// Route-value lookup table built from one collection version.
#[derive(Debug)]
pub struct ActionSelectionTable<T> {
	version: u64,
	route_keys: Vec<String>,
	ordinal_entries: HashMap<Vec<String>, Arc<[T]>>,
	ordinal_ignore_case_entries: HashMap<IgnoreCaseKey, Arc<[T]>>,
	empty: Arc<[T]>,
}

impl ActionSelectionTable<Arc<ActionDescriptor>> {
	/// Build the table for conventional dispatch.
	///
	/// With `exclude_attribute_routed` set, descriptors carrying an attribute
	/// route template are left out entirely, including their route keys.
	pub fn create(collection: &ActionDescriptorCollection, exclude_attribute_routed: bool) -> Self {
		let items = collection
			.items()
			.iter()
			.filter(|descriptor| {
				!(exclude_attribute_routed && descriptor.attribute_route_info().is_some())
			})
			.cloned();

		Self::create_with(
			collection.version(),
			items,
			|descriptor| {
				descriptor
					.route_values()
					.iter()
					.map(|(key, _)| key.clone())
					.collect()
			},
			|descriptor, key| descriptor.route_value(key).map(str::to_string),
		)
	}
}

impl<T: Clone> ActionSelectionTable<T> {
	/// Build a table from arbitrary items.
	///
	/// `route_keys` lists the keys an item cares about; `route_value` yields
	/// its required value for a key. A missing value is the empty string.
	pub fn create_with<I, K, V>(version: u64, items: I, route_keys: K, route_value: V) -> Self
	where
		I: IntoIterator<Item = T>,
		K: Fn(&T) -> Vec<String>,
		V: Fn(&T, &str) -> Option<String>,
	{
		let items: Vec<T> = items.into_iter().collect();

		let mut ordered_keys: BTreeMap<String, String> = BTreeMap::new();
		for item in &items {
			for key in route_keys(item) {
				ordered_keys.entry(folded(&key).collect()).or_insert(key);
			}
		}
		let route_keys: Vec<String> = ordered_keys.into_values().collect();

		let mut groups: Vec<Vec<T>> = Vec::new();
		let mut ignore_case_index: HashMap<IgnoreCaseKey, usize> = HashMap::new();
		let mut ordinal_index: HashMap<Vec<String>, usize> = HashMap::new();

		for item in items {
			let values: Vec<String> = route_keys
				.iter()
				.map(|key| route_value(&item, key).unwrap_or_default())
				.collect();

			let group = *ignore_case_index
				.entry(IgnoreCaseKey(values.clone()))
				.or_insert_with(|| {
					groups.push(Vec::new());
					groups.len() - 1
				});
			groups[group].push(item);

			// The first casing seen for a tuple owns the exact-case slot.
			ordinal_index.entry(values).or_insert(group);
		}

		let frozen: Vec<Arc<[T]>> = groups.into_iter().map(Arc::from).collect();

		Self {
			version,
			route_keys,
			ordinal_entries: ordinal_index
				.into_iter()
				.map(|(key, group)| (key, Arc::clone(&frozen[group])))
				.collect(),
			ordinal_ignore_case_entries: ignore_case_index
				.into_iter()
				.map(|(key, group)| (key, Arc::clone(&frozen[group])))
				.collect(),
			empty: Arc::from(Vec::new()),
		}
	}

	/// Version of the collection this table was built from
	pub fn version(&self) -> u64 {
		self.version
	}

	/// All known route keys in lookup order
	pub fn route_keys(&self) -> &[String] {
		&self.route_keys
	}

	/// Candidates whose route values match `values`.
	///
	/// An exact-case match is tried first, then a case-insensitive one.
	/// No match yields an empty list.
	pub fn select(&self, values: &RouteValueDictionary) -> Arc<[T]> {
		let tuple: Vec<String> = self
			.route_keys
			.iter()
			.map(|key| values.get(key).and_then(value_to_string).unwrap_or_default())
			.collect();

		if let Some(matches) = self.ordinal_entries.get(&tuple) {
			return Arc::clone(matches);
		}

		self.ordinal_ignore_case_entries
			.get(&IgnoreCaseKey(tuple))
			.map(Arc::clone)
			.unwrap_or_else(|| Arc::clone(&self.empty))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::descriptor::AttributeRouteInfo;
	use rstest::rstest;
	use serde_json::json;

	fn action(name: &str, values: &[(&str, &str)]) -> Arc<ActionDescriptor> {
		let builder = values
			.iter()
			.fold(ActionDescriptor::builder(name), |builder, (key, value)| {
				builder.route_value(*key, *value)
			});
		Arc::new(builder.build())
	}

	fn names(matches: &[Arc<ActionDescriptor>]) -> Vec<&str> {
		matches.iter().map(|action| action.display_name()).collect()
	}

	#[rstest]
	fn test_route_keys_are_sorted_and_deduplicated() {
		let collection = ActionDescriptorCollection::new(
			vec![
				action("A", &[("controller", "Home"), ("action", "Index")]),
				action("B", &[("Area", "Admin"), ("Controller", "Users")]),
			],
			0,
		);

		let table = ActionSelectionTable::create(&collection, true);

		assert_eq!(table.route_keys(), ["action", "Area", "controller"]);
	}

	#[rstest]
	fn test_case_variants_share_one_list() {
		// Arrange
		let collection = ActionDescriptorCollection::new(
			vec![
				action("Upper", &[("controller", "Home"), ("action", "Index")]),
				action("Lower", &[("controller", "Home"), ("action", "index")]),
			],
			3,
		);
		let table = ActionSelectionTable::create(&collection, true);

		// Act
		let upper = table.select(&RouteValueDictionary::from([("controller", "Home"), ("action", "Index")]));
		let lower = table.select(&RouteValueDictionary::from([("controller", "Home"), ("action", "index")]));
		let shouting = table.select(&RouteValueDictionary::from([("controller", "HOME"), ("action", "INDEX")]));

		// Assert
		assert_eq!(names(&upper), ["Upper", "Lower"]);
		assert!(Arc::ptr_eq(&upper, &lower));
		assert!(Arc::ptr_eq(&upper, &shouting));
		assert_eq!(table.version(), 3);
	}

	#[rstest]
	#[case::accented_capitals("ÉTÉ", 1)]
	#[case::accented_lower("été", 1)]
	#[case::dotted_capital_i("İNDEX", 1)]
	#[case::expanded_lowercase("i\u{307}ndex", 0)]
	#[case::plain_i("index", 0)]
	fn test_ignore_case_lookup_folds_one_char_at_a_time(#[case] requested: &str, #[case] expected: usize) {
		// Arrange
		let collection = ActionDescriptorCollection::new(
			vec![
				action("Season", &[("controller", "Été")]),
				action("Dotted", &[("controller", "İndex")]),
			],
			0,
		);
		let table = ActionSelectionTable::create(&collection, true);

		// Act
		let matches = table.select(&RouteValueDictionary::from([("controller", requested)]));

		// Assert
		assert_eq!(matches.len(), expected);
	}

	#[rstest]
	fn test_missing_null_and_empty_values_are_equal() {
		let collection = ActionDescriptorCollection::new(
			vec![
				action("Admin", &[("area", "Admin"), ("controller", "Home")]),
				action("Root", &[("controller", "Home")]),
			],
			0,
		);
		let table = ActionSelectionTable::create(&collection, true);

		let missing = table.select(&RouteValueDictionary::from([("controller", "Home")]));
		let null = table.select(&RouteValueDictionary::from([
			("controller", json!("Home")),
			("area", json!(null)),
		]));
		let empty = table.select(&RouteValueDictionary::from([("controller", "Home"), ("area", "")]));

		assert_eq!(names(&missing), ["Root"]);
		assert!(Arc::ptr_eq(&missing, &null));
		assert!(Arc::ptr_eq(&missing, &empty));
	}

	#[rstest]
	fn test_non_string_request_values_are_converted() {
		let collection = ActionDescriptorCollection::new(
			vec![action("Page", &[("controller", "Docs"), ("page", "42")])],
			0,
		);
		let table = ActionSelectionTable::create(&collection, true);

		let matches = table.select(&RouteValueDictionary::from([
			("controller", json!("Docs")),
			("page", json!(42)),
		]));

		assert_eq!(names(&matches), ["Page"]);
	}

	#[rstest]
	fn test_no_match_returns_empty_list() {
		let collection = ActionDescriptorCollection::new(vec![action("A", &[("controller", "Home")])], 0);
		let table = ActionSelectionTable::create(&collection, true);

		let matches = table.select(&RouteValueDictionary::from([("controller", "Missing")]));

		assert!(matches.is_empty());
	}

	#[rstest]
	#[case::excluded(true, 0)]
	#[case::included(false, 1)]
	fn test_attribute_routed_actions(#[case] exclude: bool, #[case] expected: usize) {
		// Arrange
		let routed = ActionDescriptor::builder("Api.Get")
			.route_value("controller", "Api")
			.attribute_route(AttributeRouteInfo::new("api/items/{id}"))
			.build();
		let collection = ActionDescriptorCollection::new(vec![Arc::new(routed)], 0);

		// Act
		let table = ActionSelectionTable::create(&collection, exclude);
		let matches = table.select(&RouteValueDictionary::from([("controller", "Api")]));

		// Assert
		assert_eq!(matches.len(), expected);
	}
}
