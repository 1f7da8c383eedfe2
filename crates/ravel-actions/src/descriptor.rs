//! Action descriptors: the immutable description of one invocable action.

use crate::constraint::ActionConstraint;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Route template information for attribute-routed actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRouteInfo {
	pub template: String,
	pub name: Option<String>,
	pub order: i32,
}

impl AttributeRouteInfo {
	pub fn new(template: impl Into<String>) -> Self {
		Self {
			template: template.into(),
			name: None,
			order: 0,
		}
	}
}

/// Describes one action. Immutable once built; shared through `Arc`.
///
/// Layers above this crate attach their own data (the handler method, the
/// controller factory, filters) as typed metadata, so descriptors stay
/// independent of how actions are invoked.
pub struct ActionDescriptor {
	id: Uuid,
	display_name: String,
	route_values: Vec<(String, String)>,
	attribute_route_info: Option<AttributeRouteInfo>,
	action_constraints: Vec<Arc<dyn ActionConstraint>>,
	http_methods: Vec<String>,
	properties: HashMap<String, Value>,
	metadata: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ActionDescriptor {
	/// Start building a descriptor with the given display name
	///
	/// # Examples
	///
	/// ```
	/// use ravel_actions::descriptor::ActionDescriptor;
	///
	/// let descriptor = ActionDescriptor::builder("Home.Index")
	/// 	.route_value("controller", "Home")
	/// 	.route_value("action", "Index")
	/// 	.http_methods(["GET"])
	/// 	.build();
	///
	/// assert_eq!(descriptor.route_value("Controller"), Some("Home"));
	/// assert_eq!(descriptor.http_methods(), ["GET"]);
	/// ```
	pub fn builder(display_name: impl Into<String>) -> ActionDescriptorBuilder {
		ActionDescriptorBuilder::new(display_name)
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	pub fn display_name(&self) -> &str {
		&self.display_name
	}

	pub fn route_values(&self) -> &[(String, String)] {
		&self.route_values
	}

	/// Required route value for `key`, compared case-insensitively
	pub fn route_value(&self, key: &str) -> Option<&str> {
		self.route_values
			.iter()
			.find(|(existing, _)| existing.eq_ignore_ascii_case(key))
			.map(|(_, value)| value.as_str())
	}

	pub fn attribute_route_info(&self) -> Option<&AttributeRouteInfo> {
		self.attribute_route_info.as_ref()
	}

	pub fn action_constraints(&self) -> &[Arc<dyn ActionConstraint>] {
		&self.action_constraints
	}

	pub fn http_methods(&self) -> &[String] {
		&self.http_methods
	}

	pub fn properties(&self) -> &HashMap<String, Value> {
		&self.properties
	}

	/// Typed metadata attached at build time
	pub fn metadata<T: Any + Send + Sync>(&self) -> Option<&T> {
		self.metadata
			.get(&TypeId::of::<T>())
			.and_then(|value| value.downcast_ref::<T>())
	}
}

impl fmt::Debug for ActionDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActionDescriptor")
			.field("id", &self.id)
			.field("display_name", &self.display_name)
			.field("route_values", &self.route_values)
			.field("attribute_route_info", &self.attribute_route_info)
			.field("action_constraints", &self.action_constraints.len())
			.field("http_methods", &self.http_methods)
			.finish_non_exhaustive()
	}
}

/// Builder for [`ActionDescriptor`].
pub struct ActionDescriptorBuilder {
	descriptor: ActionDescriptor,
}

impl ActionDescriptorBuilder {
	fn new(display_name: impl Into<String>) -> Self {
		Self {
			descriptor: ActionDescriptor {
				id: Uuid::new_v4(),
				display_name: display_name.into(),
				route_values: Vec::new(),
				attribute_route_info: None,
				action_constraints: Vec::new(),
				http_methods: Vec::new(),
				properties: HashMap::new(),
				metadata: HashMap::new(),
			},
		}
	}

	/// Use a fixed id instead of a generated one
	pub fn id(mut self, id: Uuid) -> Self {
		self.descriptor.id = id;
		self
	}

	/// Require a route value. A later value for the same key (any casing) replaces the earlier one.
	pub fn route_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		let key = key.into();
		let value = value.into();
		let route_values = &mut self.descriptor.route_values;
		match route_values
			.iter_mut()
			.find(|(existing, _)| existing.eq_ignore_ascii_case(&key))
		{
			Some(entry) => entry.1 = value,
			None => route_values.push((key, value)),
		}
		self
	}

	pub fn attribute_route(mut self, info: AttributeRouteInfo) -> Self {
		self.descriptor.attribute_route_info = Some(info);
		self
	}

	pub fn constraint(mut self, constraint: Arc<dyn ActionConstraint>) -> Self {
		self.descriptor.action_constraints.push(constraint);
		self
	}

	pub fn http_methods<I, S>(mut self, methods: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.descriptor.http_methods = methods.into_iter().map(Into::into).collect();
		self
	}

	pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.descriptor.properties.insert(key.into(), value.into());
		self
	}

	/// Attach typed metadata; one value per type
	pub fn metadata<T: Any + Send + Sync>(mut self, value: T) -> Self {
		self.descriptor
			.metadata
			.insert(TypeId::of::<T>(), Arc::new(value));
		self
	}

	pub fn build(self) -> ActionDescriptor {
		self.descriptor
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[derive(Debug, PartialEq)]
	struct Area(&'static str);

	#[rstest]
	fn test_route_value_replaces_same_key() {
		let descriptor = ActionDescriptor::builder("Home.Index")
			.route_value("action", "Index")
			.route_value("Action", "List")
			.build();

		assert_eq!(descriptor.route_values(), [("action".to_string(), "List".to_string())]);
	}

	#[rstest]
	fn test_metadata_lookup_by_type() {
		// Arrange
		let descriptor = ActionDescriptor::builder("Admin.Users")
			.metadata(Area("admin"))
			.build();

		// Act
		let area = descriptor.metadata::<Area>();

		// Assert
		assert_eq!(area, Some(&Area("admin")));
		assert!(descriptor.metadata::<String>().is_none());
	}

	#[rstest]
	fn test_ids_are_unique() {
		let first = ActionDescriptor::builder("A").build();
		let second = ActionDescriptor::builder("A").build();

		assert_ne!(first.id(), second.id());
	}
}
