//! Framework settings.
//!
//! Settings are plain serde structs so they can be embedded in an
//! application's own configuration file:
//!
//! ```toml
//! [mvc]
//! exclude_attribute_routed = true
//! log_filter_execution_plan = false
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
	/// The TOML document could not be parsed
	#[error("Invalid TOML settings: {0}")]
	Toml(#[from] toml::de::Error),

	/// The JSON document could not be parsed
	#[error("Invalid JSON settings: {0}")]
	Json(#[from] serde_json::Error),
}

/// Settings consumed by action selection and invocation.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MvcSettings {
	/// Leave attribute-routed actions out of the conventional route lookup table
	pub exclude_attribute_routed: bool,

	/// Emit a debug event listing every filter of each stage before an action runs
	pub log_filter_execution_plan: bool,

	/// Add an HTTP method constraint for descriptors that declare methods
	pub respect_http_method_constraints: bool,

	/// Reuse per-descriptor invoker entries between requests
	pub cache_invokers: bool,
}

impl Default for MvcSettings {
	fn default() -> Self {
		Self {
			exclude_attribute_routed: true,
			log_filter_execution_plan: false,
			respect_http_method_constraints: true,
			cache_invokers: true,
		}
	}
}

impl MvcSettings {
	/// Creates settings with default values.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_exclude_attribute_routed(mut self, value: bool) -> Self {
		self.exclude_attribute_routed = value;
		self
	}

	pub fn with_log_filter_execution_plan(mut self, value: bool) -> Self {
		self.log_filter_execution_plan = value;
		self
	}

	pub fn with_respect_http_method_constraints(mut self, value: bool) -> Self {
		self.respect_http_method_constraints = value;
		self
	}

	pub fn with_cache_invokers(mut self, value: bool) -> Self {
		self.cache_invokers = value;
		self
	}

	/// Parses settings from a TOML document. Missing keys keep their defaults.
	///
	/// # Examples
	///
	/// ```
	/// use ravel_core::settings::MvcSettings;
	///
	/// let settings = MvcSettings::from_toml_str("cache_invokers = false").unwrap();
	/// assert!(!settings.cache_invokers);
	/// assert!(settings.exclude_attribute_routed);
	/// ```
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(source)?)
	}

	/// Parses settings from a JSON document. Missing keys keep their defaults.
	pub fn from_json_str(source: &str) -> Result<Self, SettingsError> {
		Ok(serde_json::from_str(source)?)
	}
}
