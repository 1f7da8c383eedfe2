//! Error and settings types shared by every Ravel crate.
//!
//! # Examples
//!
//! ```
//! use ravel::core::settings::MvcSettings;
//!
//! let settings = MvcSettings::from_toml_str("log_filter_execution_plan = true").unwrap();
//! assert!(settings.log_filter_execution_plan);
//! ```

pub use ravel_core::*;
