//! Action descriptors, descriptor providers and action selection.
//!
//! # Examples
//!
//! ```
//! use ravel::actions::ActionDescriptor;
//!
//! let descriptor = ActionDescriptor::builder("Home.Index")
//! 	.route_value("controller", "Home")
//! 	.route_value("action", "Index")
//! 	.build();
//! assert_eq!(descriptor.display_name(), "Home.Index");
//! assert_eq!(descriptor.route_value("action"), Some("Index"));
//! ```

pub use ravel_actions::*;
