//! # Ravel Core
//!
//! Error types and settings shared by every Ravel crate.

pub mod exception;
pub mod settings;

pub use exception::{Error, Result};
pub use settings::{MvcSettings, SettingsError};
