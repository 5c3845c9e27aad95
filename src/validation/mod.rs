//! Centralized validation system for the deployment engine
//!
//! Provides common validation functions and traits for path safety -
//! repo paths and symlink targets must never escape the remote root via
//! `..` components.

use std::error::Error;
use std::fmt;

pub mod path;

pub use path::*;

/// Generic validation error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
	/// Invalid path
	PathError(String),
	/// Other validation error
	Other(String),
}

impl fmt::Display for ValidationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ValidationError::PathError(msg) => write!(f, "Path validation error: {}", msg),
			ValidationError::Other(msg) => write!(f, "Validation error: {}", msg),
		}
	}
}

impl Error for ValidationError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_validation_error_display() {
		let err = ValidationError::Other("test error".to_string());
		assert!(err.to_string().contains("Validation error"));
	}

	#[test]
	fn test_validation_error_equality() {
		let err1 = ValidationError::PathError("test".to_string());
		let err2 = ValidationError::PathError("test".to_string());
		assert_eq!(err1, err2);
	}
}
