//! Path validation functions

use std::path::{Component, Path};

use super::ValidationError;

/// A symlink target containing `..` components could otherwise be used to
/// escape the host's intended directory tree.
pub fn is_path_safe(path: &Path) -> bool {
	!path.components().any(|c| matches!(c, Component::ParentDir))
}

pub fn validate_path_safe(path: &Path) -> Result<(), ValidationError> {
	if !is_path_safe(path) {
		return Err(ValidationError::PathError(
			"Path contains parent directory reference (..)".to_string(),
		));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_is_path_safe_normal() {
		assert!(is_path_safe(Path::new("file.txt")));
		assert!(is_path_safe(Path::new("dir/file.txt")));
		assert!(is_path_safe(Path::new("a/b/c/file.txt")));
	}

	#[test]
	fn test_is_path_safe_with_parent() {
		assert!(!is_path_safe(Path::new("../file.txt")));
		assert!(!is_path_safe(Path::new("dir/../file.txt")));
		assert!(!is_path_safe(Path::new("a/b/../../file.txt")));
	}

	#[test]
	fn test_validate_path_safe_ok() {
		assert!(validate_path_safe(Path::new("file.txt")).is_ok());
		assert!(validate_path_safe(Path::new("dir/subdir/file.txt")).is_ok());
	}

	#[test]
	fn test_validate_path_safe_err() {
		let result = validate_path_safe(Path::new("../etc/passwd"));
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("parent directory"));
	}
}
