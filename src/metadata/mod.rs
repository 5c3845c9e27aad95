//! Metadata header parsing
//!
//! The per-file contract (owner, permissions, dependencies, commands,
//! reload grouping, ...) is carried as a JSON object embedded between two
//! occurrences of the literal delimiter `#|^^^|#` in the repo file, or as
//! the whole body of a `.directory-metadata.json` file.

mod header;

pub use header::{extract_header, strip_comment_markers, DELIMITER};

use serde::{Deserialize, Serialize};

/// The parsed per-file contract. Field names mirror the wire JSON exactly
/// via `serde` rename attributes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetadataHeader {
	#[serde(rename = "FileOwnerGroup")]
	pub file_owner_group: String,

	#[serde(rename = "FilePermissions")]
	pub file_permissions: u32,

	#[serde(rename = "ExternalContentLocation", skip_serializing_if = "Option::is_none")]
	pub external_content_location: Option<String>,

	#[serde(rename = "SymbolicLinkTarget", skip_serializing_if = "Option::is_none")]
	pub symbolic_link_target: Option<String>,

	#[serde(rename = "Dependencies", default)]
	pub dependencies: Vec<String>,

	#[serde(rename = "PreDeploy", default)]
	pub pre_deploy: Vec<String>,

	#[serde(rename = "Install", default)]
	pub install: Vec<String>,

	#[serde(rename = "Checks", default)]
	pub checks: Vec<String>,

	#[serde(rename = "Reload", default)]
	pub reload: Vec<String>,

	#[serde(rename = "ReloadGroup", skip_serializing_if = "Option::is_none")]
	pub reload_group: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_minimal_header() {
		let json = r#"{ "FileOwnerGroup": "root:root", "FilePermissions": 644 }"#;
		let header: MetadataHeader = serde_json::from_str(json).unwrap();
		assert_eq!(header.file_owner_group, "root:root");
		assert_eq!(header.file_permissions, 644);
		assert!(header.dependencies.is_empty());
	}

	#[test]
	fn parses_full_header() {
		let json = r#"{
			"FileOwnerGroup": "root:root",
			"FilePermissions": 644,
			"ExternalContentLocation": "file:///abs/path",
			"Dependencies": ["a/b"],
			"PreDeploy": ["echo hi"],
			"Install": ["apt-get install -y foo"],
			"Checks": ["test -f /etc/foo"],
			"Reload": ["systemctl restart foo"],
			"ReloadGroup": "foo-group"
		}"#;
		let header: MetadataHeader = serde_json::from_str(json).unwrap();
		assert_eq!(header.external_content_location.as_deref(), Some("file:///abs/path"));
		assert_eq!(header.reload_group.as_deref(), Some("foo-group"));
		assert_eq!(header.dependencies, vec!["a/b".to_string()]);
	}
}

// vim: ts=4
