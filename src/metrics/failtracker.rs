//! Fail-Tracker: `commitid:<hex>` header + NDJSON failure records, read back
//! by `deploy failures` to redeploy exactly the files that failed last time.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FatalError, FileError};

/// One host's worth of failures from a prior run: every `repo_path` that
/// failed, plus a combined error summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailRecord {
	pub endpoint: String,
	pub files: Vec<String>,
	pub err: String,
}

/// Build a host's [`FailRecord`] from its recorded [`FileError`]s.
pub fn record_for_host(endpoint: &str, failures: &[FileError]) -> FailRecord {
	let files = failures.iter().map(|f| f.repo_path.clone()).collect();
	let err = failures.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("; ");
	FailRecord { endpoint: endpoint.to_string(), files, err }
}

/// Write the fail-tracker file: a `commitid:<hex>` header line followed by
/// one JSON object per failure.
pub fn write(path: &Path, commit_id: &str, records: &[FailRecord]) -> std::io::Result<()> {
	let mut out = format!("commitid:{}\n", commit_id);
	for record in records {
		out.push_str(&serde_json::to_string(record).expect("FailRecord always serializes"));
		out.push('\n');
	}
	fs::write(path, out)
}

/// Read the fail-tracker file back into its commit id and records.
pub fn read(path: &Path) -> Result<(String, Vec<FailRecord>), FatalError> {
	let contents = fs::read_to_string(path)?;
	let mut lines = contents.lines();

	let header = lines
		.next()
		.ok_or_else(|| FatalError::Other { message: "empty fail-tracker file".to_string() })?;
	let commit_id = header
		.strip_prefix("commitid:")
		.ok_or_else(|| FatalError::Other {
			message: format!("malformed fail-tracker header: {}", header),
		})?
		.to_string();

	let mut records = Vec::new();
	for line in lines {
		if line.trim().is_empty() {
			continue;
		}
		let record: FailRecord = serde_json::from_str(line).map_err(|e| FatalError::Other {
			message: format!("invalid fail-tracker record: {}", e),
		})?;
		records.push(record);
	}
	Ok((commit_id, records))
}

/// Project records into the `(host, repo_path)` pairs the Planner's
/// `failures` mode selects directly.
pub fn entries(records: &[FailRecord]) -> Vec<(String, String)> {
	records
		.iter()
		.flat_map(|r| r.files.iter().map(move |f| (r.endpoint.clone(), f.clone())))
		.collect()
}


// vim: ts=4
