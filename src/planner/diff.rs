//! Commit resolution and change classification.

use crate::error::FatalError;
use crate::repo::{CommitId, EntryMode, FileChange, RepoReader};
use crate::types::{Action, PlanMode};

const DIRECTORY_METADATA_SUFFIX: &str = ".directory-metadata.json";

fn is_directory_metadata(repo_path: &str) -> bool {
	repo_path.ends_with(DIRECTORY_METADATA_SUFFIX)
}

/// One raw (repo_path, action) pair before universal-group filtering,
/// before symlink resolution, and before dependency ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
	pub repo_path: String,
	pub action: Action,
}

/// Resolve the commit to deploy, given the run mode.
pub fn resolve_commit(
	repo: &dyn RepoReader,
	mode: PlanMode,
	requested: Option<&str>,
	failtracker_commit: Option<&str>,
) -> Result<CommitId, FatalError> {
	match mode {
		PlanMode::Failures => {
			let commit = failtracker_commit.ok_or_else(|| FatalError::Other {
				message: "redeploy-failures mode requires a fail-tracker commit id".to_string(),
			})?;
			repo.resolve_commit(Some(commit))
		}
		PlanMode::All | PlanMode::Diff => repo.resolve_commit(requested),
	}
}

/// Classify every path in the full tree as a create (or dirCreate).
pub fn classify_all(tree: &[String]) -> Vec<RawChange> {
	tree.iter()
		.map(|p| RawChange {
			repo_path: p.clone(),
			action: if is_directory_metadata(p) { Action::DirCreate } else { Action::Create },
		})
		.collect()
}

/// Classify a commit-to-commit diff into raw changes, honoring
/// `allow_deletions`.
pub fn classify_diff(changes: &[FileChange], allow_deletions: bool) -> Vec<RawChange> {
	let mut out = Vec::new();
	for change in changes {
		match (&change.from, &change.to) {
			(None, Some(to)) => out.push(RawChange {
				repo_path: to.clone(),
				action: if is_directory_metadata(to) { Action::DirCreate } else { Action::Create },
			}),
			(Some(from), None) => {
				if allow_deletions {
					out.push(RawChange { repo_path: from.clone(), action: Action::Delete });
				}
			}
			(Some(from), Some(to)) if from != to => {
				out.push(RawChange {
					repo_path: to.clone(),
					action: if is_directory_metadata(to) { Action::DirCreate } else { Action::Create },
				});
				if allow_deletions && owner_segment(from) != owner_segment(to) {
					out.push(RawChange { repo_path: from.clone(), action: Action::Delete });
				}
			}
			(Some(from), Some(to)) => {
				// from == to: in-place modification.
				out.push(RawChange {
					repo_path: to.clone(),
					action: if is_directory_metadata(to) {
						Action::DirModify
					} else {
						Action::Create
					},
				});
				let _ = from;
			}
			(None, None) => {}
		}
	}
	out
}

fn owner_segment(repo_path: &str) -> &str {
	repo_path.split('/').next().unwrap_or(repo_path)
}

/// If `repo_path` is a symlink at `commit`, resolve its stored target into
/// an absolute remote path (stripping the owner segment the same way a
/// regular file's remote path is derived, when the target itself encodes
/// one). Absolute targets are left untouched.
pub fn resolve_symlink_target(
	repo: &dyn RepoReader,
	commit: &CommitId,
	repo_path: &str,
) -> Result<Option<String>, FatalError> {
	if repo.file_mode(commit, repo_path)? != EntryMode::Symlink {
		return Ok(None);
	}
	let raw = repo.read_blob(commit, repo_path)?;
	let raw_target = String::from_utf8_lossy(&raw).trim().to_string();

	if raw_target.starts_with('/') {
		return Ok(Some(raw_target));
	}
	let (_, rest) = raw_target.split_once('/').unwrap_or(("", raw_target.as_str()));
	Ok(Some(format!("/{}", rest)))
}


// vim: ts=4
