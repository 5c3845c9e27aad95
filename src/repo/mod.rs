//! Repo Reader adapter
//!
//! The real repository storage (Git history, object database, pack files)
//! is out of scope: the engine only needs commit trees, file diffs and blob
//! bytes. [`RepoReader`] is that seam; the
//! default [`FilesystemRepoReader`] treats a directory as a single
//! snapshot (and an optional second directory as its "parent", for diff
//! mode), standing in for a real Git-backed implementation in tests and
//! small deployments.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FatalError;

/// Opaque identifier for a resolved commit. The real implementation would
/// be a Git object id; here it is whatever string the adapter wants.
pub type CommitId = String;

/// One entry in a commit-to-commit diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
	/// Repo path before the change, `None` if the file was added.
	pub from: Option<String>,
	/// Repo path after the change, `None` if the file was removed.
	pub to: Option<String>,
}

/// A tree entry's type. A `Symlink` entry's blob bytes (see
/// [`RepoReader::read_blob`]) are the link target string, not file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
	Regular,
	Symlink,
}

/// Collaborator boundary for repository storage. Implementations only
/// need to answer three questions: what commit does a ref name, what
/// files live/changed at a commit, and what are a file's bytes.
pub trait RepoReader: Send + Sync {
	/// Resolve a user-supplied commit reference (`None` means HEAD).
	fn resolve_commit(&self, commit: Option<&str>) -> Result<CommitId, FatalError>;

	/// All repo paths present at `commit`.
	fn tree(&self, commit: &CommitId) -> Result<Vec<String>, FatalError>;

	/// The patch between `commit` and its parent.
	fn diff(&self, commit: &CommitId) -> Result<Vec<FileChange>, FatalError>;

	/// Raw bytes of `repo_path` as of `commit`. For a `Symlink` entry, this
	/// is the link target string rather than file content.
	fn read_blob(&self, commit: &CommitId, repo_path: &str) -> Result<Vec<u8>, FatalError>;

	/// Whether `repo_path` is a regular file or a symlink, as of `commit`.
	fn file_mode(&self, commit: &CommitId, repo_path: &str) -> Result<EntryMode, FatalError>;
}

/// Filesystem-backed `RepoReader`. `root` is the current tree; `parent` is
/// an optional prior snapshot used to compute `diff()`. Both are plain
/// directories laid out as `<root>/<hostName-or-universalGroup>/<path>`.
pub struct FilesystemRepoReader {
	root: PathBuf,
	parent: Option<PathBuf>,
}

impl FilesystemRepoReader {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		FilesystemRepoReader { root: root.into(), parent: None }
	}

	pub fn with_parent(root: impl Into<PathBuf>, parent: impl Into<PathBuf>) -> Self {
		FilesystemRepoReader { root: root.into(), parent: Some(parent.into()) }
	}

	fn walk(dir: &Path) -> Result<BTreeSet<String>, FatalError> {
		let mut out = BTreeSet::new();
		if !dir.exists() {
			return Ok(out);
		}
		Self::walk_into(dir, dir, &mut out)?;
		Ok(out)
	}

	fn walk_into(base: &Path, dir: &Path, out: &mut BTreeSet<String>) -> Result<(), FatalError> {
		for entry in fs::read_dir(dir)? {
			let entry = entry?;
			let path = entry.path();
			let file_type = entry.file_type()?;
			if file_type.is_dir() {
				Self::walk_into(base, &path, out)?;
			} else {
				let rel = path.strip_prefix(base).unwrap_or(&path);
				out.insert(rel.to_string_lossy().replace('\\', "/"));
			}
		}
		Ok(())
	}
}

impl RepoReader for FilesystemRepoReader {
	fn resolve_commit(&self, commit: Option<&str>) -> Result<CommitId, FatalError> {
		Ok(commit.unwrap_or("HEAD").to_string())
	}

	fn tree(&self, _commit: &CommitId) -> Result<Vec<String>, FatalError> {
		Ok(Self::walk(&self.root)?.into_iter().collect())
	}

	fn diff(&self, _commit: &CommitId) -> Result<Vec<FileChange>, FatalError> {
		let current = Self::walk(&self.root)?;
		let parent = match &self.parent {
			Some(p) => Self::walk(p)?,
			None => BTreeSet::new(),
		};

		let mut changes = Vec::new();
		for added in current.difference(&parent) {
			changes.push(FileChange { from: None, to: Some(added.clone()) });
		}
		for removed in parent.difference(&current) {
			changes.push(FileChange { from: Some(removed.clone()), to: None });
		}
		for common in current.intersection(&parent) {
			let cur_bytes = fs::read(self.root.join(common))?;
			let parent_bytes = fs::read(self.parent.as_ref().unwrap().join(common))?;
			if cur_bytes != parent_bytes {
				changes.push(FileChange {
					from: Some(common.clone()),
					to: Some(common.clone()),
				});
			}
		}
		Ok(changes)
	}

	fn read_blob(&self, _commit: &CommitId, repo_path: &str) -> Result<Vec<u8>, FatalError> {
		let full = self.root.join(repo_path);
		if fs::symlink_metadata(&full)?.file_type().is_symlink() {
			let target = fs::read_link(&full)?;
			return Ok(target.to_string_lossy().into_owned().into_bytes());
		}
		Ok(fs::read(full)?)
	}

	fn file_mode(&self, _commit: &CommitId, repo_path: &str) -> Result<EntryMode, FatalError> {
		let meta = fs::symlink_metadata(self.root.join(repo_path))?;
		if meta.file_type().is_symlink() {
			Ok(EntryMode::Symlink)
		} else {
			Ok(EntryMode::Regular)
		}
	}
}


// vim: ts=4
