//! Loader: blob fetch, header parse, artifact dereference, hashing
//!
//! Fills in the rest of a [`crate::types::FileSpec`] (owner, permissions,
//! hash, dependencies, commands, reload label) from the repo blob the
//! Planner selected. Two distinct shapes:
//!
//! - `*.directory-metadata.json`: the entire blob is the header JSON, no
//!   content body.
//! - everything else: the header JSON sits between two `#|^^^|#` delimiter
//!   lines; the bytes after the closing delimiter are the file content (or,
//!   when `ExternalContentLocation` is set, a one-line hex digest pointing
//!   at an externally-stored blob).

pub mod blob;

pub use blob::BlobCache;

use std::fs;
use std::sync::Arc;

use crate::error::LoadError;
use crate::metadata::{extract_header, MetadataHeader};
use crate::repo::{CommitId, RepoReader};
use crate::util::hash_hex;

const DIRECTORY_METADATA_SUFFIX: &str = ".directory-metadata.json";

/// The header plus resolved content identity for one repo path.
#[derive(Debug, Clone)]
pub struct LoadedFile {
	pub header: MetadataHeader,
	/// Empty for directory metadata (no content to hash).
	pub content_hash: String,
	pub size: u64,
}

pub struct Loader {
	repo: Arc<dyn RepoReader>,
	blobs: BlobCache,
}

impl Loader {
	pub fn new(repo: Arc<dyn RepoReader>, blobs: BlobCache) -> Self {
		Loader { repo, blobs }
	}

	pub fn blobs(&self) -> &BlobCache {
		&self.blobs
	}

	/// Load and parse one repo path's header and content.
	pub fn load_file(&self, commit: &CommitId, repo_path: &str) -> Result<LoadedFile, LoadError> {
		let bytes = self.repo.read_blob(commit, repo_path).map_err(|e| {
			LoadError::ArtifactReadFailed { repo_path: repo_path.to_string(), source: Box::new(e) }
		})?;

		if repo_path.ends_with(DIRECTORY_METADATA_SUFFIX) {
			let text = String::from_utf8_lossy(&bytes);
			let header: MetadataHeader =
				serde_json::from_str(&text).map_err(|e| LoadError::InvalidJson {
					repo_path: repo_path.to_string(),
					message: e.to_string(),
				})?;
			return Ok(LoadedFile { header, content_hash: String::new(), size: 0 });
		}

		let text = String::from_utf8_lossy(&bytes).into_owned();
		let (header_json, body) = extract_header(&text)
			.ok_or_else(|| LoadError::MissingDelimiter { repo_path: repo_path.to_string() })?;

		let header: MetadataHeader =
			serde_json::from_str(&header_json).map_err(|e| LoadError::InvalidJson {
				repo_path: repo_path.to_string(),
				message: e.to_string(),
			})?;

		let (content_hash, size) = match &header.external_content_location {
			Some(uri) => self.resolve_external(repo_path, uri, body.trim())?,
			None => {
				let content = body.into_bytes();
				let hash = hash_hex(&content);
				let size = content.len() as u64;
				self.blobs.insert(hash.clone(), content);
				(hash, size)
			}
		};

		Ok(LoadedFile { header, content_hash, size })
	}

	fn resolve_external(
		&self,
		repo_path: &str,
		uri: &str,
		pointer_hash: &str,
	) -> Result<(String, u64), LoadError> {
		let path = uri.strip_prefix("file://").ok_or_else(|| LoadError::UnsupportedUri {
			repo_path: repo_path.to_string(),
			uri: uri.to_string(),
		})?;

		if let Some(cached) = self.blobs.get(pointer_hash) {
			return Ok((pointer_hash.to_string(), cached.len() as u64));
		}

		let bytes = fs::read(path).map_err(|e| LoadError::ArtifactReadFailed {
			repo_path: repo_path.to_string(),
			source: Box::new(e),
		})?;
		let actual_hash = hash_hex(&bytes);
		if actual_hash != pointer_hash {
			return Err(LoadError::HashMismatch {
				repo_path: repo_path.to_string(),
				expected: pointer_hash.to_string(),
				actual: actual_hash,
			});
		}
		let size = bytes.len() as u64;
		self.blobs.insert(actual_hash.clone(), bytes);
		Ok((actual_hash, size))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::metadata::DELIMITER;
	use crate::repo::FilesystemRepoReader;
	use std::fs;
	use tempfile::tempdir;

	fn write_file(dir: &std::path::Path, rel: &str, contents: &str) {
		let path = dir.join(rel);
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(path, contents).unwrap();
	}

	#[test]
	fn loads_inline_content_and_hashes_it() {
		let dir = tempdir().unwrap();
		let body = "127.0.0.1 localhost\n";
		let contents = format!(
			"{}\n{{\"FileOwnerGroup\":\"root:root\",\"FilePermissions\":644}}\n{}\n{}",
			DELIMITER, DELIMITER, body
		);
		write_file(dir.path(), "h1/etc/hosts", &contents);

		let repo = Arc::new(FilesystemRepoReader::new(dir.path()));
		let loader = Loader::new(repo.clone(), BlobCache::new());
		let commit = repo.resolve_commit(None).unwrap();
		let loaded = loader.load_file(&commit, "h1/etc/hosts").unwrap();

		assert_eq!(loaded.header.file_owner_group, "root:root");
		assert_eq!(loaded.content_hash, hash_hex(body.as_bytes()));
		assert_eq!(loaded.size, body.len() as u64);
		assert_eq!(loader.blobs().get(&loaded.content_hash).unwrap().as_slice(), body.as_bytes());
	}

	#[test]
	fn loads_directory_metadata_json_without_delimiters() {
		let dir = tempdir().unwrap();
		write_file(
			dir.path(),
			"h1/etc/.directory-metadata.json",
			r#"{"FileOwnerGroup":"root:root","FilePermissions":755}"#,
		);
		let repo = Arc::new(FilesystemRepoReader::new(dir.path()));
		let loader = Loader::new(repo.clone(), BlobCache::new());
		let commit = repo.resolve_commit(None).unwrap();
		let loaded = loader.load_file(&commit, "h1/etc/.directory-metadata.json").unwrap();
		assert_eq!(loaded.header.file_permissions, 755);
		assert_eq!(loaded.content_hash, "");
	}

	#[test]
	fn missing_delimiter_is_an_error() {
		let dir = tempdir().unwrap();
		write_file(dir.path(), "h1/etc/hosts", "no header here at all\n");
		let repo = Arc::new(FilesystemRepoReader::new(dir.path()));
		let loader = Loader::new(repo.clone(), BlobCache::new());
		let commit = repo.resolve_commit(None).unwrap();
		let err = loader.load_file(&commit, "h1/etc/hosts").unwrap_err();
		assert!(matches!(err, LoadError::MissingDelimiter { .. }));
	}

	#[test]
	fn external_content_location_is_read_and_verified_by_hash() {
		let dir = tempdir().unwrap();
		let external_dir = tempdir().unwrap();
		let external_path = external_dir.path().join("blob.bin");
		fs::write(&external_path, b"external bytes").unwrap();
		let hash = hash_hex(b"external bytes");

		let contents = format!(
			"{}\n{{\"FileOwnerGroup\":\"root:root\",\"FilePermissions\":644,\"ExternalContentLocation\":\"file://{}\"}}\n{}\n{}\n",
			DELIMITER,
			external_path.display(),
			DELIMITER,
			hash
		);
		write_file(dir.path(), "h1/opt/data", &contents);

		let repo = Arc::new(FilesystemRepoReader::new(dir.path()));
		let loader = Loader::new(repo.clone(), BlobCache::new());
		let commit = repo.resolve_commit(None).unwrap();
		let loaded = loader.load_file(&commit, "h1/opt/data").unwrap();

		assert_eq!(loaded.content_hash, hash);
		assert_eq!(loaded.size, "external bytes".len() as u64);
	}

	#[test]
	fn external_content_hash_mismatch_is_rejected() {
		let dir = tempdir().unwrap();
		let external_dir = tempdir().unwrap();
		let external_path = external_dir.path().join("blob.bin");
		fs::write(&external_path, b"external bytes").unwrap();

		let contents = format!(
			"{}\n{{\"FileOwnerGroup\":\"root:root\",\"FilePermissions\":644,\"ExternalContentLocation\":\"file://{}\"}}\n{}\nnot-the-real-hash\n",
			DELIMITER,
			external_path.display(),
			DELIMITER
		);
		write_file(dir.path(), "h1/opt/data", &contents);

		let repo = Arc::new(FilesystemRepoReader::new(dir.path()));
		let loader = Loader::new(repo.clone(), BlobCache::new());
		let commit = repo.resolve_commit(None).unwrap();
		let err = loader.load_file(&commit, "h1/opt/data").unwrap_err();
		assert!(matches!(err, LoadError::HashMismatch { .. }));
	}
}

// vim: ts=4
