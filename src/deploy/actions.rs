//! Pure helpers for the File Deployer's per-action command composition and
//! probe/diff parsing. Kept free of any `RemoteExecutor` so they can be
//! unit-tested without a transport.

use std::path::{Path, PathBuf};

use crate::util::base64_encode;

pub fn shell_quote(s: &str) -> String {
	format!("'{}'", s.replace('\'', "'\\''"))
}

pub fn mkdir_command(path: &str) -> String {
	format!("mkdir -p {}", shell_quote(path))
}

pub fn chown_command(path: &str, owner_group: &str, no_dereference: bool) -> String {
	if no_dereference {
		format!("chown -h {} {}", owner_group, shell_quote(path))
	} else {
		format!("chown {} {}", owner_group, shell_quote(path))
	}
}

pub fn chmod_command(path: &str, permissions: u32) -> String {
	// `FilePermissions` in the header carries the octal digit sequence
	// directly (644 means "644", not decimal 644 converted to octal), so no
	// base conversion happens here.
	format!("chmod {} {}", permissions, shell_quote(path))
}

pub fn rm_command(path: &str) -> String {
	format!("rm -f {}", shell_quote(path))
}

pub fn symlink_command(target: &str, path: &str) -> String {
	format!("ln -sfn {} {}", shell_quote(target), shell_quote(path))
}

pub fn mv_command(from: &str, to: &str) -> String {
	format!("mv -f {} {}", shell_quote(from), shell_quote(to))
}

pub fn cp_command(from: &str, to: &str) -> String {
	format!("cp -a {} {}", shell_quote(from), shell_quote(to))
}

/// `sha256sum <path>` with a soft failure if the path doesn't exist, so the
/// probe step can tell "missing" from "transport broke" by exit status.
pub fn hash_command(path: &str) -> String {
	format!("sha256sum {} 2>/dev/null", shell_quote(path))
}

pub fn stat_owner_perm_command(path: &str) -> String {
	format!("stat -c '%U:%G %a' {} 2>/dev/null", shell_quote(path))
}

pub fn parse_hash_output(output: &str) -> Option<String> {
	output.split_whitespace().next().map(|s| s.to_string())
}

pub fn parse_stat_output(output: &str) -> Option<(String, u32)> {
	let mut parts = output.trim().split_whitespace();
	let owner_group = parts.next()?.to_string();
	let permissions = parts.next()?.parse().ok()?;
	Some((owner_group, permissions))
}

/// Deterministic, collision-free backup/buffer filename for a remote path.
fn encoded_name(dir: &Path, remote_path: &str) -> PathBuf {
	dir.join(base64_encode(remote_path.as_bytes()))
}

pub fn backup_path(backup_dir: &Path, remote_path: &str) -> PathBuf {
	encoded_name(backup_dir, remote_path)
}

pub fn buffer_path(buffer_dir: &Path, remote_path: &str) -> PathBuf {
	encoded_name(buffer_dir, remote_path)
}


// vim: ts=4
