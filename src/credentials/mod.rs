//! Credential Store adapter
//!
//! Secret-unlocking mechanics (vault protocols, passphrase prompts) are out
//! of scope: the rest of the engine only needs a secret string per host,
//! addressed by name. [`CredentialStore`] is that
//! seam; [`EnvCredentialStore`] is the default adapter - it looks up
//! `<PasswordVault prefix>_<HOST>` in the process environment, with a
//! fallback to a flat `key = value` file for hosts that aren't in the
//! environment at all.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::error::FatalError;

/// An unlocked secret, held only as long as the caller needs it.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
	pub fn reveal(&self) -> &str {
		&self.0
	}

	#[cfg(test)]
	pub fn for_testing(value: impl Into<String>) -> Self {
		Secret(value.into())
	}
}

impl std::fmt::Debug for Secret {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Secret(<redacted>)")
	}
}

/// Collaborator boundary for credential sourcing.
pub trait CredentialStore: Send + Sync {
	fn unlock(&self, host: &str) -> Result<Secret, FatalError>;
}

/// Environment-first, file-fallback credential store.
pub struct EnvCredentialStore {
	env_prefix: String,
	file: Option<PathBuf>,
}

impl EnvCredentialStore {
	pub fn new(env_prefix: impl Into<String>, file: Option<PathBuf>) -> Self {
		EnvCredentialStore { env_prefix: env_prefix.into(), file }
	}

	fn load_file(&self) -> Result<BTreeMap<String, String>, FatalError> {
		let Some(path) = &self.file else { return Ok(BTreeMap::new()) };
		if !path.exists() {
			return Ok(BTreeMap::new());
		}
		let contents = fs::read_to_string(path)?;
		let mut map = BTreeMap::new();
		for line in contents.lines() {
			let line = line.trim();
			if line.is_empty() || line.starts_with('#') {
				continue;
			}
			if let Some((key, value)) = line.split_once('=') {
				map.insert(key.trim().to_string(), value.trim().to_string());
			}
		}
		Ok(map)
	}
}

impl CredentialStore for EnvCredentialStore {
	fn unlock(&self, host: &str) -> Result<Secret, FatalError> {
		let env_key = format!("{}_{}", self.env_prefix, host.to_uppercase());
		if let Ok(value) = std::env::var(&env_key) {
			return Ok(Secret(value));
		}
		let file_map = self.load_file()?;
		file_map
			.get(host)
			.cloned()
			.map(Secret)
			.ok_or_else(|| FatalError::Other { message: format!("no credential found for host {}", host) })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn secret_debug_never_prints_the_value() {
		let secret = Secret("hunter2".to_string());
		assert_eq!(format!("{:?}", secret), "Secret(<redacted>)");
	}

	#[test]
	fn env_credential_store_reads_from_environment() {
		std::env::set_var("SCMP_CRED_TESTHOST1", "from-env");
		let store = EnvCredentialStore::new("SCMP_CRED", None);
		let secret = store.unlock("testhost1").unwrap();
		assert_eq!(secret.reveal(), "from-env");
		std::env::remove_var("SCMP_CRED_TESTHOST1");
	}

	#[test]
	fn env_credential_store_falls_back_to_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("creds");
		fs::write(&path, "h1 = from-file\n").unwrap();
		let store = EnvCredentialStore::new("SCMP_CRED_UNUSED_PREFIX", Some(path));
		let secret = store.unlock("h1").unwrap();
		assert_eq!(secret.reveal(), "from-file");
	}

	#[test]
	fn unknown_host_is_an_error() {
		let store = EnvCredentialStore::new("SCMP_CRED_UNUSED_PREFIX2", None);
		assert!(store.unlock("nope").is_err());
	}
}

// vim: ts=4
