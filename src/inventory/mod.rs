//! Inventory Provider adapter
//!
//! SSH configuration parsing is explicitly out of scope: the
//! engine only needs a resolved `Inventory` of [`crate::types::Host`]
//! values plus a handful of global keys. [`InventoryProvider`] is that
//! seam; [`parse_inventory`] is a small SSH-config-style parser (`Host
//! <name>` blocks of indented `Key Value` lines) standing in for the real
//! one.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::FatalError;
use crate::types::{DeploymentState, Host};

/// Global (non-host-scoped) inventory keys.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
	pub user_known_hosts_file: Option<PathBuf>,
	pub universal_directory: Option<String>,
	pub ignore_directories: Vec<String>,
	pub password_vault: Option<String>,
}

/// A fully-resolved inventory: every host plus the global keys.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
	pub hosts: BTreeMap<String, Host>,
	pub global: GlobalOptions,
}

/// Collaborator boundary for inventory sourcing.
pub trait InventoryProvider: Send + Sync {
	fn load(&self) -> Result<Inventory, FatalError>;
}

/// Loads an inventory from an SSH-config-style file on disk.
pub struct FileInventoryProvider {
	path: PathBuf,
}

impl FileInventoryProvider {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		FileInventoryProvider { path: path.into() }
	}
}

impl InventoryProvider for FileInventoryProvider {
	fn load(&self) -> Result<Inventory, FatalError> {
		let contents = std::fs::read_to_string(&self.path).map_err(|e| {
			FatalError::MissingConfig { path: format!("{}: {}", self.path.display(), e) }
		})?;
		parse_inventory(&contents)
	}
}

fn split_key_value(line: &str) -> Option<(String, String)> {
	let line = line.trim();
	let mut parts = line.splitn(2, char::is_whitespace);
	let key = parts.next()?.to_string();
	let value = parts.next().unwrap_or("").trim().to_string();
	if key.is_empty() {
		None
	} else {
		Some((key, value))
	}
}

fn parse_bool(s: &str) -> bool {
	matches!(s.trim().to_lowercase().as_str(), "yes" | "true" | "1")
}

/// Parse SSH-config-style inventory text into an [`Inventory`].
pub fn parse_inventory(text: &str) -> Result<Inventory, FatalError> {
	let mut global = GlobalOptions::default();
	let mut hosts: BTreeMap<String, Host> = BTreeMap::new();
	let mut current: Option<String> = None;

	for raw_line in text.lines() {
		let line = raw_line.split('#').next().unwrap_or("").trim_end();
		if line.trim().is_empty() {
			continue;
		}
		let Some((key, value)) = split_key_value(line) else { continue };

		if key.eq_ignore_ascii_case("Host") {
			let name = value.trim();
			if name == "*" {
				current = None;
			} else {
				current = Some(name.to_string());
				hosts.entry(name.to_string()).or_insert_with(|| Host {
					name: name.to_string(),
					hostname: name.to_string(),
					port: 22,
					user: "root".to_string(),
					jump_proxy: None,
					identity_file: None,
					password_required: false,
					remote_backup_dir: PathBuf::from("/tmp/scmp-backup"),
					remote_transfer_buffer: PathBuf::from("/tmp/scmp-buffer"),
					deployment_state: DeploymentState::Online,
					group_tags: Vec::new(),
					ignores_global_universal: false,
				});
			}
			continue;
		}

		match &current {
			Some(name) => {
				let host = hosts.get_mut(name).expect("host block entered above");
				apply_host_key(host, &key, &value);
			}
			None => apply_global_key(&mut global, &key, &value),
		}
	}

	Ok(Inventory { hosts, global })
}

fn apply_host_key(host: &mut Host, key: &str, value: &str) {
	match key.to_lowercase().as_str() {
		"hostname" => host.hostname = value.to_string(),
		"user" => host.user = value.to_string(),
		"port" => host.port = value.parse().unwrap_or(22),
		"proxyjump" => host.jump_proxy = Some(value.to_string()),
		"identityfile" => host.identity_file = Some(PathBuf::from(value)),
		"passwordrequired" => host.password_required = parse_bool(value),
		"remotebackupdir" => host.remote_backup_dir = PathBuf::from(value),
		"remotetransferbuffer" => host.remote_transfer_buffer = PathBuf::from(value),
		"deploymentstate" => host.deployment_state = DeploymentState::from_str_loose(value),
		"grouptags" => {
			host.group_tags =
				value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
		}
		"ignoreuniversal" => host.ignores_global_universal = parse_bool(value),
		_ => {}
	}
}

fn apply_global_key(global: &mut GlobalOptions, key: &str, value: &str) {
	match key.to_lowercase().as_str() {
		"userknownhostsfile" => global.user_known_hosts_file = Some(PathBuf::from(value)),
		"universaldirectory" => global.universal_directory = Some(value.to_string()),
		"ignoredirectories" => {
			global.ignore_directories =
				value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
		}
		"passwordvault" => global.password_vault = Some(value.to_string()),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE: &str = r#"
UserKnownHostsFile ~/.ssh/known_hosts
UniversalDirectory UniversalConfs
IgnoreDirectories .git,.github

Host h1
    Hostname 10.0.0.1
    User root
    Port 2222
    ProxyJump jumpbox
    RemoteBackupDir /var/backup/scmp
    RemoteTransferBuffer /var/tmp/scmp
    DeploymentState online
    GroupTags UniversalConfs,webservers

Host h2
    Hostname 10.0.0.2
    DeploymentState maintenance
    IgnoreUniversal yes
"#;

	#[test]
	fn parses_global_keys() {
		let inv = parse_inventory(SAMPLE).unwrap();
		assert_eq!(inv.global.universal_directory.as_deref(), Some("UniversalConfs"));
		assert_eq!(inv.global.ignore_directories, vec![".git", ".github"]);
	}

	#[test]
	fn parses_per_host_keys() {
		let inv = parse_inventory(SAMPLE).unwrap();
		let h1 = &inv.hosts["h1"];
		assert_eq!(h1.hostname, "10.0.0.1");
		assert_eq!(h1.port, 2222);
		assert_eq!(h1.jump_proxy.as_deref(), Some("jumpbox"));
		assert_eq!(h1.group_tags, vec!["UniversalConfs", "webservers"]);
		assert_eq!(h1.deployment_state, DeploymentState::Online);
	}

	#[test]
	fn parses_deployment_state_and_ignore_universal() {
		let inv = parse_inventory(SAMPLE).unwrap();
		let h2 = &inv.hosts["h2"];
		assert_eq!(h2.deployment_state, DeploymentState::Maintenance);
		assert!(h2.ignores_global_universal);
	}
}

// vim: ts=4
