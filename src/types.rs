//! Core data types for the deployment engine
//!
//! These are plain data shapes shared across every component; the logic
//! that builds, validates and consumes them lives in the owning modules
//! (`planner`, `loader`, `reload`, `deploy`, `metrics`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Per-host deployment eligibility. Any value other than `Online` excludes
/// the host unless the run was started with `--ignore-deployment-state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentState {
	#[default]
	Online,
	Maintenance,
	Decommissioned,
	/// Unrecognized/empty state string from the inventory.
	Other(String),
}

impl DeploymentState {
	pub fn from_str_loose(s: &str) -> Self {
		match s.trim().to_lowercase().as_str() {
			"" => DeploymentState::Other(String::new()),
			"online" => DeploymentState::Online,
			"maintenance" => DeploymentState::Maintenance,
			"decommissioned" => DeploymentState::Decommissioned,
			other => DeploymentState::Other(other.to_string()),
		}
	}

	/// Is the host deployable given `ignore_state`?
	pub fn is_deployable(&self, ignore_state: bool) -> bool {
		match self {
			DeploymentState::Online => true,
			DeploymentState::Other(s) if s.is_empty() => ignore_state,
			_ => ignore_state,
		}
	}
}

/// A host in the fleet, as resolved from the Inventory Provider.
#[derive(Debug, Clone)]
pub struct Host {
	pub name: String,
	pub hostname: String,
	pub port: u16,
	pub user: String,
	pub jump_proxy: Option<String>,
	pub identity_file: Option<PathBuf>,
	pub password_required: bool,
	pub remote_backup_dir: PathBuf,
	pub remote_transfer_buffer: PathBuf,
	pub deployment_state: DeploymentState,
	/// Ordered set of group names this host belongs to (order affects
	/// nothing behaviorally but is preserved for deterministic output).
	pub group_tags: Vec<String>,
	pub ignores_global_universal: bool,
}

/// The action the Planner decided for one (host, repo path) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
	Create,
	Delete,
	SymlinkCreate { target: String },
	DirCreate,
	DirModify,
}

/// A single file's full contract, derived from its repo path plus its
/// Metadata Header.
#[derive(Debug, Clone)]
pub struct FileSpec {
	/// Path as it appears in the repo tree, e.g. `h1/etc/hosts`.
	pub repo_path: String,
	pub action: Action,
	/// Absolute remote path, derived by stripping the owner segment.
	pub remote_path: String,
	pub owner_group: String,
	pub permissions: u32,
	pub size: u64,
	pub content_hash: String,
	pub symlink_target: Option<String>,
	pub dependencies: Vec<String>,
	pub pre_deploy: Vec<String>,
	pub install: Vec<String>,
	pub checks: Vec<String>,
	pub reload: Vec<String>,
	pub reload_group: Option<String>,
}

/// A reload group: a stable id, its ordered member files, the canonical
/// reload command sequence, and the count of files expected to deploy
/// under it before reload execution may fire.
#[derive(Debug, Clone)]
pub struct ReloadGroup {
	pub id: String,
	pub members: Vec<String>,
	pub canonical_sequence: Vec<String>,
	pub expected_count: usize,
}

/// The Planner's output for a single host.
#[derive(Debug, Clone, Default)]
pub struct HostPlan {
	/// Ordered repo paths to process, already topologically sorted.
	pub order: Vec<String>,
	pub files: BTreeMap<String, FileSpec>,
	pub file_to_group: BTreeMap<String, String>,
	pub groups: BTreeMap<String, ReloadGroup>,
}

/// The whole-run Plan: one `HostPlan` per selected host.
#[derive(Debug, Clone, Default)]
pub struct Plan {
	pub hosts: BTreeMap<String, HostPlan>,
	/// Commit id the plan was derived from (echoed into the fail-tracker
	/// header on failure).
	pub commit_id: String,
}

/// Run mode controlling commit resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
	All,
	Diff,
	Failures,
}


// vim: ts=4
