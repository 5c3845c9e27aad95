//! Planner: commit resolution, change classification, host/file selection
//!
//! Produces, for each eligible host, the ordered list of repo paths that
//! host must process this run plus the action decided for each. Dependency
//! metadata needed for ordering (topological sort by `Dependencies`) only
//! becomes available once the Loader has read each file's header, so the
//! full pipeline - this module, then the Loader, then [`crate::reload`] and
//! [`depsort`] - is assembled by [`crate::pipeline::build_plan`].

pub mod depsort;
pub mod diff;
pub mod universal;

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{FatalError, PlanError};
use crate::inventory::Inventory;
use crate::repo::{CommitId, RepoReader};
use crate::types::{Action, PlanMode};

/// A host-name or file-path override filter: comma-separated substrings, or
/// (with `--regex`) comma-separated regular expressions, OR'd together. An
/// empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct OverrideFilter {
	substrings: Vec<String>,
	patterns: Vec<Regex>,
}

impl OverrideFilter {
	pub fn none() -> Self {
		OverrideFilter::default()
	}

	pub fn substrings(list: &str) -> Self {
		OverrideFilter {
			substrings: list.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
			patterns: Vec::new(),
		}
	}

	pub fn regexes(list: &str) -> Result<Self, FatalError> {
		let mut patterns = Vec::new();
		for raw in list.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
			let re = Regex::new(raw)
				.map_err(|e| FatalError::Other { message: format!("invalid --regex pattern '{}': {}", raw, e) })?;
			patterns.push(re);
		}
		Ok(OverrideFilter { substrings: Vec::new(), patterns })
	}

	pub fn matches(&self, s: &str) -> bool {
		if self.substrings.is_empty() && self.patterns.is_empty() {
			return true;
		}
		self.substrings.iter().any(|sub| s.contains(sub.as_str()))
			|| self.patterns.iter().any(|re| re.is_match(s))
	}
}

/// One repo path selected for one host, with its tentative action. Still
/// missing everything the Metadata Header carries (permissions, content
/// hash, dependencies, ...), filled in by the Loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
	pub repo_path: String,
	pub action: Action,
	pub remote_path: String,
}

/// Inputs to a single planning run.
pub struct PlanRequest<'a> {
	pub mode: PlanMode,
	/// User-supplied commit reference for `all`/`diff` modes.
	pub commit: Option<&'a str>,
	/// Commit id recorded in the fail-tracker, required for `failures` mode.
	pub failtracker_commit: Option<&'a str>,
	/// Exact (host, repo_path) pairs to redeploy, required for `failures` mode.
	pub failtracker_entries: Option<&'a [(String, String)]>,
	pub host_filter: OverrideFilter,
	pub file_filter: OverrideFilter,
	pub allow_deletions: bool,
	pub ignore_deployment_state: bool,
}

/// Resolve the commit, classify changes, and assign (host, file) pairs
/// subject to universal precedence, denial, deployment-state gating, and
/// the host/file override filters.
pub fn select(
	repo: &dyn RepoReader,
	inventory: &Inventory,
	request: &PlanRequest,
) -> Result<(CommitId, BTreeMap<String, Vec<SelectedFile>>), PlanError> {
	let commit = diff::resolve_commit(repo, request.mode, request.commit, request.failtracker_commit)
		.map_err(|e| PlanError::InvalidPlan { reason: e.to_string() })?;

	let eligible_hosts: BTreeMap<&String, &crate::types::Host> = inventory
		.hosts
		.iter()
		.filter(|(name, host)| {
			host.deployment_state.is_deployable(request.ignore_deployment_state)
				&& request.host_filter.matches(name)
		})
		.collect();

	let mut out: BTreeMap<String, Vec<SelectedFile>> =
		eligible_hosts.keys().map(|name| ((*name).clone(), Vec::new())).collect();

	if request.mode == PlanMode::Failures {
		let entries = request.failtracker_entries.unwrap_or(&[]);
		for (host, repo_path) in entries {
			if !eligible_hosts.contains_key(host) || !request.file_filter.matches(repo_path) {
				continue;
			}
			let action = if repo_path.ends_with(".directory-metadata.json") {
				Action::DirCreate
			} else {
				Action::Create
			};
			let remote_path = universal::remote_path_for(repo_path);
			out.entry(host.clone()).or_default().push(SelectedFile {
				repo_path: repo_path.clone(),
				action,
				remote_path,
			});
		}
		return Ok((commit, out));
	}

	let tree = repo
		.tree(&commit)
		.map_err(|e| PlanError::InvalidPlan { reason: e.to_string() })?;
	let denied = universal::compute_denied(&tree, &inventory.hosts, &inventory.global);

	let raw = match request.mode {
		PlanMode::All => diff::classify_all(&tree),
		PlanMode::Diff => {
			let changes = repo
				.diff(&commit)
				.map_err(|e| PlanError::InvalidPlan { reason: e.to_string() })?;
			diff::classify_diff(&changes, request.allow_deletions)
		}
		PlanMode::Failures => unreachable!("handled above"),
	};

	for (name, host) in &eligible_hosts {
		let memberships = universal::host_group_memberships(host, &inventory.global);
		let host_denied = denied.get(*name).cloned().unwrap_or_default();

		for change in &raw {
			if !universal::path_belongs_to_host(&change.repo_path, name, &memberships, &host_denied) {
				continue;
			}
			let remote_path = universal::remote_path_for(&change.repo_path);
			if !request.file_filter.matches(&remote_path) {
				continue;
			}
			out.entry((*name).clone()).or_default().push(SelectedFile {
				repo_path: change.repo_path.clone(),
				action: change.action.clone(),
				remote_path,
			});
		}
	}

	Ok((commit, out))
}


// vim: ts=4
