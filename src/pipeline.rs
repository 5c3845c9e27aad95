//! Top-level pipeline glue.
//!
//! Wires the narrow-purpose modules (`planner`, `loader`, `reload`,
//! `planner::depsort`) into a single [`build_plan`] call that produces a
//! full [`Plan`], and wires `scheduler` + `command` + `remote` + `deploy`
//! into [`run_deployment`], which drives that plan to completion against a
//! fleet of hosts.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::command::{CommandRunner, SudoPolicy};
use crate::credentials::CredentialStore;
use crate::deploy::{DeployOptions, Deployer};
use crate::error::{DeployError, FatalError, HostFatalError, PlanError};
use crate::inventory::Inventory;
use crate::loader::{BlobCache, Loader};
use crate::metrics::Metrics;
use crate::planner::diff::resolve_symlink_target;
use crate::planner::{depsort, PlanRequest};
use crate::remote::known_hosts::action_from_env;
use crate::remote::ssh::{SshExecutor, SshTarget};
use crate::repo::RepoReader;
use crate::reload;
use crate::scheduler::{self, HostWorker, SchedulerOptions};
use crate::types::{Action, FileSpec, Host, HostPlan, Plan};
use crate::validation::path::validate_path_safe;

/// Assemble a full [`Plan`] from a host's selected files: load each file's
/// Metadata Header, resolve its symlink target (header takes precedence
/// over the repo entry's own filesystem type when both are present), group
/// reloads, and topologically sort by `Dependencies`.
pub fn build_plan(
	repo: Arc<dyn RepoReader>,
	inventory: &Inventory,
	request: &PlanRequest,
	blobs: BlobCache,
) -> Result<(Plan, Loader), PlanError> {
	let (commit_id, selection) = crate::planner::select(repo.as_ref(), inventory, request)?;
	let loader = Loader::new(repo.clone(), blobs);

	let mut plan = Plan { hosts: BTreeMap::new(), commit_id: commit_id.clone() };

	for (host_name, selected_files) in selection {
		let mut files: BTreeMap<String, FileSpec> = BTreeMap::new();
		let mut nodes: BTreeSet<String> = BTreeSet::new();
		let mut deps: BTreeMap<String, Vec<String>> = BTreeMap::new();

		for selected in selected_files {
			nodes.insert(selected.repo_path.clone());

			if selected.action == Action::Delete {
				deps.insert(selected.repo_path.clone(), Vec::new());
				files.insert(
					selected.repo_path.clone(),
					FileSpec {
						repo_path: selected.repo_path.clone(),
						action: selected.action.clone(),
						remote_path: selected.remote_path.clone(),
						owner_group: String::new(),
						permissions: 0,
						size: 0,
						content_hash: String::new(),
						symlink_target: None,
						dependencies: Vec::new(),
						pre_deploy: Vec::new(),
						install: Vec::new(),
						checks: Vec::new(),
						reload: Vec::new(),
						reload_group: None,
					},
				);
				continue;
			}

			let loaded = loader
				.load_file(&commit_id, &selected.repo_path)
				.map_err(|e| PlanError::InvalidPlan { reason: e.to_string() })?;

			let repo_symlink_target = resolve_symlink_target(repo.as_ref(), &commit_id, &selected.repo_path)
				.map_err(|e| PlanError::InvalidPlan { reason: e.to_string() })?;
			let symlink_target = loaded.header.symbolic_link_target.clone().or(repo_symlink_target);

			if let Some(target) = &symlink_target {
				validate_path_safe(std::path::Path::new(target)).map_err(|e| PlanError::InvalidPlan {
					reason: format!("{}: symlink target escapes remote root: {}", selected.repo_path, e),
				})?;
			}

			let action = match (&selected.action, &symlink_target) {
				(Action::Create, Some(target)) => Action::SymlinkCreate { target: target.clone() },
				(other, _) => other.clone(),
			};

			deps.insert(selected.repo_path.clone(), loaded.header.dependencies.clone());
			files.insert(
				selected.repo_path.clone(),
				FileSpec {
					repo_path: selected.repo_path.clone(),
					action,
					remote_path: selected.remote_path.clone(),
					owner_group: loaded.header.file_owner_group.clone(),
					permissions: loaded.header.file_permissions,
					size: loaded.size,
					content_hash: loaded.content_hash.clone(),
					symlink_target,
					dependencies: loaded.header.dependencies.clone(),
					pre_deploy: loaded.header.pre_deploy.clone(),
					install: loaded.header.install.clone(),
					checks: loaded.header.checks.clone(),
					reload: loaded.header.reload.clone(),
					reload_group: loaded.header.reload_group.clone(),
				},
			);
		}

		let order = depsort::topo_sort(&host_name, &nodes, &deps)?;
		let (groups, file_to_group) = reload::group_files(&order, &files);

		plan.hosts.insert(host_name, HostPlan { order, files, file_to_group, groups });
	}

	Ok((plan, loader))
}

/// Per-run options independent of which files were selected.
#[derive(Clone)]
pub struct RunOptions {
	pub scheduler: SchedulerOptions,
	pub deploy: DeployOptions,
	pub default_timeout: Duration,
	pub known_hosts_path: Option<std::path::PathBuf>,
	/// Consulted only for hosts whose `password_required` is set.
	pub credentials: Arc<dyn CredentialStore>,
}

/// Drive `plan` to completion: one [`SshExecutor`] + [`Deployer`] per host,
/// fanned out through the [`scheduler`].
pub async fn run_deployment(
	plan: Plan,
	inventory: &Inventory,
	blobs: BlobCache,
	metrics: Arc<Metrics>,
	options: RunOptions,
) -> Result<(), DeployError> {
	let hosts: BTreeMap<String, Host> = inventory.hosts.clone();
	let hosts = Arc::new(hosts);
	let metrics_for_worker = metrics.clone();
	let blobs_for_worker = blobs.clone();
	let options = Arc::new(options);

	let worker: HostWorker = {
		let hosts = hosts.clone();
		Arc::new(move |host_name: String, host_plan: HostPlan| {
			let hosts = hosts.clone();
			let metrics = metrics_for_worker.clone();
			let blobs = blobs_for_worker.clone();
			let options = options.clone();
			Box::pin(async move {
				let host = hosts.get(&host_name).ok_or_else(|| HostFatalError::ConnectionFailed {
					host: host_name.clone(),
					source: Box::new(FatalError::Other {
						message: "host dropped from inventory between planning and deployment".to_string(),
					}),
				})?;

				let target = SshTarget {
					host: host.hostname.clone(),
					port: host.port,
					user: host.user.clone(),
					jump_proxy: host.jump_proxy.clone(),
					identity_file: host.identity_file.clone(),
					known_hosts_file: options.known_hosts_path.clone(),
					unknown_key_action: action_from_env(),
				};
				let executor = SshExecutor::new(target);

				let sudo_password = if host.password_required {
					let secret = options.credentials.unlock(&host_name).map_err(|e| {
						HostFatalError::ConnectionFailed { host: host_name.clone(), source: Box::new(e) }
					})?;
					Some(secret)
				} else {
					None
				};
				let policy = SudoPolicy { disable_sudo: false, sudo_user: None, sudo_password };
				let runner = CommandRunner::new(&executor, policy, options.default_timeout);
				let deployer = Deployer::new(runner, host, &metrics, &blobs, &options.deploy);
				deployer.deploy_host(&host_plan).await;

				let failed = metrics
					.snapshot()
					.get(&host_name)
					.map(|m| !m.failures.is_empty())
					.unwrap_or(false);
				if failed {
					warn!(host = %host_name, "host completed with one or more file failures");
				}
				Ok(())
			})
		})
	};

	let results = scheduler::run(plan, &options.scheduler, worker).await;
	for (host_name, outcome) in results {
		if let Err(e) = outcome {
			return Err(DeployError::HostFatal(e));
		}
		let _ = host_name;
	}
	Ok(())
}

// vim: ts=4
