//! File Deployer
//!
//! One state-machine function per action, run sequentially over a host's
//! already-ordered file list: `delete`, `symlinkCreate`, `dirCreate`/
//! `dirModify`, and the full `create` pipeline (check → install → probe →
//! diff → metadata-only update or content update → reload arbitration).

pub mod actions;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::command::{run_pre_deploy, CommandRunner};
use crate::error::{FileError, FileErrorKind};
use crate::metrics::Metrics;
use crate::remote::RemoteExecutor;
use crate::types::{Action, FileSpec, Host, HostPlan, ReloadGroup};

#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
	pub dry_run: bool,
	pub force: bool,
	pub disable_reloads: bool,
}

fn as_file_error(repo_path: &str, kind: FileErrorKind, detail: impl ToString) -> FileError {
	FileError { repo_path: repo_path.to_string(), kind, detail: detail.to_string() }
}

/// Drives one host's worth of [`HostPlan`] through the File Deployer.
pub struct Deployer<'a, E: RemoteExecutor> {
	runner: CommandRunner<'a, E>,
	host: &'a Host,
	metrics: &'a Metrics,
	blobs: &'a crate::loader::BlobCache,
	options: &'a DeployOptions,
}

impl<'a, E: RemoteExecutor> Deployer<'a, E> {
	pub fn new(
		runner: CommandRunner<'a, E>,
		host: &'a Host,
		metrics: &'a Metrics,
		blobs: &'a crate::loader::BlobCache,
		options: &'a DeployOptions,
	) -> Self {
		Deployer { runner, host, metrics, blobs, options }
	}

	/// Process every file in `host_plan.order`, in order, recording
	/// outcomes in `Metrics` and firing reload groups once every member has
	/// completed.
	pub async fn deploy_host(&self, host_plan: &HostPlan) {
		let mut failed: HashSet<String> = HashSet::new();
		// (members completed so far, any member actually changed)
		let mut group_progress: HashMap<String, (usize, bool)> = HashMap::new();
		// repo_path -> recorded backup, for restoration on reload failure.
		let mut backups: HashMap<String, PathBuf> = HashMap::new();

		for repo_path in &host_plan.order {
			let Some(spec) = host_plan.files.get(repo_path) else { continue };

			if spec.dependencies.iter().any(|d| failed.contains(d)) {
				self.metrics.record_failure(
					&self.host.name,
					as_file_error(repo_path, FileErrorKind::SkippedDependent, "a dependency failed"),
				);
				failed.insert(repo_path.clone());
				continue;
			}

			let outcome = match &spec.action {
				Action::Delete => self.deploy_delete(spec).await,
				Action::DirCreate | Action::DirModify => self.deploy_dir(spec).await,
				Action::SymlinkCreate { target } => self.deploy_symlink(spec, target).await,
				Action::Create => self.deploy_create(spec, &mut backups).await,
			};

			match outcome {
				Ok(changed) => {
					self.advance_reload_group(host_plan, repo_path, changed, &mut group_progress, &backups)
						.await
				}
				Err(file_error) => {
					self.metrics.record_failure(&self.host.name, file_error);
					failed.insert(repo_path.clone());
				}
			}
		}
	}

	/// A reload group fires its canonical command sequence exactly once,
	/// after every member has completed and at least one of them actually
	/// changed the remote filesystem.
	async fn advance_reload_group(
		&self,
		host_plan: &HostPlan,
		repo_path: &str,
		changed: bool,
		group_progress: &mut HashMap<String, (usize, bool)>,
		backups: &HashMap<String, PathBuf>,
	) {
		if self.options.disable_reloads || self.options.dry_run {
			return;
		}
		let Some(group_id) = host_plan.file_to_group.get(repo_path) else { return };
		let Some(group) = host_plan.groups.get(group_id) else { return };

		let entry = group_progress.entry(group_id.clone()).or_insert((0, false));
		entry.0 += 1;
		entry.1 |= changed;

		if entry.0 >= group.expected_count && entry.1 {
			self.run_reload(host_plan, group, backups).await;
		}
	}

	/// On a non-zero exit or transport error, every member with a recorded
	/// backup is restored via `mv backup target` and rehashed; a failed
	/// restoration is a warning, not a recorded failure. The reload failure
	/// itself is recorded against every member, since a group's files are
	/// only meaningfully deployed once their shared reload has applied them.
	async fn run_reload(&self, host_plan: &HostPlan, group: &ReloadGroup, backups: &HashMap<String, PathBuf>) {
		for cmd in &group.canonical_sequence {
			match self.runner.run_remote(cmd, None).await {
				Ok(out) if out.success() => {}
				Ok(out) => {
					self.fail_reload_group(host_plan, group, backups, String::from_utf8_lossy(&out.stderr))
						.await;
					return;
				}
				Err(e) => {
					self.fail_reload_group(host_plan, group, backups, e).await;
					return;
				}
			}
		}
		self.metrics.record_reload(&self.host.name);
	}

	async fn fail_reload_group(
		&self,
		host_plan: &HostPlan,
		group: &ReloadGroup,
		backups: &HashMap<String, PathBuf>,
		detail: impl ToString,
	) {
		let detail = detail.to_string();
		for member in &group.members {
			if let (Some(spec), Some(backup)) = (host_plan.files.get(member), backups.get(member)) {
				let restored = self
					.runner
					.run_remote(&actions::mv_command(&backup.to_string_lossy(), &spec.remote_path), None)
					.await;
				match restored {
					Ok(out) if out.success() => {
						let _ = self.probe(spec).await;
					}
					Ok(out) => tracing::warn!(
						host = %self.host.name, file = %member, stderr = %String::from_utf8_lossy(&out.stderr),
						"failed to restore backup after reload failure"
					),
					Err(e) => tracing::warn!(
						host = %self.host.name, file = %member, error = %e,
						"failed to restore backup after reload failure"
					),
				}
			}
			self.metrics.record_failure(
				&self.host.name,
				as_file_error(member, FileErrorKind::ReloadFailed, &detail),
			);
		}
	}

	async fn deploy_delete(&self, spec: &FileSpec) -> Result<bool, FileError> {
		if self.options.dry_run {
			return Ok(true);
		}
		let out = self
			.runner
			.run_remote(&actions::rm_command(&spec.remote_path), None)
			.await
			.map_err(|e| as_file_error(&spec.repo_path, FileErrorKind::TransferFailed, e))?;
		if !out.success() {
			return Err(as_file_error(
				&spec.repo_path,
				FileErrorKind::TransferFailed,
				String::from_utf8_lossy(&out.stderr),
			));
		}
		self.metrics.record_deleted(&self.host.name);
		Ok(true)
	}

	async fn deploy_dir(&self, spec: &FileSpec) -> Result<bool, FileError> {
		if self.options.dry_run {
			return Ok(true);
		}
		self.run_ok(&spec.repo_path, &actions::mkdir_command(&spec.remote_path), FileErrorKind::InstallFailed)
			.await?;
		self.apply_owner_perm(spec, false).await?;
		let created = spec.action == Action::DirCreate;
		if created {
			self.metrics.record_created(&self.host.name, 0);
		} else {
			self.metrics.record_updated(&self.host.name, 0);
		}
		Ok(true)
	}

	async fn deploy_symlink(&self, spec: &FileSpec, target: &str) -> Result<bool, FileError> {
		if self.options.dry_run {
			return Ok(true);
		}
		self.run_ok(
			&spec.repo_path,
			&actions::symlink_command(target, &spec.remote_path),
			FileErrorKind::InstallFailed,
		)
		.await?;
		self.apply_owner_perm(spec, true).await?;
		self.metrics.record_created(&self.host.name, 0);
		Ok(true)
	}

	async fn deploy_create(&self, spec: &FileSpec, backups: &mut HashMap<String, PathBuf>) -> Result<bool, FileError> {
		self.run_checks(spec).await?;
		self.run_installs(spec).await?;

		// Pre-deploy runs before the probe/diff so a `>{@REMOTEFILEDATA}`/
		// `>>{@REMOTEFILEDATA}` rewrite is compared and verified against its
		// own hash, not the repo blob's.
		let (final_content, effective_hash) = self.resolve_content(spec).await?;

		let (remote_hash, remote_owner_perm) = self.probe(spec).await?;
		let content_matches = remote_hash.as_deref() == Some(effective_hash.as_str());
		let owner_perm_matches = remote_owner_perm.as_ref()
			== Some(&(spec.owner_group.clone(), spec.permissions));

		if content_matches && owner_perm_matches && !self.options.force {
			self.metrics.record_unchanged(&self.host.name);
			return Ok(false);
		}

		if self.options.dry_run {
			return Ok(true);
		}

		if content_matches && !owner_perm_matches {
			self.apply_owner_perm(spec, false).await?;
			self.metrics.record_updated(&self.host.name, 0);
			return Ok(true);
		}

		self.deploy_content(spec, remote_hash.is_some(), backups, final_content, effective_hash).await
	}

	/// Fetch the repo blob for `spec` and run its `pre_deploy` commands,
	/// returning the content that actually gets uploaded plus its hash -
	/// the hash every downstream diff/verify step must compare against.
	async fn resolve_content(&self, spec: &FileSpec) -> Result<(Vec<u8>, String), FileError> {
		let content = self
			.blobs
			.get(&spec.content_hash)
			.ok_or_else(|| as_file_error(&spec.repo_path, FileErrorKind::ArtifactReadFailed, "content not in blob cache"))?;

		let final_content = run_pre_deploy(&spec.pre_deploy, content.as_ref().clone())
			.await
			.map_err(|e| as_file_error(&spec.repo_path, FileErrorKind::TransferFailed, e))?;
		let effective_hash = crate::util::hash_hex(&final_content);
		Ok((final_content, effective_hash))
	}

	/// Precondition checks: any non-zero exit aborts the file outright.
	async fn run_checks(&self, spec: &FileSpec) -> Result<(), FileError> {
		for check in &spec.checks {
			let out = self
				.runner
				.run_remote(check, None)
				.await
				.map_err(|e| as_file_error(&spec.repo_path, FileErrorKind::CheckFailed, e))?;
			if !out.success() {
				return Err(as_file_error(
					&spec.repo_path,
					FileErrorKind::CheckFailed,
					String::from_utf8_lossy(&out.stderr),
				));
			}
		}
		Ok(())
	}

	/// Install commands run unconditionally, after checks pass. Any
	/// non-zero exit aborts the file.
	async fn run_installs(&self, spec: &FileSpec) -> Result<(), FileError> {
		for install_cmd in &spec.install {
			self.run_ok(&spec.repo_path, install_cmd, FileErrorKind::InstallFailed).await?;
		}
		Ok(())
	}

	async fn probe(&self, spec: &FileSpec) -> Result<(Option<String>, Option<(String, u32)>), FileError> {
		let hash_out = self
			.runner
			.run_remote(&actions::hash_command(&spec.remote_path), None)
			.await
			.map_err(|e| as_file_error(&spec.repo_path, FileErrorKind::ProbeFailed, e))?;
		let stat_out = self
			.runner
			.run_remote(&actions::stat_owner_perm_command(&spec.remote_path), None)
			.await
			.map_err(|e| as_file_error(&spec.repo_path, FileErrorKind::ProbeFailed, e))?;

		let hash = actions::parse_hash_output(&String::from_utf8_lossy(&hash_out.stdout));
		let owner_perm =
			actions::parse_stat_output(&String::from_utf8_lossy(&stat_out.stdout));
		Ok((hash, owner_perm))
	}

	async fn apply_owner_perm(&self, spec: &FileSpec, no_dereference: bool) -> Result<(), FileError> {
		self.run_ok(
			&spec.repo_path,
			&actions::chown_command(&spec.remote_path, &spec.owner_group, no_dereference),
			FileErrorKind::InstallFailed,
		)
		.await?;
		if !no_dereference {
			self.run_ok(
				&spec.repo_path,
				&actions::chmod_command(&spec.remote_path, spec.permissions),
				FileErrorKind::InstallFailed,
			)
			.await?;
		}
		Ok(())
	}

	async fn deploy_content(
		&self,
		spec: &FileSpec,
		existed: bool,
		backups: &mut HashMap<String, PathBuf>,
		final_content: Vec<u8>,
		effective_hash: String,
	) -> Result<bool, FileError> {
		let backup_path = actions::backup_path(&self.host.remote_backup_dir, &spec.remote_path);
		let buffer_path = actions::buffer_path(&self.host.remote_transfer_buffer, &spec.remote_path);

		if existed {
			self.run_ok(
				&spec.repo_path,
				&actions::cp_command(&spec.remote_path, &backup_path.to_string_lossy()),
				FileErrorKind::TransferFailed,
			)
			.await?;
			backups.insert(spec.repo_path.clone(), backup_path.clone());
		}

		if let Err(e) = self
			.upload_and_place(spec, &final_content, &effective_hash, &buffer_path.to_string_lossy())
			.await
		{
			if existed {
				let _ = self
					.runner
					.run_remote(
						&actions::cp_command(&backup_path.to_string_lossy(), &spec.remote_path),
						None,
					)
					.await;
			}
			return Err(e);
		}

		if existed {
			self.metrics.record_updated(&self.host.name, final_content.len() as u64);
		} else {
			self.metrics.record_created(&self.host.name, final_content.len() as u64);
		}
		Ok(true)
	}

	async fn upload_and_place(
		&self,
		spec: &FileSpec,
		content: &[u8],
		expected_hash: &str,
		buffer_path: &str,
	) -> Result<(), FileError> {
		self.runner
			.upload(content, buffer_path)
			.await
			.map_err(|e| as_file_error(&spec.repo_path, FileErrorKind::TransferFailed, e))?;
		self.apply_owner_perm_at(spec, buffer_path).await?;
		self.run_ok(
			&spec.repo_path,
			&actions::mv_command(buffer_path, &spec.remote_path),
			FileErrorKind::TransferFailed,
		)
		.await?;

		let (hash_after, _) = self.probe(spec).await?;
		if hash_after.as_deref() != Some(expected_hash) {
			return Err(as_file_error(&spec.repo_path, FileErrorKind::HashMismatch, "post-transfer hash did not match"));
		}
		Ok(())
	}

	async fn apply_owner_perm_at(&self, spec: &FileSpec, path: &str) -> Result<(), FileError> {
		self.run_ok(
			&spec.repo_path,
			&actions::chown_command(path, &spec.owner_group, false),
			FileErrorKind::InstallFailed,
		)
		.await?;
		self.run_ok(
			&spec.repo_path,
			&actions::chmod_command(path, spec.permissions),
			FileErrorKind::InstallFailed,
		)
		.await
	}

	async fn run_ok(&self, repo_path: &str, cmd: &str, kind: FileErrorKind) -> Result<(), FileError> {
		let out = self
			.runner
			.run_remote(cmd, None)
			.await
			.map_err(|e| as_file_error(repo_path, kind.clone(), e))?;
		if !out.success() {
			return Err(as_file_error(repo_path, kind, String::from_utf8_lossy(&out.stderr)));
		}
		Ok(())
	}
}

// vim: ts=4
