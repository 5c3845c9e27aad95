//! `fleetconf` binary entry point: wires the library's Planner/Loader/
//! Scheduler/Deployer pipeline to a `clap` builder-style command line.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Arg, ArgAction, Command};

use fleetconf::credentials::EnvCredentialStore;
use fleetconf::deploy::DeployOptions;
use fleetconf::error::{DeployError, FatalError};
use fleetconf::inventory::{FileInventoryProvider, InventoryProvider};
use fleetconf::loader::BlobCache;
use fleetconf::logging;
use fleetconf::metrics::failtracker;
use fleetconf::metrics::summary::Summary;
use fleetconf::metrics::Metrics;
use fleetconf::pipeline::{build_plan, run_deployment, RunOptions};
use fleetconf::planner::{OverrideFilter, PlanRequest};
use fleetconf::repo::FilesystemRepoReader;
use fleetconf::scheduler::SchedulerOptions;
use fleetconf::types::PlanMode;

const NOT_IMPLEMENTED: &str =
	"not implemented by the deployment engine: out of scope per the project's stated boundaries";

fn cli() -> Command {
	Command::new("fleetconf")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Deploy a Git-tracked tree of files to a fleet of hosts over SSH")
		.subcommand_required(true)
		.arg(
			Arg::new("inventory")
				.short('i')
				.long("inventory")
				.value_name("FILE")
				.default_value("fleetconf.inventory")
				.help("Path to the SSH-config-style inventory file"),
		)
		.arg(
			Arg::new("repo")
				.long("repo")
				.value_name("DIR")
				.default_value(".")
				.help("Repo root directory"),
		)
		.arg(Arg::new("verbose").short('v').action(ArgAction::Count).help("Verbosity, 0-5"))
		.subcommand(deploy_subcommand())
		.subcommand(Command::new("version").about("Print the engine version"))
		.subcommand(Command::new("seed").about(NOT_IMPLEMENTED))
		.subcommand(Command::new("exec").about(NOT_IMPLEMENTED))
		.subcommand(Command::new("scp").about(NOT_IMPLEMENTED))
		.subcommand(
			Command::new("git")
				.about(NOT_IMPLEMENTED)
				.subcommand(Command::new("add"))
				.subcommand(Command::new("status"))
				.subcommand(Command::new("commit")),
		)
		.subcommand(
			Command::new("header")
				.about(NOT_IMPLEMENTED)
				.subcommand(Command::new("edit"))
				.subcommand(Command::new("strip"))
				.subcommand(Command::new("insert"))
				.subcommand(Command::new("read"))
				.subcommand(Command::new("verify")),
		)
		.subcommand(Command::new("secrets").about(NOT_IMPLEMENTED))
		.subcommand(Command::new("install").about(NOT_IMPLEMENTED))
}

fn deploy_subcommand() -> Command {
	Command::new("deploy")
		.about("Plan and run a deployment")
		.subcommand_required(true)
		.arg(Arg::new("commit").short('C').long("commit").value_name("REF").help("Commit reference"))
		.arg(Arg::new("hosts").short('r').long("hosts").value_name("FILTER").help("Host name filter"))
		.arg(Arg::new("files").short('l').long("files").value_name("FILTER").help("File path filter"))
		.arg(
			Arg::new("max-conns")
				.short('m')
				.long("max-conns")
				.value_name("N")
				.default_value("4")
				.help("Maximum concurrent SSH connections"),
		)
		.arg(
			Arg::new("max-deploy-threads")
				.short('M')
				.long("max-deploy-threads")
				.value_name("N")
				.default_value("1")
				.help("Advisory per-host command concurrency (files within a host always run in dependency order)"),
		)
		.arg(Arg::new("dry-run").long("dry-run").action(ArgAction::SetTrue))
		.arg(Arg::new("wet-run").long("wet-run").action(ArgAction::SetTrue))
		.arg(Arg::new("force").long("force").action(ArgAction::SetTrue))
		.arg(Arg::new("allow-deletions").long("allow-deletions").action(ArgAction::SetTrue))
		.arg(Arg::new("disable-reloads").long("disable-reloads").action(ArgAction::SetTrue))
		.arg(Arg::new("ignore-deployment-state").long("ignore-deployment-state").action(ArgAction::SetTrue))
		.arg(Arg::new("regex").long("regex").action(ArgAction::SetTrue))
		.arg(Arg::new("with-summary").long("with-summary").action(ArgAction::SetTrue))
		.arg(Arg::new("fail-tracker").long("fail-tracker").value_name("FILE").default_value("fleetconf.failtracker"))
		.subcommand(Command::new("all").about("Deploy the whole tree at a commit"))
		.subcommand(Command::new("diff").about("Deploy only what changed since the commit's parent"))
		.subcommand(Command::new("failures").about("Redeploy exactly what failed last run"))
}

fn build_filter(raw: Option<&String>, regex: bool) -> Result<OverrideFilter, FatalError> {
	match raw {
		None => Ok(OverrideFilter::none()),
		Some(s) if regex => OverrideFilter::regexes(s),
		Some(s) => Ok(OverrideFilter::substrings(s)),
	}
}

fn run() -> Result<ExitCode, DeployError> {
	let matches = cli().get_matches();
	let verbose_count = matches.get_one::<u8>("verbose").copied().unwrap_or(0);
	// `-v` counts occurrences, so 0 means "flag absent" rather than an
	// explicit request for silence; default to the ordinary info level.
	let verbosity = if verbose_count == 0 { 2 } else { verbose_count };
	logging::init_tracing(verbosity);

	if matches.subcommand_matches("version").is_some() {
		println!("fleetconf {}", env!("CARGO_PKG_VERSION"));
		return Ok(ExitCode::SUCCESS);
	}

	let Some(("deploy", deploy_matches)) = matches.subcommand() else {
		eprintln!("{}", NOT_IMPLEMENTED);
		return Ok(ExitCode::from(2));
	};

	let inventory_path = matches.get_one::<String>("inventory").expect("has default");
	let repo_path = matches.get_one::<String>("repo").expect("has default");
	let fail_tracker_path = PathBuf::from(
		deploy_matches.get_one::<String>("fail-tracker").expect("has default"),
	);

	let inventory = FileInventoryProvider::new(inventory_path).load()?;
	let repo = Arc::new(FilesystemRepoReader::new(repo_path));

	let regex = deploy_matches.get_flag("regex");
	let host_filter = build_filter(deploy_matches.get_one::<String>("hosts"), regex)?;
	let file_filter = build_filter(deploy_matches.get_one::<String>("files"), regex)?;
	let allow_deletions = deploy_matches.get_flag("allow-deletions");
	let ignore_deployment_state = deploy_matches.get_flag("ignore-deployment-state");

	let (mode, failtracker_commit, failtracker_entries);
	let loaded_failtracker;
	match deploy_matches.subcommand() {
		Some(("all", _)) => {
			mode = PlanMode::All;
			failtracker_commit = None;
			failtracker_entries = None;
			loaded_failtracker = None;
		}
		Some(("diff", _)) => {
			mode = PlanMode::Diff;
			failtracker_commit = None;
			failtracker_entries = None;
			loaded_failtracker = None;
		}
		Some(("failures", _)) => {
			let (commit, records) = failtracker::read(&fail_tracker_path).map_err(DeployError::Fatal)?;
			mode = PlanMode::Failures;
			loaded_failtracker = Some((commit, failtracker::entries(&records)));
			let (c, e) = loaded_failtracker.as_ref().expect("just set");
			failtracker_commit = Some(c.as_str());
			failtracker_entries = Some(e.as_slice());
		}
		_ => unreachable!("subcommand_required"),
	}

	let commit_arg = deploy_matches.get_one::<String>("commit").map(|s| s.as_str());
	let request = PlanRequest {
		mode,
		commit: commit_arg,
		failtracker_commit,
		failtracker_entries,
		host_filter,
		file_filter,
		allow_deletions,
		ignore_deployment_state,
	};

	let blobs = BlobCache::new();
	let (plan, _loader) = build_plan(repo, &inventory, &request, blobs.clone())?;
	let commit_id = plan.commit_id.clone();

	let max_conns: usize = deploy_matches
		.get_one::<String>("max-conns")
		.and_then(|s| s.parse().ok())
		.unwrap_or(4);
	let dry_run = deploy_matches.get_flag("dry-run") && !deploy_matches.get_flag("wet-run");

	let metrics = Arc::new(Metrics::new());
	let credentials = Arc::new(EnvCredentialStore::new(
		"FLEETCONF_PASSWORD",
		inventory.global.password_vault.as_ref().map(PathBuf::from),
	));
	let options = RunOptions {
		scheduler: SchedulerOptions { max_ssh_concurrency: max_conns },
		deploy: DeployOptions {
			dry_run,
			force: deploy_matches.get_flag("force"),
			disable_reloads: deploy_matches.get_flag("disable-reloads"),
		},
		default_timeout: Duration::from_secs(60),
		known_hosts_path: inventory.global.user_known_hosts_file.clone(),
		credentials,
	};

	let rt = tokio::runtime::Runtime::new().map_err(|e| DeployError::Fatal(FatalError::Io(e)))?;
	let started = std::time::Instant::now();
	rt.block_on(run_deployment(plan, &inventory, blobs, metrics.clone(), options))?;
	let elapsed = started.elapsed();

	let snapshot = metrics.snapshot();
	let mut failures = Vec::new();
	for (host, host_metrics) in &snapshot {
		if !host_metrics.failures.is_empty() {
			failures.push(failtracker::record_for_host(host, &host_metrics.failures));
		}
	}

	if !failures.is_empty() {
		let _ = failtracker::write(&fail_tracker_path, &commit_id, &failures);
	} else if matches!(mode, PlanMode::Failures) {
		let _ = std::fs::remove_file(&fail_tracker_path);
	}

	let summary = Summary::from_metrics_with_elapsed(&metrics, elapsed);
	if deploy_matches.get_flag("with-summary") {
		println!("{}", summary.render());
	} else {
		println!(
			"{:?}: {} host(s) completed, {} failed",
			summary.status, summary.hosts_completed, summary.hosts_attempted - summary.hosts_completed
		);
		for (host, errors) in &summary.host_failures {
			for err in errors {
				println!("  - {}: {}", host, err);
			}
		}
	}

	if failures.is_empty() {
		Ok(ExitCode::SUCCESS)
	} else {
		Ok(ExitCode::from(1))
	}
}

fn main() -> ExitCode {
	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("fleetconf: {}", e);
			match e {
				DeployError::Fatal(_) | DeployError::Plan(_) => ExitCode::from(2),
				DeployError::HostFatal(_) => ExitCode::from(1),
			}
		}
	}
}

// vim: ts=4
