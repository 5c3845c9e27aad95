//! Host Scheduler
//!
//! Fans a [`Plan`] out across its hosts, bounded by `maxSSHConcurrency`.
//! When the cap is 1, work is serial and the first host failure aborts the
//! run; otherwise every host's worker runs to completion independently and
//! failures are isolated per host. A worker task that panics is translated
//! into a `HostFatal` result rather than poisoning the run.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::error::HostFatalError;
use crate::types::{HostPlan, Plan};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
	pub max_ssh_concurrency: usize,
}

/// Per-host deployment logic, supplied by the caller so the scheduler
/// itself stays transport-agnostic.
pub type HostWorker =
	Arc<dyn Fn(String, HostPlan) -> BoxFuture<'static, Result<(), HostFatalError>> + Send + Sync>;

/// Run every host in `plan` through `worker`, honoring `options`. Returns
/// one outcome per host that was actually started (in serial mode, hosts
/// after the first failure are never started and so have no entry).
pub async fn run(
	plan: Plan,
	options: &SchedulerOptions,
	worker: HostWorker,
) -> Vec<(String, Result<(), HostFatalError>)> {
	if options.max_ssh_concurrency <= 1 {
		run_serial(plan, worker).await
	} else {
		run_concurrent(plan, options.max_ssh_concurrency, worker).await
	}
}

async fn run_serial(
	plan: Plan,
	worker: HostWorker,
) -> Vec<(String, Result<(), HostFatalError>)> {
	let mut results = Vec::new();
	for (name, host_plan) in plan.hosts {
		let span = tracing::info_span!("host", host = %name);
		let outcome = worker(name.clone(), host_plan).instrument(span).await;
		let failed = outcome.is_err();
		results.push((name, outcome));
		if failed {
			break;
		}
	}
	results
}

async fn run_concurrent(
	plan: Plan,
	max_concurrency: usize,
	worker: HostWorker,
) -> Vec<(String, Result<(), HostFatalError>)> {
	let semaphore = Arc::new(Semaphore::new(max_concurrency));
	let mut handles = Vec::new();

	for (name, host_plan) in plan.hosts {
		let sem = semaphore.clone();
		let worker = worker.clone();
		let task_name = name.clone();
		let span = tracing::info_span!("host", host = %name);
		let handle = tokio::spawn(
			async move {
				let _permit = sem.acquire_owned().await.expect("semaphore is never closed");
				worker(task_name.clone(), host_plan).await
			}
			.instrument(span),
		);
		handles.push((name, handle));
	}

	let mut results = Vec::with_capacity(handles.len());
	for (name, handle) in handles {
		let outcome = match handle.await {
			Ok(r) => r,
			Err(join_err) => Err(HostFatalError::ExitStatusUnavailable {
				host: name.clone(),
				message: format!("host worker task panicked: {}", join_err),
			}),
		};
		results.push((name, outcome));
	}
	results
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::BTreeMap;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn plan_with_hosts(names: &[&str]) -> Plan {
		let mut hosts = BTreeMap::new();
		for n in names {
			hosts.insert(n.to_string(), HostPlan::default());
		}
		Plan { hosts, commit_id: "deadbeef".to_string() }
	}

	#[tokio::test]
	async fn concurrent_mode_runs_every_host_despite_a_failure() {
		let plan = plan_with_hosts(&["h1", "h2", "h3"]);
		let ran = Arc::new(AtomicUsize::new(0));
		let ran_clone = ran.clone();
		let worker: HostWorker = Arc::new(move |name, _plan| {
			let ran = ran_clone.clone();
			Box::pin(async move {
				ran.fetch_add(1, Ordering::SeqCst);
				if name == "h2" {
					Err(HostFatalError::AuthFailed { host: name, message: "boom".to_string() })
				} else {
					Ok(())
				}
			})
		});
		let options = SchedulerOptions { max_ssh_concurrency: 4 };
		let results = run(plan, &options, worker).await;
		assert_eq!(ran.load(Ordering::SeqCst), 3);
		assert_eq!(results.len(), 3);
		assert!(results.iter().any(|(n, r)| n == "h2" && r.is_err()));
	}

	#[tokio::test]
	async fn serial_mode_aborts_after_first_failure() {
		let plan = plan_with_hosts(&["a", "b", "c"]);
		let worker: HostWorker = Arc::new(|name, _plan| {
			Box::pin(async move {
				if name == "a" {
					Err(HostFatalError::AuthFailed { host: name, message: "boom".to_string() })
				} else {
					Ok(())
				}
			})
		});
		let options = SchedulerOptions { max_ssh_concurrency: 1 };
		let results = run(plan, &options, worker).await;
		assert_eq!(results.len(), 1);
		assert_eq!(results[0].0, "a");
		assert!(results[0].1.is_err());
	}

	#[tokio::test]
	async fn panicking_worker_becomes_a_host_fatal_result() {
		let plan = plan_with_hosts(&["p"]);
		let worker: HostWorker =
			Arc::new(|_name, _plan| Box::pin(async move { panic!("synthetic panic") }));
		let options = SchedulerOptions { max_ssh_concurrency: 4 };
		let results = run(plan, &options, worker).await;
		assert_eq!(results.len(), 1);
		assert!(results[0].1.is_err());
	}
}

// vim: ts=4
