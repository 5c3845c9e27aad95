//! Deployment Summary rendering: humanized byte counts, a per-host and
//! fleet-wide rollup of the Deployment Metrics.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use super::Metrics;

const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];

/// Overall run outcome, assembled from the per-host failure counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummaryStatus {
	Success,
	PartialFailure,
	Failure,
}

/// Humanize a byte count at 1024-byte boundaries (`KiB`, `MiB`, ...).
pub fn humanize_bytes(bytes: u64) -> String {
	if bytes < 1024 {
		return format!("{} B", bytes);
	}
	let mut value = bytes as f64;
	let mut unit = 0;
	while value >= 1024.0 && unit < UNITS.len() - 1 {
		value /= 1024.0;
		unit += 1;
	}
	format!("{:.2} {}", value, UNITS[unit])
}

/// Fleet-wide totals assembled from a [`Metrics`] snapshot.
#[derive(Debug, Serialize)]
pub struct Summary {
	pub status: SummaryStatus,
	pub hosts_attempted: usize,
	pub hosts_completed: usize,
	pub files_attempted: u64,
	pub files_completed: u64,
	pub files_created: u64,
	pub files_updated: u64,
	pub files_deleted: u64,
	pub files_unchanged: u64,
	pub bytes_transferred: u64,
	#[serde(rename = "bytesTransferredHuman")]
	pub bytes_transferred_human: String,
	pub reloads_run: u64,
	pub failure_count: usize,
	pub elapsed_seconds: f64,
	/// Per-host list of file failures, rendered as display strings.
	pub host_failures: BTreeMap<String, Vec<String>>,
	/// Per-file failures, keyed by repo path, across every host.
	pub file_failures: BTreeMap<String, Vec<String>>,
}

impl Summary {
	pub fn from_metrics(metrics: &Metrics) -> Self {
		Self::from_metrics_with_elapsed(metrics, Duration::ZERO)
	}

	pub fn from_metrics_with_elapsed(metrics: &Metrics, elapsed: Duration) -> Self {
		let snapshot = metrics.snapshot();
		let hosts_attempted = snapshot.len();
		let mut hosts_completed = 0;
		let mut files_created = 0;
		let mut files_updated = 0;
		let mut files_deleted = 0;
		let mut files_unchanged = 0;
		let mut bytes_transferred = 0;
		let mut reloads_run = 0;
		let mut failure_count = 0;
		let mut host_failures: BTreeMap<String, Vec<String>> = BTreeMap::new();
		let mut file_failures: BTreeMap<String, Vec<String>> = BTreeMap::new();

		for (host, host_metrics) in &snapshot {
			files_created += host_metrics.created;
			files_updated += host_metrics.updated;
			files_deleted += host_metrics.deleted;
			files_unchanged += host_metrics.unchanged;
			bytes_transferred += host_metrics.bytes_transferred;
			reloads_run += host_metrics.reloads_run;
			failure_count += host_metrics.failures.len();
			if host_metrics.failures.is_empty() {
				hosts_completed += 1;
			} else {
				let rendered: Vec<String> = host_metrics.failures.iter().map(|f| f.to_string()).collect();
				for failure in &host_metrics.failures {
					file_failures.entry(failure.repo_path.clone()).or_default().push(failure.to_string());
				}
				host_failures.insert(host.clone(), rendered);
			}
		}

		let files_completed = files_created + files_updated + files_deleted + files_unchanged;
		let files_attempted = files_completed + failure_count as u64;

		let status = if failure_count == 0 {
			SummaryStatus::Success
		} else if hosts_completed == 0 {
			SummaryStatus::Failure
		} else {
			SummaryStatus::PartialFailure
		};

		Summary {
			status,
			hosts_attempted,
			hosts_completed,
			files_attempted,
			files_completed,
			files_created,
			files_updated,
			files_deleted,
			files_unchanged,
			bytes_transferred,
			bytes_transferred_human: humanize_bytes(bytes_transferred),
			reloads_run,
			failure_count,
			elapsed_seconds: elapsed.as_secs_f64(),
			host_failures,
			file_failures,
		}
	}

	/// JSON rendering, per spec: `--with-summary` prints the Deployment
	/// Summary as JSON.
	pub fn render(&self) -> String {
		serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
	}
}


// vim: ts=4
