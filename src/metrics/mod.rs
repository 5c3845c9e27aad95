//! Deployment Metrics
//!
//! One mutex-guarded counter set per host, updated from concurrent host
//! workers and read back for the Deployment Summary and the fail-tracker.

pub mod failtracker;
pub mod summary;

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::FileError;

/// Per-host outcome counters.
#[derive(Debug, Clone, Default)]
pub struct HostMetrics {
	pub created: u64,
	pub updated: u64,
	pub deleted: u64,
	pub unchanged: u64,
	pub bytes_transferred: u64,
	pub reloads_run: u64,
	pub failures: Vec<FileError>,
}

#[derive(Default)]
struct MetricsInner {
	per_host: BTreeMap<String, HostMetrics>,
}

/// Thread-safe metrics sink shared by every host worker.
pub struct Metrics {
	inner: Mutex<MetricsInner>,
}

impl Metrics {
	pub fn new() -> Self {
		Metrics { inner: Mutex::new(MetricsInner::default()) }
	}

	fn with_host<R>(&self, host: &str, f: impl FnOnce(&mut HostMetrics) -> R) -> R {
		let mut guard = self.inner.lock().expect("metrics lock poisoned");
		let entry = guard.per_host.entry(host.to_string()).or_default();
		f(entry)
	}

	pub fn record_created(&self, host: &str, bytes: u64) {
		self.with_host(host, |m| {
			m.created += 1;
			m.bytes_transferred += bytes;
		});
	}

	pub fn record_updated(&self, host: &str, bytes: u64) {
		self.with_host(host, |m| {
			m.updated += 1;
			m.bytes_transferred += bytes;
		});
	}

	pub fn record_deleted(&self, host: &str) {
		self.with_host(host, |m| m.deleted += 1);
	}

	pub fn record_unchanged(&self, host: &str) {
		self.with_host(host, |m| m.unchanged += 1);
	}

	pub fn record_reload(&self, host: &str) {
		self.with_host(host, |m| m.reloads_run += 1);
	}

	pub fn record_failure(&self, host: &str, error: FileError) {
		self.with_host(host, |m| m.failures.push(error));
	}

	pub fn snapshot(&self) -> BTreeMap<String, HostMetrics> {
		self.inner.lock().expect("metrics lock poisoned").per_host.clone()
	}
}

impl Default for Metrics {
	fn default() -> Self {
		Metrics::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::FileErrorKind;

	#[test]
	fn counters_accumulate_per_host() {
		let metrics = Metrics::new();
		metrics.record_created("h1", 100);
		metrics.record_created("h1", 50);
		metrics.record_updated("h2", 10);

		let snapshot = metrics.snapshot();
		assert_eq!(snapshot["h1"].created, 2);
		assert_eq!(snapshot["h1"].bytes_transferred, 150);
		assert_eq!(snapshot["h2"].updated, 1);
	}

	#[test]
	fn failures_are_recorded_per_host() {
		let metrics = Metrics::new();
		metrics.record_failure(
			"h1",
			FileError { repo_path: "h1/etc/f".to_string(), kind: FileErrorKind::CheckFailed, detail: "no".to_string() },
		);
		let snapshot = metrics.snapshot();
		assert_eq!(snapshot["h1"].failures.len(), 1);
	}
}

// vim: ts=4
