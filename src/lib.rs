//! # fleetconf - Secure Configuration Management Controller
//!
//! Deploys a Git-tracked tree of files to a fleet of hosts over SSH: plan
//! which files changed and which host each belongs to, order them by
//! declared dependency, push content and metadata, run checks/installs and
//! grouped reload commands, and account for every outcome.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fleetconf::inventory::FileInventoryProvider;
//! use fleetconf::inventory::InventoryProvider;
//! use fleetconf::loader::BlobCache;
//! use fleetconf::pipeline::{build_plan, run_deployment, RunOptions};
//! use fleetconf::planner::{OverrideFilter, PlanRequest};
//! use fleetconf::repo::FilesystemRepoReader;
//! use fleetconf::types::PlanMode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let inventory = FileInventoryProvider::new("inventory.conf").load()?;
//!     let repo = Arc::new(FilesystemRepoReader::new("./repo"));
//!     let request = PlanRequest {
//!         mode: PlanMode::All,
//!         commit: None,
//!         failtracker_commit: None,
//!         failtracker_entries: None,
//!         host_filter: OverrideFilter::none(),
//!         file_filter: OverrideFilter::none(),
//!         allow_deletions: false,
//!         ignore_deployment_state: false,
//!     };
//!     let (plan, _loader) = build_plan(repo, &inventory, &request, BlobCache::new())?;
//!     Ok(())
//! }
//! ```

#![warn(dead_code)]

pub mod command;
pub mod credentials;
pub mod deploy;
pub mod error;
pub mod inventory;
pub mod loader;
pub mod logging;
pub mod metadata;
pub mod metrics;
pub mod pipeline;
pub mod planner;
pub mod reload;
pub mod remote;
pub mod repo;
pub mod scheduler;
pub mod types;
pub mod util;
pub mod validation;

// Re-export the crate's main entry points.
pub use error::{DeployError, FatalError, FileError, FileErrorKind, HostFatalError, PlanError};
pub use metrics::{summary::Summary, Metrics};
pub use pipeline::{build_plan, run_deployment, RunOptions};
pub use types::{Action, FileSpec, Host, HostPlan, Plan, PlanMode};

// vim: ts=4
