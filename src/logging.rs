//! Logging prelude module for convenient access to tracing macros.
//!
//! This module provides convenient re-exports of common tracing macros
//! to reduce verbosity and maintain consistency across the codebase.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("This is an info message");
//! warn!("This is a warning");
//! error!("An error occurred");
//! debug!("Debug information");
//! trace!("Detailed trace information");
//! ```

pub use tracing::{debug, error, info, trace, warn};

/// Map the CLI's `-v 0..5` counter onto an `EnvFilter` directive.
///
/// `0` disables logging entirely, `1` is warn-only, `2` (the default) is
/// info, `3` debug, `4` and up trace.
pub fn verbosity_to_filter(level: u8) -> &'static str {
	match level {
		0 => "off",
		1 => "warn",
		2 => "info",
		3 => "debug",
		_ => "trace",
	}
}

/// Initialize the tracing subscriber with environment filter support.
///
/// `RUST_LOG` takes priority over `verbosity` when set, matching the
/// convention every other pack member follows:
///
/// ```bash
/// RUST_LOG=debug cargo run -- deploy all
/// RUST_LOG=fleetconf::scheduler=trace cargo run -- deploy all
/// ```
pub fn init_tracing(verbosity: u8) {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity_to_filter(verbosity))),
		)
		.with_writer(std::io::stderr)
		.init();
}

// vim: ts=4
