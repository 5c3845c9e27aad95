//! Error types for the deployment engine
//!
//! The source system used panic+recover for "fatal" conditions and string
//! accumulation for "soft" ones. Here every failure surface gets an explicit
//! tagged variant instead: `Fatal` aborts the whole run, `HostFatal` ends one
//! host's worker and leaves siblings running, `FileError` is recorded in
//! Metrics and never escapes the host worker, `Warning` is logged only.

use std::error::Error;
use std::fmt;
use std::io;

/// Top-level error returned to the CLI boundary. Only fatal pre-flight
/// failures travel this far; everything else is absorbed into
/// [`crate::metrics::Metrics`].
#[derive(Debug)]
pub enum DeployError {
	/// Missing config, unparseable commit, no usable inventory: abort, exit 2.
	Fatal(FatalError),

	/// A single host could not be deployed to at all; the rest of the run
	/// continues. Carried here only when surfaced explicitly (e.g. by a
	/// `--max-ssh-concurrency 1` serial run, which aborts on first failure).
	HostFatal(HostFatalError),

	/// Planner-level failure before any host work started.
	Plan(PlanError),
}

impl fmt::Display for DeployError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DeployError::Fatal(e) => write!(f, "fatal error: {}", e),
			DeployError::HostFatal(e) => write!(f, "host error: {}", e),
			DeployError::Plan(e) => write!(f, "plan error: {}", e),
		}
	}
}

impl Error for DeployError {}

impl From<FatalError> for DeployError {
	fn from(e: FatalError) -> Self {
		DeployError::Fatal(e)
	}
}

impl From<PlanError> for DeployError {
	fn from(e: PlanError) -> Self {
		DeployError::Plan(e)
	}
}

impl From<HostFatalError> for DeployError {
	fn from(e: HostFatalError) -> Self {
		DeployError::HostFatal(e)
	}
}

/// Fatal pre-flight errors: missing config, unparseable commit, no usable
/// network interface. These abort the run with exit code 2.
#[derive(Debug)]
pub enum FatalError {
	MissingConfig { path: String },
	InvalidInventory { message: String },
	NoHostsSelected,
	Io(io::Error),
	Other { message: String },
}

impl fmt::Display for FatalError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FatalError::MissingConfig { path } => write!(f, "missing config file: {}", path),
			FatalError::InvalidInventory { message } => {
				write!(f, "invalid inventory: {}", message)
			}
			FatalError::NoHostsSelected => write!(f, "no deployable host matched the filters"),
			FatalError::Io(e) => write!(f, "I/O error: {}", e),
			FatalError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for FatalError {}

impl From<io::Error> for FatalError {
	fn from(e: io::Error) -> Self {
		FatalError::Io(e)
	}
}

/// Host-fatal errors: SSH auth failure, unusable buffer/backup directory,
/// local pre-deploy OS-level start failure. All of the host's files are
/// marked failed and the host ends; other hosts continue.
#[derive(Debug)]
pub enum HostFatalError {
	ConnectionFailed { host: String, source: Box<dyn Error + Send + Sync> },
	AuthFailed { host: String, message: String },
	ScratchDirUnusable { host: String, path: String, message: String },
	LocalSpawnFailed { host: String, cmd: String, source: io::Error },
	ExitStatusUnavailable { host: String, message: String },
}

impl fmt::Display for HostFatalError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HostFatalError::ConnectionFailed { host, source } => {
				write!(f, "{}: connection failed: {}", host, source)
			}
			HostFatalError::AuthFailed { host, message } => {
				write!(f, "{}: authentication failed: {}", host, message)
			}
			HostFatalError::ScratchDirUnusable { host, path, message } => {
				write!(f, "{}: scratch directory {} unusable: {}", host, path, message)
			}
			HostFatalError::LocalSpawnFailed { host, cmd, source } => {
				write!(f, "{}: failed to spawn '{}': {}", host, cmd, source)
			}
			HostFatalError::ExitStatusUnavailable { host, message } => {
				write!(f, "{}: could not evaluate command exit status: {}", host, message)
			}
		}
	}
}

impl Error for HostFatalError {}

/// Per-file failures. Recorded in Metrics; never propagate out of a host
/// worker.
#[derive(Debug, Clone)]
pub enum FileErrorKind {
	MissingDelimiter,
	InvalidJson,
	UnsupportedUri,
	ArtifactReadFailed,
	CheckFailed,
	InstallFailed,
	ProbeFailed,
	HashMismatch,
	SkippedDependent,
	TransferFailed,
	ReloadFailed,
	CommandTimeout,
	Other,
}

impl fmt::Display for FileErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			FileErrorKind::MissingDelimiter => "missing metadata delimiter",
			FileErrorKind::InvalidJson => "invalid metadata json",
			FileErrorKind::UnsupportedUri => "unsupported external content uri",
			FileErrorKind::ArtifactReadFailed => "artifact read failed",
			FileErrorKind::CheckFailed => "check command failed",
			FileErrorKind::InstallFailed => "install command failed",
			FileErrorKind::ProbeFailed => "remote probe failed",
			FileErrorKind::HashMismatch => "post-transfer hash mismatch",
			FileErrorKind::SkippedDependent => "skipped dependency failed",
			FileErrorKind::TransferFailed => "content transfer failed",
			FileErrorKind::ReloadFailed => "reload command failed",
			FileErrorKind::CommandTimeout => "command timed out",
			FileErrorKind::Other => "error",
		};
		write!(f, "{}", s)
	}
}

/// A single file-level failure, keyed by repo path.
#[derive(Debug, Clone)]
pub struct FileError {
	pub repo_path: String,
	pub kind: FileErrorKind,
	pub detail: String,
}

impl fmt::Display for FileError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {} ({})", self.repo_path, self.kind, self.detail)
	}
}

impl Error for FileError {}

/// Planner-level errors.
#[derive(Debug)]
pub enum PlanError {
	InvalidPlan { reason: String },
	CircularDependency { host: String, remaining: Vec<String> },
}

impl fmt::Display for PlanError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PlanError::InvalidPlan { reason } => write!(f, "invalid plan: {}", reason),
			PlanError::CircularDependency { host, remaining } => write!(
				f,
				"circular dependency on host {}: unresolved files {:?}",
				host, remaining
			),
		}
	}
}

impl Error for PlanError {}

/// Loader-level errors, always surfaced with the offending repo path.
#[derive(Debug)]
pub enum LoadError {
	MissingDelimiter { repo_path: String },
	InvalidJson { repo_path: String, message: String },
	UnsupportedUri { repo_path: String, uri: String },
	ArtifactReadFailed { repo_path: String, source: Box<dyn Error + Send + Sync> },
	HashMismatch { repo_path: String, expected: String, actual: String },
}

impl fmt::Display for LoadError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LoadError::MissingDelimiter { repo_path } => {
				write!(f, "{}: missing metadata delimiter", repo_path)
			}
			LoadError::InvalidJson { repo_path, message } => {
				write!(f, "{}: invalid metadata json: {}", repo_path, message)
			}
			LoadError::UnsupportedUri { repo_path, uri } => {
				write!(f, "{}: unsupported external content uri: {}", repo_path, uri)
			}
			LoadError::ArtifactReadFailed { repo_path, source } => {
				write!(f, "{}: artifact read failed: {}", repo_path, source)
			}
			LoadError::HashMismatch { repo_path, expected, actual } => write!(
				f,
				"{}: content hash mismatch: expected {}, got {}",
				repo_path, expected, actual
			),
		}
	}
}

impl Error for LoadError {}

impl From<LoadError> for FileError {
	fn from(e: LoadError) -> Self {
		let (repo_path, kind) = match &e {
			LoadError::MissingDelimiter { repo_path } => {
				(repo_path.clone(), FileErrorKind::MissingDelimiter)
			}
			LoadError::InvalidJson { repo_path, .. } => {
				(repo_path.clone(), FileErrorKind::InvalidJson)
			}
			LoadError::UnsupportedUri { repo_path, .. } => {
				(repo_path.clone(), FileErrorKind::UnsupportedUri)
			}
			LoadError::ArtifactReadFailed { repo_path, .. } => {
				(repo_path.clone(), FileErrorKind::ArtifactReadFailed)
			}
			LoadError::HashMismatch { repo_path, .. } => {
				(repo_path.clone(), FileErrorKind::HashMismatch)
			}
		};
		FileError { repo_path, kind, detail: e.to_string() }
	}
}

/// Remote Executor adapter errors (SSH/SCP transport).
#[derive(Debug)]
pub enum RemoteError {
	SpawnFailed { cmd: String, source: io::Error },
	Timeout,
	Disconnected,
	NonZeroExit { cmd: String, status: i32, stderr: String },
	TransferFailed { path: String, message: String },
	UnknownHostKey { host: String },
}

impl fmt::Display for RemoteError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RemoteError::SpawnFailed { cmd, source } => {
				write!(f, "failed to spawn '{}': {}", cmd, source)
			}
			RemoteError::Timeout => write!(f, "command timed out"),
			RemoteError::Disconnected => write!(f, "connection disconnected unexpectedly"),
			RemoteError::NonZeroExit { cmd, status, stderr } => {
				write!(f, "'{}' exited with status {}: {}", cmd, status, stderr)
			}
			RemoteError::TransferFailed { path, message } => {
				write!(f, "transfer of {} failed: {}", path, message)
			}
			RemoteError::UnknownHostKey { host } => {
				write!(f, "unknown host key for {}", host)
			}
		}
	}
}

impl Error for RemoteError {}

// vim: ts=4
