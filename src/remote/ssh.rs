//! Default `RemoteExecutor`: spawn real `ssh` child processes.
//!
//! Spawns `ssh` itself (optionally through a `-J` jump proxy) and talks to
//! it over its stdio pipes; uploads and downloads shell out to `cat` over
//! that same session rather than invoking a separate `scp` binary.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

use crate::error::RemoteError;
use crate::remote::known_hosts::UnknownKeyAction;
use crate::remote::{CommandOutput, RemoteExecutor};

/// Connection parameters for one host.
#[derive(Debug, Clone)]
pub struct SshTarget {
	pub host: String,
	pub port: u16,
	pub user: String,
	pub jump_proxy: Option<String>,
	pub identity_file: Option<PathBuf>,
	/// `None` uses ssh's own default known-hosts file and strict checking.
	pub known_hosts_file: Option<PathBuf>,
	pub unknown_key_action: UnknownKeyAction,
}

pub struct SshExecutor {
	target: SshTarget,
}

impl SshExecutor {
	pub fn new(target: SshTarget) -> Self {
		SshExecutor { target }
	}

	fn base_command(&self) -> Command {
		let mut cmd = Command::new("ssh");
		cmd.arg("-o").arg("BatchMode=yes");
		if let Some(known_hosts) = &self.target.known_hosts_file {
			cmd.arg("-o").arg(format!("UserKnownHostsFile={}", known_hosts.display()));
			let strict = match self.target.unknown_key_action {
				UnknownKeyAction::All | UnknownKeyAction::Yes => "accept-new",
				UnknownKeyAction::Skip => "no",
				UnknownKeyAction::Prompt => "ask",
			};
			cmd.arg("-o").arg(format!("StrictHostKeyChecking={}", strict));
		}
		cmd.arg("-p").arg(self.target.port.to_string());
		if let Some(proxy) = &self.target.jump_proxy {
			cmd.arg("-J").arg(proxy);
		}
		if let Some(identity) = &self.target.identity_file {
			cmd.arg("-i").arg(identity);
		}
		cmd.arg(format!("{}@{}", self.target.user, self.target.host));
		cmd
	}

	fn quote(path: &str) -> String {
		format!("'{}'", path.replace('\'', "'\\''"))
	}
}

async fn run_with_timeout(mut child: Child, timeout: Duration) -> Result<CommandOutput, RemoteError> {
	let pid = child.id();
	match tokio::time::timeout(timeout, child.wait_with_output()).await {
		Ok(Ok(output)) => Ok(CommandOutput {
			stdout: output.stdout,
			stderr: output.stderr,
			status: output.status.code().unwrap_or(-1),
		}),
		Ok(Err(e)) => Err(RemoteError::SpawnFailed { cmd: String::new(), source: e }),
		Err(_elapsed) => {
			if let Some(pid) = pid {
				#[cfg(unix)]
				unsafe {
					libc::kill(pid as i32, libc::SIGTERM);
				}
			}
			Err(RemoteError::Timeout)
		}
	}
}

impl RemoteExecutor for SshExecutor {
	async fn run(&self, cmd: &str, timeout: Duration) -> Result<CommandOutput, RemoteError> {
		let mut command = self.base_command();
		command.arg(cmd);
		command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
		let child = command
			.spawn()
			.map_err(|e| RemoteError::SpawnFailed { cmd: cmd.to_string(), source: e })?;
		run_with_timeout(child, timeout).await
	}

	async fn run_with_stdin(
		&self,
		cmd: &str,
		stdin: &[u8],
		timeout: Duration,
	) -> Result<CommandOutput, RemoteError> {
		let mut command = self.base_command();
		command.arg(cmd);
		command.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
		let mut child = command
			.spawn()
			.map_err(|e| RemoteError::SpawnFailed { cmd: cmd.to_string(), source: e })?;
		if let Some(mut pipe) = child.stdin.take() {
			pipe.write_all(stdin)
				.await
				.map_err(|e| RemoteError::SpawnFailed { cmd: cmd.to_string(), source: e })?;
		}
		run_with_timeout(child, timeout).await
	}

	async fn upload(&self, bytes: &[u8], remote_path: &str) -> Result<(), RemoteError> {
		let cmd = format!("cat > {}", Self::quote(remote_path));
		let out = self.run_with_stdin(&cmd, bytes, Duration::from_secs(90)).await?;
		if !out.success() {
			return Err(RemoteError::TransferFailed {
				path: remote_path.to_string(),
				message: String::from_utf8_lossy(&out.stderr).into_owned(),
			});
		}
		Ok(())
	}

	async fn download(&self, remote_path: &str) -> Result<Vec<u8>, RemoteError> {
		let cmd = format!("cat {}", Self::quote(remote_path));
		let out = self.run(&cmd, Duration::from_secs(90)).await?;
		if !out.success() {
			return Err(RemoteError::TransferFailed {
				path: remote_path.to_string(),
				message: String::from_utf8_lossy(&out.stderr).into_owned(),
			});
		}
		Ok(out.stdout)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn quote_escapes_embedded_single_quotes() {
		assert_eq!(SshExecutor::quote("/etc/it's/here"), "'/etc/it'\\''s/here'");
	}

	#[test]
	fn base_command_carries_jump_proxy_and_identity() {
		let target = SshTarget {
			host: "10.0.0.1".to_string(),
			port: 2222,
			user: "root".to_string(),
			jump_proxy: Some("jumpbox".to_string()),
			identity_file: Some(PathBuf::from("/etc/ssh/id")),
			known_hosts_file: None,
			unknown_key_action: UnknownKeyAction::Prompt,
		};
		let executor = SshExecutor::new(target);
		let cmd = executor.base_command();
		let rendered = format!("{:?}", cmd);
		assert!(rendered.contains("-J"));
		assert!(rendered.contains("jumpbox"));
		assert!(rendered.contains("-i"));
	}

	#[test]
	fn base_command_sets_strict_host_key_checking_from_known_hosts_policy() {
		let target = SshTarget {
			host: "10.0.0.1".to_string(),
			port: 22,
			user: "root".to_string(),
			jump_proxy: None,
			identity_file: None,
			known_hosts_file: Some(PathBuf::from("/var/lib/scmp/known_hosts")),
			unknown_key_action: UnknownKeyAction::All,
		};
		let executor = SshExecutor::new(target);
		let rendered = format!("{:?}", executor.base_command());
		assert!(rendered.contains("StrictHostKeyChecking=accept-new"));
		assert!(rendered.contains("UserKnownHostsFile=/var/lib/scmp/known_hosts"));
	}
}

// vim: ts=4
