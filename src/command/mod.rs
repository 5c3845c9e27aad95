//! Command Runner
//!
//! Two distinct jobs: compose and run remote check/install/reload commands
//! through sudo according to a host's sudo policy, and run local pre-deploy
//! commands that can inspect or rewrite a file's content before transfer.

pub mod tokenize;

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use std::process::Stdio;

use crate::credentials::Secret;
use crate::error::RemoteError;
use crate::remote::{CommandOutput, RemoteExecutor};
use tokenize::Token;

/// How a host wants its remote commands escalated.
#[derive(Debug, Clone, Default)]
pub struct SudoPolicy {
	pub disable_sudo: bool,
	/// `sudo -u <user>`; `None` means plain `sudo`.
	pub sudo_user: Option<String>,
	/// When set, piped to `sudo -S` on the command's stdin instead of
	/// relying on passwordless (`-n`) escalation.
	pub sudo_password: Option<Secret>,
}

/// Wrap `cmd` in the host's sudo policy. `-S` (read password from stdin) is
/// used when a password is configured; otherwise `-n` (non-interactive) is
/// passed, since an interactive password prompt has nowhere to go over a
/// non-interactive SSH command invocation.
pub fn compose_remote_command(cmd: &str, policy: &SudoPolicy) -> String {
	if policy.disable_sudo {
		return cmd.to_string();
	}
	let flag = if policy.sudo_password.is_some() { "-S" } else { "-n" };
	match &policy.sudo_user {
		Some(user) => format!("sudo {} -u {} -- {}", flag, user, cmd),
		None => format!("sudo {} -- {}", flag, cmd),
	}
}

/// Prepend the sudo password (plus newline) to `extra` when the policy
/// carries one, so `sudo -S` can read it as the first line of stdin while
/// the rest of `extra` still reaches the command itself.
fn stdin_with_password(policy: &SudoPolicy, extra: &[u8]) -> Option<Vec<u8>> {
	policy.sudo_password.as_ref().map(|secret| {
		let mut buf = Vec::with_capacity(secret.reveal().len() + 1 + extra.len());
		buf.extend_from_slice(secret.reveal().as_bytes());
		buf.push(b'\n');
		buf.extend_from_slice(extra);
		buf
	})
}

/// Discard `[sudo] password for ...` prompt noise from captured stderr -
/// it's an artifact of the escalation, not useful diagnostic output.
fn strip_sudo_noise(stderr: &[u8]) -> Vec<u8> {
	let text = String::from_utf8_lossy(stderr);
	let filtered: Vec<&str> =
		text.lines().filter(|line| !line.contains("[sudo] password for")).collect();
	filtered.join("\n").into_bytes()
}

/// Runs remote (check/install/reload) commands for one host through its
/// sudo policy, and local pre-deploy commands ahead of transfer.
pub struct CommandRunner<'a, E: RemoteExecutor> {
	executor: &'a E,
	policy: SudoPolicy,
	default_timeout: Duration,
}

impl<'a, E: RemoteExecutor> CommandRunner<'a, E> {
	pub fn new(executor: &'a E, policy: SudoPolicy, default_timeout: Duration) -> Self {
		CommandRunner { executor, policy, default_timeout }
	}

	pub async fn run_remote(
		&self,
		cmd: &str,
		timeout: Option<Duration>,
	) -> Result<CommandOutput, RemoteError> {
		let composed = compose_remote_command(cmd, &self.policy);
		let timeout = timeout.unwrap_or(self.default_timeout);
		let mut out = match stdin_with_password(&self.policy, &[]) {
			Some(stdin) => self.executor.run_with_stdin(&composed, &stdin, timeout).await?,
			None => self.executor.run(&composed, timeout).await?,
		};
		out.stderr = strip_sudo_noise(&out.stderr);
		Ok(out)
	}

	pub async fn run_remote_with_stdin(
		&self,
		cmd: &str,
		stdin: &[u8],
		timeout: Option<Duration>,
	) -> Result<CommandOutput, RemoteError> {
		let composed = compose_remote_command(cmd, &self.policy);
		let timeout = timeout.unwrap_or(self.default_timeout);
		let payload = stdin_with_password(&self.policy, stdin).unwrap_or_else(|| stdin.to_vec());
		let mut out = self.executor.run_with_stdin(&composed, &payload, timeout).await?;
		out.stderr = strip_sudo_noise(&out.stderr);
		Ok(out)
	}

	/// Upload bypasses sudo composition: the transfer buffer directory is
	/// always writable by the deploy user, per host setup requirements.
	pub async fn upload(&self, bytes: &[u8], remote_path: &str) -> Result<(), RemoteError> {
		self.executor.upload(bytes, remote_path).await
	}

	pub async fn download(&self, remote_path: &str) -> Result<Vec<u8>, RemoteError> {
		self.executor.download(remote_path).await
	}
}

enum CaptureMode {
	Replace,
	Append,
}

/// Run a file's local pre-deploy command list in order, threading `content`
/// through the `{@LOCALFILEDATA}`/`{@REMOTEFILEDATA}` macros, and return the
/// (possibly rewritten) content that should be transferred.
pub async fn run_pre_deploy(
	commands: &[String],
	mut content: Vec<u8>,
) -> Result<Vec<u8>, std::io::Error> {
	for line in commands {
		let tokens = tokenize::tokenize(line);
		let mut args: Vec<String> = Vec::new();
		let mut feed_stdin = false;
		let mut capture_mode: Option<CaptureMode> = None;

		for t in &tokens {
			match t {
				Token::Plain(s) => args.push(s.clone()),
				Token::LocalFileDataIn => feed_stdin = true,
				Token::RemoteFileDataReplace => capture_mode = Some(CaptureMode::Replace),
				Token::RemoteFileDataAppend => capture_mode = Some(CaptureMode::Append),
			}
		}
		if args.is_empty() {
			continue;
		}

		let mut cmd = TokioCommand::new(&args[0]);
		cmd.args(&args[1..]);
		cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
		cmd.stdin(if feed_stdin { Stdio::piped() } else { Stdio::null() });

		let mut child = cmd.spawn()?;
		if feed_stdin {
			if let Some(mut stdin) = child.stdin.take() {
				stdin.write_all(&content).await?;
			}
		}
		let output = child.wait_with_output().await?;

		if let Some(mode) = capture_mode {
			match mode {
				CaptureMode::Replace => content = output.stdout,
				CaptureMode::Append => content.extend_from_slice(&output.stdout),
			}
		}
	}
	Ok(content)
}


// vim: ts=4
