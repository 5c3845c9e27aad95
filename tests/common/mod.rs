//! Shared `RemoteExecutor` test double: an in-memory "remote filesystem"
//! driven by interpreting the exact shell-command strings
//! `deploy::actions` composes, so the File Deployer can be exercised
//! end-to-end without a real SSH transport.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use fleetconf::error::RemoteError;
use fleetconf::remote::{CommandOutput, RemoteExecutor};
use fleetconf::util::hash_hex;

#[derive(Clone, Default)]
struct RemoteFile {
	content: Vec<u8>,
	owner_group: String,
	permissions: u32,
}

#[derive(Default)]
struct State {
	files: HashMap<String, RemoteFile>,
	/// Exit status forced for a stripped command string - used to simulate
	/// check/install/reload failures.
	exit_codes: HashMap<String, i32>,
}

pub struct FakeRemoteExecutor {
	state: Mutex<State>,
}

/// Pull the single-quoted arguments out of a composed shell command, in
/// order. Good enough for the fixed set of command shapes `deploy::actions`
/// produces - none of the test paths here contain embedded quotes.
fn quoted_args(cmd: &str) -> Vec<String> {
	cmd.split('\'').skip(1).step_by(2).map(|s| s.to_string()).collect()
}

fn strip_sudo(cmd: &str) -> &str {
	for prefix in ["sudo -n -- ", "sudo -S -- "] {
		if let Some(rest) = cmd.strip_prefix(prefix) {
			return rest;
		}
	}
	cmd
}

impl FakeRemoteExecutor {
	pub fn new() -> Self {
		FakeRemoteExecutor { state: Mutex::new(State::default()) }
	}

	pub fn seed_file(&self, path: &str, content: &[u8], owner_group: &str, permissions: u32) {
		let mut state = self.state.lock().unwrap();
		state.files.insert(
			path.to_string(),
			RemoteFile { content: content.to_vec(), owner_group: owner_group.to_string(), permissions },
		);
	}

	/// Force the next (and every subsequent) invocation of `cmd` to exit
	/// with `status`, e.g. to simulate a failing reload command.
	pub fn fail_command(&self, cmd: &str, status: i32) {
		self.state.lock().unwrap().exit_codes.insert(cmd.to_string(), status);
	}

	pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
		self.state.lock().unwrap().files.get(path).map(|f| f.content.clone())
	}

	pub fn file_owner_perm(&self, path: &str) -> Option<(String, u32)> {
		self.state.lock().unwrap().files.get(path).map(|f| (f.owner_group.clone(), f.permissions))
	}

	pub fn file_exists(&self, path: &str) -> bool {
		self.state.lock().unwrap().files.contains_key(path)
	}
}

impl Default for FakeRemoteExecutor {
	fn default() -> Self {
		Self::new()
	}
}

impl RemoteExecutor for FakeRemoteExecutor {
	async fn run(&self, cmd: &str, timeout: Duration) -> Result<CommandOutput, RemoteError> {
		self.run_with_stdin(cmd, &[], timeout).await
	}

	async fn run_with_stdin(
		&self,
		cmd: &str,
		_stdin: &[u8],
		_timeout: Duration,
	) -> Result<CommandOutput, RemoteError> {
		let inner = strip_sudo(cmd);
		let mut state = self.state.lock().unwrap();

		if let Some(&status) = state.exit_codes.get(inner) {
			return Ok(CommandOutput { stdout: Vec::new(), stderr: Vec::new(), status });
		}

		if inner.starts_with("mkdir -p ") {
			return Ok(CommandOutput { stdout: Vec::new(), stderr: Vec::new(), status: 0 });
		}

		if let Some(rest) = inner.strip_prefix("chown -h ") {
			return Ok(apply_chown(&mut state, rest));
		}
		if let Some(rest) = inner.strip_prefix("chown ") {
			return Ok(apply_chown(&mut state, rest));
		}
		if let Some(rest) = inner.strip_prefix("chmod ") {
			return Ok(apply_chmod(&mut state, rest));
		}
		if let Some(rest) = inner.strip_prefix("rm -f ") {
			let args = quoted_args(rest);
			state.files.remove(&args[0]);
			return Ok(CommandOutput { stdout: Vec::new(), stderr: Vec::new(), status: 0 });
		}
		if let Some(rest) = inner.strip_prefix("ln -sfn ") {
			let args = quoted_args(rest);
			let (target, path) = (args[0].clone(), args[1].clone());
			state.files.insert(path, RemoteFile { content: target.into_bytes(), owner_group: String::new(), permissions: 0 });
			return Ok(CommandOutput { stdout: Vec::new(), stderr: Vec::new(), status: 0 });
		}
		if let Some(rest) = inner.strip_prefix("mv -f ") {
			let args = quoted_args(rest);
			let (from, to) = (args[0].clone(), args[1].clone());
			if let Some(file) = state.files.remove(&from) {
				state.files.insert(to, file);
			}
			return Ok(CommandOutput { stdout: Vec::new(), stderr: Vec::new(), status: 0 });
		}
		if let Some(rest) = inner.strip_prefix("cp -a ") {
			let args = quoted_args(rest);
			let (from, to) = (args[0].clone(), args[1].clone());
			if let Some(file) = state.files.get(&from).cloned() {
				state.files.insert(to, file);
			}
			return Ok(CommandOutput { stdout: Vec::new(), stderr: Vec::new(), status: 0 });
		}
		if inner.starts_with("sha256sum ") {
			let args = quoted_args(inner);
			let stdout = match state.files.get(&args[0]) {
				Some(file) => format!("{}  {}\n", hash_hex(&file.content), args[0]),
				None => String::new(),
			};
			return Ok(CommandOutput { stdout: stdout.into_bytes(), stderr: Vec::new(), status: 0 });
		}
		if inner.starts_with("stat -c ") {
			let args = quoted_args(inner);
			let path = &args[args.len() - 1];
			let stdout = match state.files.get(path) {
				Some(file) => format!("{} {}\n", file.owner_group, file.permissions),
				None => String::new(),
			};
			return Ok(CommandOutput { stdout: stdout.into_bytes(), stderr: Vec::new(), status: 0 });
		}

		// Arbitrary check/install/reload command with no configured failure.
		Ok(CommandOutput { stdout: Vec::new(), stderr: Vec::new(), status: 0 })
	}

	async fn upload(&self, bytes: &[u8], remote_path: &str) -> Result<(), RemoteError> {
		let mut state = self.state.lock().unwrap();
		state.files.insert(
			remote_path.to_string(),
			RemoteFile { content: bytes.to_vec(), owner_group: String::new(), permissions: 0 },
		);
		Ok(())
	}

	async fn download(&self, remote_path: &str) -> Result<Vec<u8>, RemoteError> {
		let state = self.state.lock().unwrap();
		state
			.files
			.get(remote_path)
			.map(|f| f.content.clone())
			.ok_or_else(|| RemoteError::TransferFailed { path: remote_path.to_string(), message: "no such file".to_string() })
	}
}

fn apply_chown(state: &mut State, rest: &str) -> CommandOutput {
	let args = quoted_args(rest);
	// `chown <owner_group> <path>` - owner_group itself isn't quoted.
	let mut parts = rest.splitn(2, ' ');
	let owner_group = parts.next().unwrap_or("").to_string();
	let path = args.last().cloned().unwrap_or_default();
	let entry = state.files.entry(path).or_default();
	entry.owner_group = owner_group;
	CommandOutput { stdout: Vec::new(), stderr: Vec::new(), status: 0 }
}

fn apply_chmod(state: &mut State, rest: &str) -> CommandOutput {
	let args = quoted_args(rest);
	let mut parts = rest.splitn(2, ' ');
	let perm_str = parts.next().unwrap_or("0");
	let permissions: u32 = perm_str.parse().unwrap_or(0);
	let path = args.last().cloned().unwrap_or_default();
	let entry = state.files.entry(path).or_default();
	entry.permissions = permissions;
	CommandOutput { stdout: Vec::new(), stderr: Vec::new(), status: 0 }
}
