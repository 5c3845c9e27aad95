//! Hashed known-hosts parsing and the `UnknownSSHHostKeyAction` policy.
//!
//! Entries use OpenSSH's `|1|<b64-salt>|<b64-HMAC-SHA1(host)>` hashed-host
//! format rather than storing hostnames in the clear.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use base64::engine::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

fn hmac_host(host: &str, salt: &[u8]) -> Vec<u8> {
	let mut mac = HmacSha1::new_from_slice(salt).expect("HMAC accepts any key length");
	mac.update(host.as_bytes());
	mac.finalize().into_bytes().to_vec()
}

/// Render one hashed known-hosts line.
pub fn format_hashed_entry(host: &str, salt: &[u8], key_type: &str, key_b64: &str) -> String {
	let hashed = hmac_host(host, salt);
	format!("|1|{}|{} {} {}", B64.encode(salt), B64.encode(&hashed), key_type, key_b64)
}

/// Does a `|1|salt|hash ...` line match `host`?
pub fn line_matches_host(line: &str, host: &str) -> bool {
	let Some(rest) = line.trim().strip_prefix("|1|") else { return false };
	let mut parts = rest.splitn(2, '|');
	let Some(salt_b64) = parts.next() else { return false };
	let Some(remainder) = parts.next() else { return false };
	let hash_b64 = remainder.split_whitespace().next().unwrap_or("");

	let (Ok(salt), Ok(expected)) = (B64.decode(salt_b64), B64.decode(hash_b64)) else { return false };
	hmac_host(host, &salt) == expected
}

/// Find the key fields (`key_type key_b64`) of the entry matching `host`,
/// if the known-hosts text contains one.
pub fn find_entry<'a>(known_hosts_text: &'a str, host: &str) -> Option<(&'a str, &'a str)> {
	for line in known_hosts_text.lines() {
		if line_matches_host(line, host) {
			let rest = line.trim().strip_prefix("|1|")?;
			let mut parts = rest.splitn(2, '|');
			let _salt_b64 = parts.next()?;
			let remainder = parts.next()?;
			let mut fields = remainder.split_whitespace();
			let _hash_b64 = fields.next()?;
			let key_type = fields.next()?;
			let key_b64 = fields.next()?;
			return Some((key_type, key_b64));
		}
	}
	None
}

/// Policy for handling a host key with no matching known-hosts entry,
/// driven by the `UnknownSSHHostKeyAction` environment variable: `y`
/// accepts once, `all` accepts this and every later unknown key for the
/// rest of the run, `skip` rejects without prompting, anything else prompts
/// interactively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownKeyAction {
	Prompt,
	Yes,
	All,
	Skip,
}

static ACCEPT_ALL: AtomicBool = AtomicBool::new(false);

pub fn action_from_env() -> UnknownKeyAction {
	match std::env::var("UnknownSSHHostKeyAction").ok().as_deref() {
		Some("y") => UnknownKeyAction::Yes,
		Some("all") => UnknownKeyAction::All,
		Some("skip") => UnknownKeyAction::Skip,
		_ => UnknownKeyAction::Prompt,
	}
}

/// Decide whether to accept an unknown host key for `host`, consulting (in
/// order) the process-wide "accept all" latch, the environment override,
/// and finally an interactive stdin prompt.
pub fn resolve_unknown_key(host: &str) -> bool {
	if ACCEPT_ALL.load(Ordering::Relaxed) {
		return true;
	}
	match action_from_env() {
		UnknownKeyAction::All => {
			ACCEPT_ALL.store(true, Ordering::Relaxed);
			true
		}
		UnknownKeyAction::Yes => true,
		UnknownKeyAction::Skip => false,
		UnknownKeyAction::Prompt => prompt(host).unwrap_or(false),
	}
}

fn prompt(host: &str) -> io::Result<bool> {
	print!("The authenticity of host '{}' can't be established. Accept? [y/N] ", host);
	io::stdout().flush()?;
	let mut line = String::new();
	io::stdin().lock().read_line(&mut line)?;
	Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}


// vim: ts=4
