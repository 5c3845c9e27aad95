//! Utility functions shared across the deployment engine
//!
//! This module contains the SHA-256 content-hashing primitives the whole
//! pipeline is keyed on, plus the encodings used for on-disk artifact names.

use base64::engine::Engine;
use sha2::{Digest, Sha256};

/// Hash a buffer with SHA-256, returning the lowercase hex digest used
/// throughout the wire/on-disk formats (blob cache keys, fail-tracker
/// commit ids, artifact pointer bodies).
pub fn hash_hex(buf: &[u8]) -> String {
	hex::encode(hash_binary(buf))
}

/// Hash a buffer with SHA-256, returning the raw 32-byte digest.
pub fn hash_binary(buf: &[u8]) -> [u8; 32] {
	let mut hasher = Sha256::new();
	hasher.update(buf);
	hasher.finalize().into()
}

/// base64 (URL-safe, no padding) of an arbitrary byte string - used for
/// backup/buffer filenames (`base64(path)`) and label-less reload-group ids
/// (`base64(concat(reload))`).
pub fn base64_encode(buf: &[u8]) -> String {
	base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}


// vim: ts=4
