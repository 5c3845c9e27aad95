//! Universal-group membership and the denied-universal override.
//!
//! A repo path's owner segment is either a host name or a universal group
//! name (the global `UniversalDirectory`, or any name a host lists in
//! `GroupTags`). A host-local file always wins over a universal one that
//! would otherwise land at the same remote path; that suppressed universal
//! file is "denied" for the host.

use std::collections::{BTreeMap, BTreeSet};

use crate::inventory::GlobalOptions;
use crate::types::Host;

/// Split a repo path into its owner segment and the remainder.
pub fn owner_and_relpath(repo_path: &str) -> (&str, &str) {
	match repo_path.split_once('/') {
		Some((owner, rest)) => (owner, rest),
		None => (repo_path, ""),
	}
}

/// Strip the owner segment, returning the absolute remote path.
pub fn remote_path_for(repo_path: &str) -> String {
	let (_, rest) = owner_and_relpath(repo_path);
	format!("/{}", rest)
}

/// Every universal group a host participates in: its explicit `GroupTags`
/// plus the global universal directory, unless it opted out.
pub fn host_group_memberships(host: &Host, global: &GlobalOptions) -> Vec<String> {
	let mut groups = host.group_tags.clone();
	if !host.ignores_global_universal {
		if let Some(g) = &global.universal_directory {
			if !groups.iter().any(|existing| existing == g) {
				groups.push(g.clone());
			}
		}
	}
	groups
}

/// Group the repo tree by owner segment, relative-path set.
fn group_by_owner(tree: &[String]) -> BTreeMap<&str, BTreeSet<&str>> {
	let mut owners: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
	for path in tree {
		let (owner, rel) = owner_and_relpath(path);
		owners.entry(owner).or_default().insert(rel);
	}
	owners
}

/// For every selected host, the set of relative paths whose universal-group
/// copy is suppressed because the host also carries a host-local file at
/// the same relative path.
pub fn compute_denied(
	tree: &[String],
	hosts: &BTreeMap<String, Host>,
	global: &GlobalOptions,
) -> BTreeMap<String, BTreeSet<String>> {
	let by_owner = group_by_owner(tree);
	let mut denied = BTreeMap::new();

	for (name, host) in hosts {
		let local = by_owner.get(name.as_str());
		let Some(local) = local else {
			denied.insert(name.clone(), BTreeSet::new());
			continue;
		};

		let mut host_denied = BTreeSet::new();
		for group in host_group_memberships(host, global) {
			if let Some(universal_rels) = by_owner.get(group.as_str()) {
				for rel in universal_rels {
					if local.contains(rel) {
						host_denied.insert(rel.to_string());
					}
				}
			}
		}
		denied.insert(name.clone(), host_denied);
	}

	denied
}

/// Does `repo_path` belong to `host` once universal precedence and denial
/// are applied?
pub fn path_belongs_to_host(
	repo_path: &str,
	host_name: &str,
	memberships: &[String],
	denied: &BTreeSet<String>,
) -> bool {
	let (owner, rel) = owner_and_relpath(repo_path);
	if owner == host_name {
		return true;
	}
	memberships.iter().any(|g| g == owner) && !denied.contains(rel)
}


// vim: ts=4
