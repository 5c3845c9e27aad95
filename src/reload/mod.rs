//! Reload Grouper
//!
//! Files that share a reload action are grouped so the reload command runs
//! once per group, after every member has deployed successfully, rather
//! than once per file.

use std::collections::BTreeMap;

use crate::types::{Action, FileSpec, ReloadGroup};
use crate::util::base64_encode;

/// Group `order`'s files (only `Action::Create` files participate; deletes,
/// directory actions and symlinks have nothing to reload) into
/// [`ReloadGroup`]s, returning the groups plus a repo_path -> group_id map.
pub fn group_files(
	order: &[String],
	files: &BTreeMap<String, FileSpec>,
) -> (BTreeMap<String, ReloadGroup>, BTreeMap<String, String>) {
	let mut groups: BTreeMap<String, ReloadGroup> = BTreeMap::new();
	let mut file_to_group: BTreeMap<String, String> = BTreeMap::new();

	for repo_path in order {
		let Some(spec) = files.get(repo_path) else { continue };
		if spec.action != Action::Create {
			continue;
		}

		let group_id = match &spec.reload_group {
			Some(label) => label.clone(),
			None if !spec.reload.is_empty() => base64_encode(spec.reload.concat().as_bytes()),
			None => continue,
		};

		file_to_group.insert(repo_path.clone(), group_id.clone());
		let is_labeled = spec.reload_group.is_some();
		let entry = groups.entry(group_id.clone()).or_insert_with(|| ReloadGroup {
			id: group_id.clone(),
			members: Vec::new(),
			canonical_sequence: if is_labeled { Vec::new() } else { spec.reload.clone() },
			expected_count: 0,
		});
		entry.members.push(repo_path.clone());
		entry.expected_count += 1;

		if is_labeled {
			entry.canonical_sequence.extend(spec.reload.iter().cloned());
			entry.canonical_sequence.dedup();
		}
	}

	(groups, file_to_group)
}


// vim: ts=4
