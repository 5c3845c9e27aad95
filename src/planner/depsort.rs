//! Dependency ordering: Kahn's algorithm with lexicographic tie-break.
//!
//! Ties among roots, and among nodes that become ready simultaneously, are
//! broken by repo path so a given selection of files always orders the same
//! way regardless of map iteration order.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::PlanError;

/// Topologically sort `nodes`, where `deps[n]` lists the repo paths `n`
/// depends on. Dependencies on paths outside `nodes` are silently ignored -
/// the dependency isn't part of this host's selection, so it can't gate
/// anything here.
pub fn topo_sort(
	host: &str,
	nodes: &BTreeSet<String>,
	deps: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<String>, PlanError> {
	let empty: Vec<String> = Vec::new();
	let present_deps = |n: &str| -> Vec<&String> {
		deps.get(n).unwrap_or(&empty).iter().filter(|d| nodes.contains(*d)).collect()
	};

	let mut in_degree: BTreeMap<String, usize> = BTreeMap::new();
	let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();
	for n in nodes {
		let preds = present_deps(n);
		in_degree.insert(n.clone(), preds.len());
		for p in preds {
			dependents.entry(p.clone()).or_default().push(n.clone());
		}
	}

	let mut ready: BTreeSet<String> =
		in_degree.iter().filter(|(_, &d)| d == 0).map(|(n, _)| n.clone()).collect();

	let mut order = Vec::with_capacity(nodes.len());
	while let Some(n) = ready.iter().next().cloned() {
		ready.remove(&n);
		order.push(n.clone());
		if let Some(dependent_list) = dependents.get(&n) {
			for d in dependent_list {
				let count = in_degree.get_mut(d).expect("dependent tracked in in_degree");
				*count -= 1;
				if *count == 0 {
					ready.insert(d.clone());
				}
			}
		}
	}

	if order.len() != nodes.len() {
		let remaining: Vec<String> = nodes.iter().filter(|n| !order.contains(n)).cloned().collect();
		return Err(PlanError::CircularDependency { host: host.to_string(), remaining });
	}

	Ok(order)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn set(items: &[&str]) -> BTreeSet<String> {
		items.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn sorts_a_simple_chain() {
		let nodes = set(&["a", "b", "c"]);
		let mut deps = BTreeMap::new();
		deps.insert("b".to_string(), vec!["a".to_string()]);
		deps.insert("c".to_string(), vec!["b".to_string()]);
		let order = topo_sort("h1", &nodes, &deps).unwrap();
		assert_eq!(order, vec!["a", "b", "c"]);
	}

	#[test]
	fn breaks_root_ties_lexicographically() {
		let nodes = set(&["z", "a", "m"]);
		let deps = BTreeMap::new();
		let order = topo_sort("h1", &nodes, &deps).unwrap();
		assert_eq!(order, vec!["a", "m", "z"]);
	}

	#[test]
	fn ignores_dependencies_outside_the_node_set() {
		let nodes = set(&["a"]);
		let mut deps = BTreeMap::new();
		deps.insert("a".to_string(), vec!["not-selected".to_string()]);
		let order = topo_sort("h1", &nodes, &deps).unwrap();
		assert_eq!(order, vec!["a"]);
	}

	#[test]
	fn detects_a_direct_cycle() {
		let nodes = set(&["a", "b"]);
		let mut deps = BTreeMap::new();
		deps.insert("a".to_string(), vec!["b".to_string()]);
		deps.insert("b".to_string(), vec!["a".to_string()]);
		let err = topo_sort("h1", &nodes, &deps).unwrap_err();
		match err {
			PlanError::CircularDependency { host, mut remaining } => {
				assert_eq!(host, "h1");
				remaining.sort();
				assert_eq!(remaining, vec!["a".to_string(), "b".to_string()]);
			}
			_ => panic!("expected CircularDependency"),
		}
	}
}

// vim: ts=4
