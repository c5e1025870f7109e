//! Module instance hierarchy and dependency-ordered file sets.

use crate::interface::Module;
use eyre::{bail, Result};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One instantiation occurrence in the hierarchy below the chosen root.
///
/// A module instantiated twice under the same parent produces one child;
/// diamond dependencies produce one node per position in the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HierarchyNode {
    /// Instantiated module name.
    pub name: String,
    /// Child instantiations in first-occurrence order.
    pub children: Vec<HierarchyNode>,
}

/// Classifies every module of a batch as root and/or leaf.
///
/// A leaf instantiates nothing. A module is root unless some other module in
/// the batch instantiates it; instantiating a module unknown to the batch
/// leaves that unknown module out of the classification entirely.
pub fn classify_modules(modules: &mut [Module]) {
    let mut instantiated = HashSet::new();
    for module in modules.iter() {
        if let Some(instances) = &module.instances {
            instantiated.extend(instances.iter().cloned());
        }
    }
    for module in modules.iter_mut() {
        module.is_leaf = module.instances.is_none();
        module.is_root = !instantiated.contains(&module.name);
    }
    let roots: Vec<_> =
        modules.iter().filter(|m| m.is_root).map(|m| m.name.as_str()).collect();
    debug!("roots: {}", roots.join(","));
}

/// Builds the instance hierarchy rooted at `root`, or `None` when no module
/// of that name is in the batch.
///
/// Fails when a module name reappears on its own ancestor path, i.e. the
/// instantiations form a cycle.
pub fn module_hierarchy(modules: &[Module], root: &str) -> Result<Option<HierarchyNode>> {
    if !modules.iter().any(|module| module.name == root) {
        return Ok(None);
    }
    let by_name: IndexMap<&str, &Module> =
        modules.iter().map(|module| (module.name.as_str(), module)).collect();
    let mut path = Vec::new();
    expand(root, &by_name, &mut path).map(Some)
}

fn expand(
    name: &str,
    by_name: &IndexMap<&str, &Module>,
    path: &mut Vec<String>,
) -> Result<HierarchyNode> {
    if path.iter().any(|ancestor| ancestor == name) {
        bail!("module instantiation cycle: {} -> {name}", path.join(" -> "));
    }
    let mut node = HierarchyNode { name: name.to_owned(), children: Vec::new() };
    let instances = by_name.get(name).and_then(|module| module.instances.as_ref());
    if let Some(instances) = instances {
        path.push(name.to_owned());
        let mut seen = HashSet::new();
        for instance in instances {
            if seen.insert(instance.as_str()) {
                node.children.push(expand(instance, by_name, path)?);
            }
        }
        path.pop();
    }
    Ok(node)
}

/// Returns the source files needed to build `root`, deepest modules first
/// and each path exactly once.
pub fn files_in_hierarchy(modules: &[Module], root: &str) -> Result<Vec<PathBuf>> {
    let Some(hierarchy) = module_hierarchy(modules, root)? else {
        return Ok(Vec::new());
    };
    let mut names = Vec::new();
    preorder(&hierarchy, &mut names);

    let mut by_name: IndexMap<&str, &Path> =
        modules.iter().map(|module| (module.name.as_str(), module.path.as_path())).collect();
    let mut paths: Vec<PathBuf> = Vec::new();
    for name in names.iter().rev() {
        if let Some(path) = by_name.shift_remove(*name) {
            if !paths.iter().any(|known| known == path) {
                paths.push(path.to_owned());
            }
        }
    }
    Ok(paths)
}

fn preorder<'a>(node: &'a HierarchyNode, names: &mut Vec<&'a str>) {
    names.push(&node.name);
    for child in &node.children {
        preorder(child, names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, path: &str, instances: Option<&[&str]>) -> Module {
        Module {
            name: name.to_owned(),
            path: PathBuf::from(path),
            instances: instances.map(|names| names.iter().map(|&n| n.to_owned()).collect()),
            ..Module::default()
        }
    }

    fn batch() -> Vec<Module> {
        let mut modules = vec![
            module("top", "top.sv", Some(&["mid", "mid"])),
            module("mid", "mid.sv", Some(&["leaf"])),
            module("leaf", "leaf.sv", None),
            module("orphan", "orphan.sv", None),
        ];
        classify_modules(&mut modules);
        modules
    }

    #[test]
    fn roots_and_leaves_are_classified_over_the_whole_batch() {
        let modules = batch();
        let flags: Vec<_> =
            modules.iter().map(|m| (m.name.as_str(), m.is_root, m.is_leaf)).collect();
        assert_eq!(
            flags,
            [
                ("top", true, false),
                ("mid", false, false),
                ("leaf", false, true),
                ("orphan", true, true),
            ]
        );
    }

    #[test]
    fn unknown_instances_do_not_affect_classification() {
        let mut modules =
            vec![module("top", "top.sv", Some(&["external"])), module("other", "other.sv", None)];
        classify_modules(&mut modules);
        assert!(modules[0].is_root);
        assert!(modules[1].is_root);
    }

    #[test]
    fn hierarchy_deduplicates_per_parent_only() {
        let mut modules = vec![
            module("top", "top.sv", Some(&["a", "b"])),
            module("a", "a.sv", Some(&["shared"])),
            module("b", "b.sv", Some(&["shared"])),
            module("shared", "shared.sv", None),
        ];
        classify_modules(&mut modules);
        let hierarchy = module_hierarchy(&modules, "top").unwrap().unwrap();
        assert_eq!(hierarchy.children.len(), 2);
        // a diamond keeps one node per tree position
        assert_eq!(hierarchy.children[0].children[0].name, "shared");
        assert_eq!(hierarchy.children[1].children[0].name, "shared");
    }

    #[test]
    fn unknown_instance_becomes_a_leaf_node_without_a_file() {
        let mut modules = vec![module("top", "top.sv", Some(&["external"]))];
        classify_modules(&mut modules);
        let hierarchy = module_hierarchy(&modules, "top").unwrap().unwrap();
        assert_eq!(hierarchy.children.len(), 1);
        assert_eq!(hierarchy.children[0].name, "external");
        assert!(hierarchy.children[0].children.is_empty());

        let files = files_in_hierarchy(&modules, "top").unwrap();
        assert_eq!(files, [PathBuf::from("top.sv")]);
    }

    #[test]
    fn files_are_ordered_deepest_first_without_duplicates() {
        let modules = batch();
        let files = files_in_hierarchy(&modules, "top").unwrap();
        assert_eq!(
            files,
            [PathBuf::from("leaf.sv"), PathBuf::from("mid.sv"), PathBuf::from("top.sv")]
        );
    }

    #[test]
    fn missing_root_yields_no_hierarchy() {
        let modules = batch();
        assert_eq!(module_hierarchy(&modules, "nonesuch").unwrap(), None);
        assert!(files_in_hierarchy(&modules, "nonesuch").unwrap().is_empty());
    }

    #[test]
    fn instantiation_cycles_fail_instead_of_looping() {
        let mut modules =
            vec![module("a", "a.sv", Some(&["b"])), module("b", "b.sv", Some(&["a"]))];
        classify_modules(&mut modules);
        let err = module_hierarchy(&modules, "a").unwrap_err();
        assert!(err.to_string().contains("cycle"), "unexpected error: {err}");
    }

    #[test]
    fn self_instantiation_is_a_cycle() {
        let mut modules = vec![module("a", "a.sv", Some(&["a"]))];
        classify_modules(&mut modules);
        assert!(module_hierarchy(&modules, "a").is_err());
    }
}
