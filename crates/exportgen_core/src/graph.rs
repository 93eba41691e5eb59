use log::{debug, trace};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::{Path, PathBuf},
};

use crate::{
    resolver::resolve,
    types::{CircularDependency, DependencyGraph, ExportConflict, ExportKind, FileAnalysis},
};

/// Link every analyzed file to the analyzed files it imports or re-exports from.
pub fn build_dependency_graph(
    files: &BTreeMap<PathBuf, FileAnalysis>,
    tsconfig_paths: &HashMap<String, Vec<String>>,
) -> DependencyGraph {
    let mut graph = DependencyGraph::default();
    let exists = |p: &Path| files.contains_key(p);

    for (file, analysis) in files {
        let specifiers = analysis
            .imports
            .iter()
            .map(|i| i.module_specifier.as_str())
            .chain(analysis.re_exports.iter().map(|r| r.module_specifier.as_str()));

        let mut deps: Vec<PathBuf> = Vec::new();
        for specifier in specifiers {
            if let Some(target) = resolve(file, specifier, tsconfig_paths, exists)
                && !deps.contains(&target)
            {
                trace!("{} -> {}", file.display(), target.display());
                graph.dependents.entry(target.clone()).or_default().push(file.clone());
                deps.push(target);
            }
        }
        graph.dependencies.insert(file.clone(), deps);
    }

    debug!(
        "Dependency graph: {} files, {} edges",
        graph.dependencies.len(),
        graph.dependencies.values().map(Vec::len).sum::<usize>()
    );
    graph
}

/// Depth-first search reporting each back edge as a cycle.
pub fn detect_circular_dependencies(graph: &DependencyGraph) -> Vec<CircularDependency> {
    let mut cycles = Vec::new();
    let mut visited: HashSet<&Path> = HashSet::new();
    let mut stack: Vec<&Path> = Vec::new();

    for file in graph.dependencies.keys() {
        if !visited.contains(file.as_path()) {
            visit(file, graph, &mut visited, &mut stack, &mut cycles);
        }
    }

    debug!("Found {} circular dependencies", cycles.len());
    cycles
}

fn visit<'g>(
    file: &'g Path,
    graph: &'g DependencyGraph,
    visited: &mut HashSet<&'g Path>,
    stack: &mut Vec<&'g Path>,
    cycles: &mut Vec<CircularDependency>,
) {
    if let Some(start) = stack.iter().position(|f| *f == file) {
        let mut chain: Vec<PathBuf> = stack[start..].iter().map(|f| f.to_path_buf()).collect();
        chain.push(file.to_path_buf());

        let mut files: Vec<PathBuf> = Vec::new();
        for f in &chain {
            if !files.contains(f) {
                files.push(f.clone());
            }
        }
        trace!("Cycle: {:?}", chain);
        cycles.push(CircularDependency { files, chain });
        return;
    }

    if !visited.insert(file) {
        return;
    }

    stack.push(file);
    if let Some(deps) = graph.dependencies.get(file) {
        for dep in deps {
            visit(dep, graph, visited, stack, cycles);
        }
    }
    stack.pop();
}

/// Names exported (non-default) from more than one file.
pub fn find_export_conflicts(files: &BTreeMap<PathBuf, FileAnalysis>) -> Vec<ExportConflict> {
    let mut by_name: BTreeMap<&str, (Vec<PathBuf>, Vec<ExportKind>)> = BTreeMap::new();

    for (file, analysis) in files {
        for export in analysis.exports.iter().filter(|e| !e.is_default) {
            let entry = by_name.entry(export.name.as_str()).or_default();
            if entry.0.last() == Some(file) {
                continue;
            }
            entry.0.push(file.clone());
            entry.1.push(export.kind);
        }
    }

    by_name
        .into_iter()
        .filter(|(_, (files, _))| files.len() > 1)
        .map(|(name, (conflicting_files, export_kinds))| ExportConflict {
            export_name: name.to_string(),
            conflicting_files,
            export_kinds,
        })
        .collect()
}
