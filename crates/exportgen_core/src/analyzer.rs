use anyhow::{Context, Result};
use dashmap::DashMap;
use log::{debug, info, warn};
use path_clean::clean;
use rayon::prelude::*;
use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use crate::{
    collector::{CollectorConfig, collect_source_files},
    config::read_tsconfig_paths,
    constants::ANALYZED_EXTENSIONS,
    graph::{build_dependency_graph, detect_circular_dependencies, find_export_conflicts},
    parser,
    types::{FileAnalysis, ProjectAnalysis},
};

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerOptions {
    /// Extensions (without the dot) analyzed by [`Analyzer::analyze_project`]
    pub extensions: Vec<String>,
    pub skip_tests: bool,
    /// Path aliases used when linking files, in addition to `tsconfig.json`
    pub paths: HashMap<String, Vec<String>>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            extensions: ANALYZED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            skip_tests: true,
            paths: HashMap::new(),
        }
    }
}

/// Syntax-tree analyzer with a per-instance cache keyed by absolute path.
///
/// The cache is never invalidated; build a fresh analyzer per run.
#[derive(Default)]
pub struct Analyzer {
    options: AnalyzerOptions,
    cache: DashMap<PathBuf, FileAnalysis>,
}

impl Analyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        Self { options, cache: DashMap::new() }
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Replace the scalar options and extend the alias table.
    pub fn set_options(&mut self, options: AnalyzerOptions) {
        let AnalyzerOptions { extensions, skip_tests, paths } = options;
        self.options.extensions = extensions;
        self.options.skip_tests = skip_tests;
        self.options.paths.extend(paths);
    }

    pub fn analyze_file(&self, file: &Path) -> Result<FileAnalysis> {
        let file = absolute(file)?;
        parser::analyze_file(&file, &self.cache)
    }

    /// Previously computed analysis for `file`, if any.
    pub fn cached(&self, file: &Path) -> Option<FileAnalysis> {
        let file = absolute(file).ok()?;
        self.cache.get(&file).map(|v| v.clone())
    }

    /// Analyze every source file below `root` and link them.
    ///
    /// Files that fail to read or parse are logged and left out.
    pub fn analyze_project(&self, root: &Path) -> Result<ProjectAnalysis> {
        let project_path = absolute(root)?;
        info!("Analyzing project: {}", project_path.display());

        let collector = CollectorConfig {
            extensions: self.options.extensions.clone(),
            skip_tests: self.options.skip_tests,
            ..CollectorConfig::new(&project_path)
        };
        let sources = collect_source_files(&collector)
            .with_context(|| format!("Failed to walk {}", project_path.display()))?;

        let files: BTreeMap<PathBuf, FileAnalysis> = sources
            .par_iter()
            .filter_map(|file| match parser::analyze_file(file, &self.cache) {
                Ok(analysis) => Some((file.clone(), analysis)),
                Err(err) => {
                    warn!("Skipping {}: {:#}", file.display(), err);
                    None
                }
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        let mut paths = read_tsconfig_paths(&project_path);
        paths.extend(self.options.paths.clone());

        let dependencies = build_dependency_graph(&files, &paths);
        let circular_dependencies = detect_circular_dependencies(&dependencies);
        let export_conflicts = find_export_conflicts(&files);

        debug!(
            "Project analyzed: {} files, {} circular dependencies, {} export conflicts",
            files.len(),
            circular_dependencies.len(),
            export_conflicts.len()
        );

        Ok(ProjectAnalysis {
            project_path,
            files,
            dependencies,
            circular_dependencies,
            export_conflicts,
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let path = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    Ok(clean(path))
}
