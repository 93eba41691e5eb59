use anyhow::{Context, Result};
use exportgen_core::{Analyzer, ExportKind, FileAnalysis, IGNORED_DIRS, ProjectAnalysis, TypeExportKind};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use log::{debug, info, trace, warn};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::{
    constants::{
        BUNDLER_CONFIGS, DEFAULT_IGNORE_PATTERNS, DEFAULT_SOURCE_PATTERNS, IGNORED_JSON_FILES,
    },
    error::GenerateError,
    keys::{export_key, json_export_key, re_export_key, symbol_export_key},
    types::{ExportMetadata, PackageExport},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanMode {
    /// Glob patterns over file names
    #[default]
    Fast,
    /// Syntax-tree analysis of every source file
    Precise,
}

#[derive(Debug, Clone)]
pub struct ScannerOptions {
    pub mode: ScanMode,
    /// Retry with [`ScanMode::Fast`] when precise analysis fails
    pub fallback_to_fast: bool,
    /// Let fast scanning reuse analyses already held by the analyzer
    pub enable_caching: bool,
    pub source_patterns: Vec<String>,
    /// Extra ignore globs on top of the defaults
    pub ignore_patterns: Vec<String>,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            mode: ScanMode::Fast,
            fallback_to_fast: true,
            enable_caching: true,
            source_patterns: DEFAULT_SOURCE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Exports found in a package, with the project analysis when one was made.
#[derive(Debug)]
pub struct ScanOutcome {
    pub exports: Vec<PackageExport>,
    pub analysis: Option<ProjectAnalysis>,
    /// Mode that produced `exports`, after any fallback
    pub mode: ScanMode,
}

/// Detects exportable units of a package.
///
/// One scanner is meant to live for a single command run; its analysis cache
/// is never invalidated.
#[derive(Default)]
pub struct FileScanner {
    options: ScannerOptions,
    analyzer: Analyzer,
}

impl FileScanner {
    pub fn new(options: ScannerOptions) -> Self {
        Self { options, analyzer: Analyzer::default() }
    }

    pub fn with_analyzer(options: ScannerOptions, analyzer: Analyzer) -> Self {
        Self { options, analyzer }
    }

    pub fn options(&self) -> &ScannerOptions {
        &self.options
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn scan_package(&self, root: &Path) -> Result<Vec<PackageExport>> {
        Ok(self.scan_package_with_analysis(root)?.exports)
    }

    pub fn scan_package_with_analysis(&self, root: &Path) -> Result<ScanOutcome> {
        if !root.is_dir() {
            return Err(GenerateError::Scan(root.to_path_buf()))
                .context(format!("Package directory not found: {}", root.display()));
        }
        info!("Scanning package: {} ({:?} mode)", root.display(), self.options.mode);

        if self.options.mode == ScanMode::Fast {
            let exports = self.scan_fast(root)?;
            return Ok(ScanOutcome { exports, analysis: None, mode: ScanMode::Fast });
        }

        let precise = self.scan_precise(root);
        self.finish_precise(root, precise)
    }

    /// Turn the result of a precise scan into an outcome, retrying in fast
    /// mode on failure when fallback is enabled.
    fn finish_precise(
        &self,
        root: &Path,
        precise: Result<(Vec<PackageExport>, ProjectAnalysis)>,
    ) -> Result<ScanOutcome> {
        match precise {
            Ok((exports, analysis)) => {
                Ok(ScanOutcome { exports, analysis: Some(analysis), mode: ScanMode::Precise })
            }
            Err(err) if self.options.fallback_to_fast => {
                warn!("Precise scan of {} failed: {:#}", root.display(), err);
                warn!("Falling back to fast scanning");
                let exports = self.scan_fast(root)?;
                Ok(ScanOutcome { exports, analysis: None, mode: ScanMode::Fast })
            }
            Err(err) => Err(err.context(GenerateError::Scan(root.to_path_buf()))),
        }
    }

    fn scan_fast(&self, root: &Path) -> Result<Vec<PackageExport>> {
        let dual_format = has_bundler_config(root);
        debug!("Dual format support for {}: {}", root.display(), dual_format);

        let mut exports = Vec::new();
        for rel in self.source_files(root)? {
            let mut has_types = rel.ends_with(".ts");
            let mut metadata = ExportMetadata { export_count: 1, ..Default::default() };

            if self.options.enable_caching
                && let Some(analysis) = self.analyzer.cached(&root.join(&rel))
            {
                trace!("Using cached analysis for {}", rel);
                has_types = analysis.provides_types();
                metadata.export_count = analysis.export_count();
                metadata.is_analyzed = true;
            }

            exports.push(PackageExport {
                key: export_key(&rel),
                source_path: rel,
                dual_format,
                has_types,
                metadata: Some(metadata),
            });
        }

        for file in json_files(root)? {
            exports.push(PackageExport::new(json_export_key(&file), file));
        }

        debug!("Fast scan found {} exportable files", exports.len());
        Ok(exports)
    }

    /// Files matched by each source pattern in turn, sorted within a pattern.
    fn source_files(&self, root: &Path) -> Result<Vec<String>> {
        let ignore = build_globset(
            DEFAULT_IGNORE_PATTERNS.iter().copied().chain(self.options.ignore_patterns.iter().map(String::as_str)),
        )?;
        let patterns = self
            .options
            .source_patterns
            .iter()
            .map(|p| compile_glob(p).map(|g| g.compile_matcher()))
            .collect::<Result<Vec<_>>>()?;

        let mut candidates: Vec<String> = walk_relative(root, None)?
            .into_iter()
            .filter(|rel| {
                let ignored = ignore.is_match(rel);
                if ignored {
                    trace!("Ignoring {}", rel);
                }
                !ignored
            })
            .collect();
        candidates.sort();

        let mut files = Vec::new();
        for pattern in &patterns {
            files.extend(candidates.iter().filter(|rel| pattern.is_match(rel.as_str())).cloned());
        }
        Ok(files)
    }

    fn scan_precise(&self, root: &Path) -> Result<(Vec<PackageExport>, ProjectAnalysis)> {
        let project = self.analyzer.analyze_project(root)?;
        let mut exports = Vec::new();

        for (file, analysis) in &project.files {
            if !analysis.has_exports {
                continue;
            }
            let rel = relative_path(&project.project_path, file);
            if !is_source_file(&rel) {
                trace!("Skipping non-source file {}", rel);
                continue;
            }
            exports.extend(exports_from_analysis(&rel, analysis));
        }

        info!("Precise scan found {} exports in {} files", exports.len(), project.files.len());
        Ok((exports, project))
    }
}

/// Re-express one analyzed file as package exports.
///
/// `src/index.*` collapses to the single key ".".
pub fn exports_from_analysis(rel: &str, analysis: &FileAnalysis) -> Vec<PackageExport> {
    let dual_format = rel.contains("src/") || rel.contains("lib/");

    if is_src_index(rel) {
        return vec![PackageExport {
            key: ".".to_string(),
            source_path: rel.to_string(),
            dual_format,
            has_types: analysis.provides_types(),
            metadata: Some(ExportMetadata {
                is_index_file: true,
                export_count: analysis.export_count(),
                is_analyzed: true,
                ..Default::default()
            }),
        }];
    }

    let mut exports = Vec::new();
    for info in &analysis.exports {
        exports.push(PackageExport {
            key: symbol_export_key(rel, &info.name, info.is_default),
            source_path: rel.to_string(),
            dual_format,
            has_types: info.is_type_only || analysis.is_declaration_file,
            metadata: Some(ExportMetadata {
                export_name: Some(info.name.clone()),
                export_kind: Some(info.kind),
                is_default: info.is_default,
                is_type_only: info.is_type_only,
                documentation: info.documentation.clone(),
                location: Some(info.location),
                is_analyzed: true,
                ..Default::default()
            }),
        });
    }

    for info in &analysis.re_exports {
        exports.push(PackageExport {
            key: re_export_key(rel, &info.exports, info.is_namespace_reexport),
            source_path: rel.to_string(),
            dual_format,
            has_types: info.is_type_only,
            metadata: Some(ExportMetadata {
                is_re_export: true,
                is_type_only: info.is_type_only,
                module_specifier: Some(info.module_specifier.clone()),
                location: Some(info.location),
                is_analyzed: true,
                ..Default::default()
            }),
        });
    }

    for info in &analysis.type_exports {
        let kind = match info.kind {
            TypeExportKind::Interface => ExportKind::Interface,
            TypeExportKind::TypeAlias => ExportKind::Type,
            TypeExportKind::Enum => ExportKind::Enum,
        };
        exports.push(PackageExport {
            key: symbol_export_key(rel, &info.name, info.is_default),
            source_path: rel.to_string(),
            dual_format,
            has_types: true,
            metadata: Some(ExportMetadata {
                export_name: Some(info.name.clone()),
                export_kind: Some(kind),
                is_default: info.is_default,
                is_type_only: true,
                documentation: info.documentation.clone(),
                location: Some(info.location),
                is_analyzed: true,
                ..Default::default()
            }),
        });
    }

    exports
}

/// Category used when reporting exports.
pub fn categorize_export(exp: &PackageExport) -> &'static str {
    if let Some(kind) = exp.metadata.as_ref().and_then(|m| m.export_kind) {
        return match kind {
            ExportKind::Function => "functions",
            ExportKind::Class => "classes",
            ExportKind::Interface | ExportKind::Type => "types",
            ExportKind::Const | ExportKind::Let | ExportKind::Variable => "constants",
            _ => "default",
        };
    }

    if exp.source_path.contains("types/") {
        "types"
    } else if exp.source_path.contains("utils/") {
        "utils"
    } else if exp.source_path.contains("components/") {
        "components"
    } else {
        "default"
    }
}

pub fn group_exports(exports: &[PackageExport]) -> BTreeMap<&'static str, Vec<&PackageExport>> {
    let mut groups: BTreeMap<&'static str, Vec<&PackageExport>> = BTreeMap::new();
    for exp in exports {
        groups.entry(categorize_export(exp)).or_default().push(exp);
    }
    groups
}

pub fn has_bundler_config(root: &Path) -> bool {
    BUNDLER_CONFIGS.iter().any(|name| root.join(name).is_file())
}

fn is_src_index(rel: &str) -> bool {
    let path = Path::new(rel);
    path.parent() == Some(Path::new("src"))
        && path.file_stem().and_then(|s| s.to_str()) == Some("index")
}

fn is_source_file(rel: &str) -> bool {
    rel.starts_with("src/")
        || rel.starts_with("lib/")
        || !(rel.contains("node_modules") || rel.contains("dist") || rel.contains("build"))
}

/// Root-level JSON files that are package content, sorted.
fn json_files(root: &Path) -> Result<Vec<String>> {
    let mut files: Vec<String> = walk_relative(root, Some(1))?
        .into_iter()
        .filter(|name| name.ends_with(".json") && !IGNORED_JSON_FILES.contains(&name.as_str()))
        .collect();
    files.sort();
    Ok(files)
}

/// Every file below `root` as a `/`-separated relative path.
fn walk_relative(root: &Path, max_depth: Option<usize>) -> Result<Vec<String>> {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .max_depth(max_depth)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir && entry.depth() > 0 && IGNORED_DIRS.iter().any(|d| entry.file_name() == *d))
        })
        .build();

    let mut files = Vec::new();
    for res in walker {
        let dent = res.with_context(|| format!("Failed to walk {}", root.display()))?;
        if dent.file_type().is_some_and(|t| t.is_file()) {
            files.push(relative_path(root, dent.path()));
        }
    }
    Ok(files)
}

fn relative_path(root: &Path, file: &Path) -> String {
    let rel: PathBuf = file.strip_prefix(root).map(Path::to_path_buf).unwrap_or_else(|_| file.to_path_buf());
    rel.to_string_lossy().replace('\\', "/")
}

fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("Invalid glob pattern '{}'", pattern))
}

fn build_globset<'p>(patterns: impl IntoIterator<Item = &'p str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile_glob(pattern)?);
    }
    builder.build().context("Failed to build ignore patterns")
}
