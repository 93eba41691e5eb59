//! Core analysis for exportgen.
//!
//! This crate provides shared functionality for analyzing JavaScript/TypeScript
//! packages, including:
//! - Parsing exports, imports, re-exports and type exports from JS/TS files
//! - Resolving relative and `tsconfig.json` aliased imports between files
//! - Collecting source files from a package
//! - Project analysis (dependency graph, circular dependencies, export conflicts)

mod analyzer;
mod collector;
mod config;
mod constants;
mod graph;
mod parser;
mod resolver;
mod types;

// Re-export public API
pub use analyzer::{Analyzer, AnalyzerOptions};
pub use collector::{CollectorConfig, collect_source_files, is_test_file};
pub use config::read_tsconfig_paths;
pub use constants::{
    ANALYZED_EXTENSIONS, DECLARATION_SUFFIX, IGNORED_DIRS, SOURCE_EXTENSIONS, TEST_FILE_MARKERS,
};
pub use graph::{build_dependency_graph, detect_circular_dependencies, find_export_conflicts};
pub use parser::{analyze_file, analyze_source, source_type_for};
pub use resolver::resolve;
pub use types::{
    CircularDependency, DependencyGraph, ExportConflict, ExportInfo, ExportKind, FileAnalysis,
    ImportInfo, ProjectAnalysis, ReExportInfo, SourceLocation, TypeExportInfo, TypeExportKind,
};
