use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use crate::constants::DECLARATION_SUFFIX;

/// Kind of declaration behind an exported symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExportKind {
    Function,
    Class,
    Interface,
    Type,
    Enum,
    Const,
    Let,
    Variable,
    Namespace,
    Unknown,
}

impl ExportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportKind::Function => "function",
            ExportKind::Class => "class",
            ExportKind::Interface => "interface",
            ExportKind::Type => "type",
            ExportKind::Enum => "enum",
            ExportKind::Const => "const",
            ExportKind::Let => "let",
            ExportKind::Variable => "var",
            ExportKind::Namespace => "namespace",
            ExportKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeExportKind {
    Interface,
    TypeAlias,
    Enum,
}

/// 1-based start and end position of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportInfo {
    pub name: String,
    pub kind: ExportKind,
    pub is_default: bool,
    pub is_type_only: bool,
    /// Raw JSDoc block attached to the export statement
    pub documentation: Option<String>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportInfo {
    pub module_specifier: String,
    pub named_imports: Vec<String>,
    pub default_import: Option<String>,
    pub namespace_import: Option<String>,
    pub is_type_only: bool,
    pub location: SourceLocation,
}

/// `export { a, b } from './x'`, `export * from './x'` and `export * as ns from './x'`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReExportInfo {
    pub module_specifier: String,
    /// Re-exported names in declaration order
    pub exports: Vec<String>,
    pub is_namespace_reexport: bool,
    pub is_type_only: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeExportInfo {
    pub name: String,
    pub kind: TypeExportKind,
    pub is_default: bool,
    pub documentation: Option<String>,
    pub location: SourceLocation,
    /// Source text of the declaration
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileAnalysis {
    pub file_path: PathBuf,
    pub exports: Vec<ExportInfo>,
    pub imports: Vec<ImportInfo>,
    pub re_exports: Vec<ReExportInfo>,
    pub type_exports: Vec<TypeExportInfo>,
    /// Comments preceding the first statement
    pub file_comments: Vec<String>,
    pub has_exports: bool,
    pub is_declaration_file: bool,
}

impl FileAnalysis {
    pub fn new(file_path: &Path) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
            exports: Vec::new(),
            imports: Vec::new(),
            re_exports: Vec::new(),
            type_exports: Vec::new(),
            file_comments: Vec::new(),
            has_exports: false,
            is_declaration_file: file_path.to_string_lossy().ends_with(DECLARATION_SUFFIX),
        }
    }

    pub fn export_count(&self) -> usize {
        self.exports.len() + self.re_exports.len() + self.type_exports.len()
    }

    /// Whether consumers of this file need a type declaration companion.
    pub fn provides_types(&self) -> bool {
        self.is_declaration_file
            || !self.type_exports.is_empty()
            || self.exports.iter().any(|e| e.is_type_only)
    }
}

/// Edges between analyzed files, in both directions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    pub dependencies: BTreeMap<PathBuf, Vec<PathBuf>>,
    pub dependents: BTreeMap<PathBuf, Vec<PathBuf>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircularDependency {
    /// Distinct files taking part in the cycle
    pub files: Vec<PathBuf>,
    /// The cycle as walked, first file repeated at the end
    pub chain: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportConflict {
    pub export_name: String,
    pub conflicting_files: Vec<PathBuf>,
    pub export_kinds: Vec<ExportKind>,
}

#[derive(Debug, Clone)]
pub struct ProjectAnalysis {
    pub project_path: PathBuf,
    pub files: BTreeMap<PathBuf, FileAnalysis>,
    pub dependencies: DependencyGraph,
    pub circular_dependencies: Vec<CircularDependency>,
    pub export_conflicts: Vec<ExportConflict>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export(name: &str, is_type_only: bool) -> ExportInfo {
        ExportInfo {
            name: name.to_string(),
            kind: ExportKind::Const,
            is_default: false,
            is_type_only,
            documentation: None,
            location: SourceLocation::default(),
        }
    }

    #[test]
    fn test_declaration_file_detected_from_path() {
        assert!(FileAnalysis::new(Path::new("src/types.d.ts")).is_declaration_file);
        assert!(!FileAnalysis::new(Path::new("src/types.ts")).is_declaration_file);
    }

    #[test]
    fn test_provides_types() {
        let mut analysis = FileAnalysis::new(Path::new("src/a.ts"));
        analysis.exports.push(export("a", false));
        assert!(!analysis.provides_types());

        analysis.exports.push(export("B", true));
        assert!(analysis.provides_types());
        assert_eq!(analysis.export_count(), 2);
    }

    #[test]
    fn test_export_kind_display() {
        assert_eq!(ExportKind::Variable.to_string(), "var");
        assert_eq!(ExportKind::Type.to_string(), "type");
    }
}
