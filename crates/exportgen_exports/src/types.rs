use exportgen_core::{ExportKind, SourceLocation};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CJS_DIR, DEFAULT_CJS_EXTENSION, DEFAULT_DIST_DIR, DEFAULT_ESM_DIR,
    DEFAULT_ESM_EXTENSION, DEFAULT_TYPES_EXTENSION,
};

/// One exportable unit detected in a package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageExport {
    /// Public export path, always starting with "."
    pub key: String,
    /// Originating file relative to the package root, `/`-separated
    pub source_path: String,
    pub dual_format: bool,
    pub has_types: bool,
    /// Only filled by precise scanning
    pub metadata: Option<ExportMetadata>,
}

impl PackageExport {
    pub fn new(key: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            source_path: source_path.into(),
            dual_format: false,
            has_types: false,
            metadata: None,
        }
    }

    pub fn is_json(&self) -> bool {
        self.source_path.ends_with(".json")
    }
}

/// Details about where an export came from. Informational only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportMetadata {
    pub export_name: Option<String>,
    pub export_kind: Option<ExportKind>,
    pub is_default: bool,
    pub is_type_only: bool,
    pub is_index_file: bool,
    pub is_re_export: bool,
    pub module_specifier: Option<String>,
    pub documentation: Option<String>,
    pub location: Option<SourceLocation>,
    /// Exports, re-exports and type exports found in the source file
    pub export_count: usize,
    /// Whether a syntax-tree analysis of the file backs this entry
    pub is_analyzed: bool,
}

/// Target of one module format inside a conditional export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatTarget {
    pub default: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalExport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<FormatTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require: Option<FormatTarget>,
}

/// Value bound to a key of the exports map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportEntry {
    Path(String),
    Conditional(ConditionalExport),
}

impl ExportEntry {
    pub fn is_valid(&self) -> bool {
        match self {
            ExportEntry::Path(path) => path.starts_with("./"),
            ExportEntry::Conditional(c) => c.import.is_some() || c.require.is_some(),
        }
    }

    /// Both an ESM and a CommonJS target.
    pub fn is_dual_format(&self) -> bool {
        matches!(self, ExportEntry::Conditional(c) if c.import.is_some() && c.require.is_some())
    }
}

/// The `exports` field of a package.json, in output order.
pub type ExportsRecord = IndexMap<String, ExportEntry>;

#[derive(Debug, Clone, PartialEq)]
pub struct OutputExtensions {
    pub esm: String,
    pub cjs: String,
    pub types: String,
}

impl Default for OutputExtensions {
    fn default() -> Self {
        Self {
            esm: DEFAULT_ESM_EXTENSION.to_string(),
            cjs: DEFAULT_CJS_EXTENSION.to_string(),
            types: DEFAULT_TYPES_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportGeneratorOptions {
    pub dual_format: bool,
    pub dist_dir: String,
    pub esm_dir: String,
    pub cjs_dir: String,
    pub extensions: OutputExtensions,
    /// Key prefix to priority; first matching prefix wins, lower sorts first
    pub export_priorities: IndexMap<String, i64>,
}

impl Default for ExportGeneratorOptions {
    fn default() -> Self {
        Self {
            dual_format: true,
            dist_dir: DEFAULT_DIST_DIR.to_string(),
            esm_dir: DEFAULT_ESM_DIR.to_string(),
            cjs_dir: DEFAULT_CJS_DIR.to_string(),
            extensions: OutputExtensions::default(),
            export_priorities: IndexMap::new(),
        }
    }
}
