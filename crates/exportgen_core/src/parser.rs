use anyhow::{Context, Result, bail};
use dashmap::DashMap;
use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::{GetSpan, SourceType, Span};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::types::{
    ExportInfo, ExportKind, FileAnalysis, ImportInfo, ReExportInfo, SourceLocation,
    TypeExportInfo, TypeExportKind,
};

/// Analyze a file on disk, consulting and filling `cache`.
pub fn analyze_file(file: &Path, cache: &DashMap<PathBuf, FileAnalysis>) -> Result<FileAnalysis> {
    if let Some(v) = cache.get(file) {
        trace!("Cache hit for analysis: {}", file.display());
        return Ok(v.clone());
    }
    trace!("Parsing file for exports: {}", file.display());
    let src =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let analysis = analyze_source(file, &src)?;
    cache.insert(file.to_path_buf(), analysis.clone());
    Ok(analysis)
}

/// Extract exports, imports, re-exports and type exports from `src`.
///
/// Recoverable syntax errors are tolerated; only an unrecoverable parse is an error.
pub fn analyze_source(file: &Path, src: &str) -> Result<FileAnalysis> {
    let allocator = Allocator::default();
    let ParserReturn { program, errors, panicked, .. } =
        OxcParser::new(&allocator, src, source_type_for(file)).parse();

    if panicked {
        bail!("Failed to parse {} ({} syntax errors)", file.display(), errors.len());
    }
    if !errors.is_empty() {
        debug!("{} recoverable syntax errors in {}", errors.len(), file.display());
    }

    let mut collector = ExportCollector::new(file, src, &program.comments);

    let first_statement = program.body.first().map(|s| s.span().start).unwrap_or(u32::MAX);
    collector.analysis.file_comments = program
        .comments
        .iter()
        .filter(|c| c.span.end <= first_statement)
        .map(|c| slice_source(src, c.span).trim().to_string())
        .collect();

    for stmt in &program.body {
        match stmt {
            Statement::ImportDeclaration(decl) => collector.import(decl),
            Statement::ExportNamedDeclaration(decl) => collector.named_export(decl),
            Statement::ExportDefaultDeclaration(decl) => collector.default_export(decl),
            Statement::ExportAllDeclaration(decl) => collector.export_all(decl),
            _ => {}
        }
    }

    let mut analysis = collector.analysis;
    analysis.has_exports = analysis.export_count() > 0;
    debug!(
        "Found {} exports, {} re-exports, {} type exports in {}",
        analysis.exports.len(),
        analysis.re_exports.len(),
        analysis.type_exports.len(),
        file.display()
    );
    Ok(analysis)
}

struct ExportCollector<'s> {
    src: &'s str,
    lines: LineIndex,
    /// JSDoc blocks as (end offset, text), ordered by end offset
    doc_blocks: Vec<(u32, String)>,
    analysis: FileAnalysis,
}

impl<'s> ExportCollector<'s> {
    fn new(file: &Path, src: &'s str, comments: &[Comment]) -> Self {
        let mut doc_blocks: Vec<(u32, String)> = comments
            .iter()
            .filter_map(|c| {
                let text = slice_source(src, c.span);
                (text.starts_with("/**") && !text.starts_with("/**/"))
                    .then(|| (c.span.end, text.trim().to_string()))
            })
            .collect();
        doc_blocks.sort_by_key(|(end, _)| *end);

        Self { src, lines: LineIndex::new(src), doc_blocks, analysis: FileAnalysis::new(file) }
    }

    /// The JSDoc block immediately preceding `start`, separated only by whitespace.
    fn doc_before(&self, start: u32) -> Option<String> {
        let idx = self.doc_blocks.partition_point(|(end, _)| *end <= start);
        let (end, text) = self.doc_blocks.get(idx.checked_sub(1)?)?;
        let gap = self.src.get(*end as usize..start as usize)?;
        gap.trim().is_empty().then(|| text.clone())
    }

    fn import(&mut self, decl: &ImportDeclaration) {
        let mut info = ImportInfo {
            module_specifier: decl.source.value.to_string(),
            named_imports: Vec::new(),
            default_import: None,
            namespace_import: None,
            is_type_only: decl.import_kind.is_type(),
            location: self.lines.location(decl.span),
        };

        if let Some(specifiers) = &decl.specifiers {
            for spec in specifiers.iter() {
                match spec {
                    ImportDeclarationSpecifier::ImportSpecifier(s) => {
                        info.named_imports.push(module_export_name(&s.imported));
                    }
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                        info.default_import = Some(s.local.name.to_string());
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                        info.namespace_import = Some(s.local.name.to_string());
                    }
                }
            }
        }

        trace!("Found import: '{}'", info.module_specifier);
        self.analysis.imports.push(info);
    }

    fn named_export(&mut self, decl: &ExportNamedDeclaration) {
        let type_only = decl.export_kind.is_type();

        if let Some(source) = &decl.source {
            let exports: Vec<String> =
                decl.specifiers.iter().map(|s| module_export_name(&s.exported)).collect();
            trace!("Found re-export of {:?} from '{}'", exports, source.value);
            self.analysis.re_exports.push(ReExportInfo {
                module_specifier: source.value.to_string(),
                is_namespace_reexport: exports.is_empty(),
                exports,
                is_type_only: type_only,
                location: self.lines.location(decl.span),
            });
            return;
        }

        let documentation = self.doc_before(decl.span.start);

        if let Some(declaration) = &decl.declaration {
            self.declaration(declaration, documentation);
            return;
        }

        // export { a, b as c }
        for spec in decl.specifiers.iter() {
            let name = module_export_name(&spec.exported);
            let location = self.lines.location(spec.span);
            self.analysis.exports.push(ExportInfo {
                is_default: name == "default",
                name,
                kind: ExportKind::Unknown,
                is_type_only: type_only || spec.export_kind.is_type(),
                documentation: documentation.clone(),
                location,
            });
        }
    }

    fn declaration(&mut self, declaration: &Declaration, documentation: Option<String>) {
        match declaration {
            Declaration::VariableDeclaration(var) => {
                let kind = match var.kind {
                    VariableDeclarationKind::Const => ExportKind::Const,
                    VariableDeclarationKind::Let => ExportKind::Let,
                    _ => ExportKind::Variable,
                };
                for declarator in var.declarations.iter() {
                    let mut names = Vec::new();
                    binding_names(&declarator.id, &mut names);
                    for name in names {
                        self.push_export(
                            name,
                            kind,
                            false,
                            false,
                            documentation.clone(),
                            declarator.span,
                        );
                    }
                }
            }
            Declaration::FunctionDeclaration(func) => {
                let name = func.id.as_ref().map_or("default".to_string(), |id| id.name.to_string());
                self.push_export(name, ExportKind::Function, false, false, documentation, func.span);
            }
            Declaration::ClassDeclaration(class) => {
                let name =
                    class.id.as_ref().map_or("default".to_string(), |id| id.name.to_string());
                self.push_export(name, ExportKind::Class, false, false, documentation, class.span);
            }
            Declaration::TSTypeAliasDeclaration(alias) => {
                let name = alias.id.name.to_string();
                self.push_export(
                    name.clone(),
                    ExportKind::Type,
                    false,
                    true,
                    documentation.clone(),
                    alias.span,
                );
                self.push_type_export(name, TypeExportKind::TypeAlias, false, documentation, alias.span);
            }
            Declaration::TSInterfaceDeclaration(iface) => {
                let name = iface.id.name.to_string();
                self.push_export(
                    name.clone(),
                    ExportKind::Interface,
                    false,
                    true,
                    documentation.clone(),
                    iface.span,
                );
                self.push_type_export(name, TypeExportKind::Interface, false, documentation, iface.span);
            }
            Declaration::TSEnumDeclaration(enumeration) => {
                let name = enumeration.id.name.to_string();
                self.push_export(
                    name.clone(),
                    ExportKind::Enum,
                    false,
                    false,
                    documentation.clone(),
                    enumeration.span,
                );
                self.push_type_export(
                    name,
                    TypeExportKind::Enum,
                    false,
                    documentation,
                    enumeration.span,
                );
            }
            Declaration::TSModuleDeclaration(module) => {
                self.push_export(
                    module.id.name().to_string(),
                    ExportKind::Namespace,
                    false,
                    false,
                    documentation,
                    module.span,
                );
            }
            _ => {}
        }
    }

    fn default_export(&mut self, decl: &ExportDefaultDeclaration) {
        let documentation = self.doc_before(decl.span.start);
        match &decl.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(_) => self.push_export(
                "default".to_string(),
                ExportKind::Function,
                true,
                false,
                documentation,
                decl.span,
            ),
            ExportDefaultDeclarationKind::ClassDeclaration(_) => self.push_export(
                "default".to_string(),
                ExportKind::Class,
                true,
                false,
                documentation,
                decl.span,
            ),
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(iface) => {
                let name = iface.id.name.to_string();
                self.push_export(
                    name.clone(),
                    ExportKind::Interface,
                    true,
                    true,
                    documentation.clone(),
                    decl.span,
                );
                self.push_type_export(name, TypeExportKind::Interface, true, documentation, iface.span);
            }
            _ => self.push_export(
                "default".to_string(),
                ExportKind::Unknown,
                true,
                false,
                documentation,
                decl.span,
            ),
        }
    }

    fn export_all(&mut self, decl: &ExportAllDeclaration) {
        // `export * as ns from` keeps the namespace name
        let exports: Vec<String> = decl.exported.as_ref().map(module_export_name).into_iter().collect();
        trace!("Found namespace re-export from '{}'", decl.source.value);
        self.analysis.re_exports.push(ReExportInfo {
            module_specifier: decl.source.value.to_string(),
            exports,
            is_namespace_reexport: true,
            is_type_only: decl.export_kind.is_type(),
            location: self.lines.location(decl.span),
        });
    }

    fn push_export(
        &mut self,
        name: String,
        kind: ExportKind,
        is_default: bool,
        is_type_only: bool,
        documentation: Option<String>,
        span: Span,
    ) {
        // Overload signatures and merged declarations share one export.
        if self.analysis.exports.iter().any(|e| e.name == name && e.is_default == is_default) {
            trace!("Merging repeated declaration of '{}'", name);
            return;
        }
        trace!("Found {} export '{}'", kind, name);
        let location = self.lines.location(span);
        self.analysis.exports.push(ExportInfo {
            name,
            kind,
            is_default,
            is_type_only,
            documentation,
            location,
        });
    }

    fn push_type_export(
        &mut self,
        name: String,
        kind: TypeExportKind,
        is_default: bool,
        documentation: Option<String>,
        span: Span,
    ) {
        if self.analysis.type_exports.iter().any(|e| e.name == name) {
            return;
        }
        let location = self.lines.location(span);
        let definition = slice_source(self.src, span).to_string();
        self.analysis.type_exports.push(TypeExportInfo {
            name,
            kind,
            is_default,
            documentation,
            location,
            definition,
        });
    }
}

fn module_export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

/// Collect every identifier bound by a (possibly destructuring) pattern.
fn binding_names(pattern: &BindingPattern, names: &mut Vec<String>) {
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(ident) => names.push(ident.name.to_string()),
        BindingPatternKind::ObjectPattern(object) => {
            for property in object.properties.iter() {
                binding_names(&property.value, names);
            }
            if let Some(rest) = &object.rest {
                binding_names(&rest.argument, names);
            }
        }
        BindingPatternKind::ArrayPattern(array) => {
            for element in array.elements.iter().flatten() {
                binding_names(element, names);
            }
            if let Some(rest) = &array.rest {
                binding_names(&rest.argument, names);
            }
        }
        BindingPatternKind::AssignmentPattern(assign) => binding_names(&assign.left, names),
    }
}

pub fn source_type_for(path: &Path) -> SourceType {
    let ext = path.extension().and_then(|e| e.to_str());

    // Exports only parse as a module; CommonJS files stay scripts.
    SourceType::default()
        .with_jsx(matches!(ext, Some("tsx") | Some("jsx")))
        .with_typescript(matches!(ext, Some("ts") | Some("tsx") | Some("mts") | Some("cts")))
        .with_module(!matches!(ext, Some("cjs") | Some("cts")))
}

fn slice_source(source: &str, span: Span) -> &str {
    source.get(span.start as usize..span.end as usize).unwrap_or_default()
}

#[derive(Debug)]
struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut line_starts = Vec::with_capacity(128);
        line_starts.push(0);
        for (idx, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((idx + 1) as u32);
            }
        }
        Self { line_starts }
    }

    fn position(&self, offset: u32) -> (u32, u32) {
        let idx = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        };
        (idx as u32 + 1, offset - self.line_starts[idx] + 1)
    }

    fn location(&self, span: Span) -> SourceLocation {
        let (line, column) = self.position(span.start);
        let (end_line, end_column) = self.position(span.end);
        SourceLocation { line, column, end_line, end_column }
    }
}
