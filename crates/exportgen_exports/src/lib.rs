//! package.json `exports` generation for JavaScript/TypeScript monorepos.
//!
//! A package is scanned for exportable files (by glob, or by analyzing every
//! source file), each file or symbol gets an export key, and the keys are
//! rendered into an exports map with `import`/`require` targets under `dist/`.
//!
//! # Examples
//!
//! ```no_run
//! use exportgen_exports::{GenerateArgs, run_generate};
//! use std::io::{BufWriter, Write};
//!
//! # fn main() -> anyhow::Result<()> {
//! let args = GenerateArgs { package: Some("core".to_string()), dry_run: true, ..Default::default() };
//!
//! let mut stdout = BufWriter::new(std::io::stdout());
//! let report = run_generate(&args, &std::env::current_dir()?, &mut stdout)?;
//! stdout.flush()?;
//! println!("{} exports", report.export_count());
//! # Ok(())
//! # }
//! ```
//!
//! The pipeline pieces are usable on their own:
//!
//! ```
//! use exportgen_exports::{ExportGeneratorOptions, PackageExport, generate_exports, validate_exports};
//!
//! let mut export = PackageExport::new(".", "src/index.ts");
//! export.dual_format = true;
//! let record = generate_exports(&[export], &ExportGeneratorOptions::default());
//! assert!(validate_exports(&record));
//! ```

mod command;
mod config;
mod config_file;
mod constants;
mod discovery;
mod error;
mod filter;
mod generator;
mod keys;
mod manifest;
mod reporter;
mod scanner;
mod types;

// Re-export public API
pub use command::{GenerateReport, PackageReport, run_generate, run_list, run_validate};
pub use config::{
    ExportConfig, ExportsConfigFile, GenerateArgs, ListArgs, ValidateArgs, apply_cli,
    cli_overrides, generator_options, merge_config, parse_mappings, resolve_package_config,
    scanner_options,
};
pub use config_file::{evaluate_script_config, find_config_file, load_config, read_config_file};
pub use discovery::resolve_packages;
pub use error::GenerateError;
pub use filter::{KeyPattern, filter_exports, matches_pattern};
pub use generator::{
    ensure_main_export, export_priority, generate_custom_exports, generate_exports,
    generate_summary, render_exports, sort_exports, unresolved_mappings, validate_exports,
};
pub use keys::{base_path, export_key, json_export_key, re_export_key, symbol_export_key};
pub use manifest::{
    Manifest, backup_manifest, package_name, read_manifest, validate_manifest, write_exports,
};
pub use reporter::{print_diagnostics, print_dry_run, print_finished, print_summary, print_updated};
pub use scanner::{
    FileScanner, ScanMode, ScanOutcome, ScannerOptions, categorize_export, exports_from_analysis,
    group_exports, has_bundler_config,
};
pub use types::{
    ConditionalExport, ExportEntry, ExportGeneratorOptions, ExportMetadata, ExportsRecord,
    FormatTarget, OutputExtensions, PackageExport,
};
