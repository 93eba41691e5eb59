use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use std::{
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    config::{
        ExportConfig, ExportsConfigFile, GenerateArgs, ListArgs, ValidateArgs, cli_overrides,
        generator_options, resolve_package_config, scanner_options,
    },
    config_file::load_config,
    constants::MANIFEST_FILE,
    discovery::resolve_packages,
    error::GenerateError,
    filter::filter_exports,
    generator::{generate_custom_exports, generate_summary, validate_exports},
    manifest::{backup_manifest, package_name, read_manifest, write_exports},
    reporter::{print_diagnostics, print_dry_run, print_summary, print_updated},
    scanner::{FileScanner, ScanMode, group_exports},
    types::ExportsRecord,
};

/// Result of one package processed by [`run_generate`].
#[derive(Debug)]
pub struct PackageReport {
    pub name: String,
    pub path: PathBuf,
    pub record: ExportsRecord,
    pub scan_mode: ScanMode,
    /// Whether package.json was rewritten (false on dry runs)
    pub written: bool,
    pub backup: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct GenerateReport {
    pub packages: Vec<PackageReport>,
    /// Packages without any export after filtering
    pub skipped: Vec<PathBuf>,
}

impl GenerateReport {
    pub fn export_count(&self) -> usize {
        self.packages.iter().map(|p| p.record.len()).sum()
    }
}

/// Generate and write (or preview) the exports of every selected package.
///
/// Packages are processed in order and the first failure aborts the run.
pub fn run_generate<W: Write>(args: &GenerateArgs, cwd: &Path, writer: &mut W) -> Result<GenerateReport> {
    let cli = cli_overrides(args)?;
    let config_file = load_config(args.config.as_deref(), cwd);
    let packages = resolve_packages(cwd, args.package.as_deref())?;
    info!("Generating exports for {} packages", packages.len());

    let scanner = FileScanner::new(scanner_options(args));
    let run = GenerateRun { args, cwd, cli: &cli, config_file: config_file.as_ref(), scanner: &scanner };

    let mut report = GenerateReport::default();
    for dir in packages {
        match run.package(&dir, writer)? {
            Some(package) => report.packages.push(package),
            None => report.skipped.push(dir),
        }
    }
    Ok(report)
}

struct GenerateRun<'a> {
    args: &'a GenerateArgs,
    cwd: &'a Path,
    cli: &'a ExportConfig,
    config_file: Option<&'a ExportsConfigFile>,
    scanner: &'a FileScanner,
}

impl GenerateRun<'_> {
    fn package<W: Write>(&self, dir: &Path, writer: &mut W) -> Result<Option<PackageReport>> {
        let manifest = read_manifest(dir)?;
        let name = package_name(&manifest).unwrap_or_default().to_string();
        info!("Processing package {} ({})", name, dir.display());

        let backup = if self.args.backup && !self.args.dry_run {
            Some(backup_manifest(dir)?)
        } else {
            None
        };

        let outcome = self.scanner.scan_package_with_analysis(dir)?;
        if let Some(analysis) = &outcome.analysis {
            if !analysis.circular_dependencies.is_empty() || !analysis.export_conflicts.is_empty() {
                warn!(
                    "{}: {} circular dependencies, {} export conflicts",
                    name,
                    analysis.circular_dependencies.len(),
                    analysis.export_conflicts.len()
                );
            }
            print_diagnostics(writer, analysis, self.cwd)?;
        }

        let config = resolve_package_config(self.config_file, &name, self.cli);
        let exports = filter_exports(
            outcome.exports,
            config.include.as_deref().unwrap_or_default(),
            config.exclude.as_deref().unwrap_or_default(),
        );
        if exports.is_empty() {
            warn!("No exports found for {}, skipping", name);
            return Ok(None);
        }

        for (category, members) in group_exports(&exports) {
            debug!("{}: {} {} exports", name, members.len(), category);
        }

        let options = generator_options(&config);
        let record = generate_custom_exports(&exports, &options, config.mappings.as_ref());
        if !validate_exports(&record) {
            bail!(GenerateError::Validation(name));
        }

        let summary = generate_summary(&record);
        info!("{}: {}", name, summary.lines().next().unwrap_or_default());
        print_summary(writer, &name, &summary)?;

        if self.args.dry_run {
            print_dry_run(writer, &name, &record)?;
        } else {
            write_exports(dir, manifest, &record)
                .with_context(|| format!("Failed to update exports for {}", name))?;
            print_updated(writer, &name, &dir.join(MANIFEST_FILE), self.cwd)?;
        }

        Ok(Some(PackageReport {
            name,
            path: dir.to_path_buf(),
            record,
            scan_mode: outcome.mode,
            written: !self.args.dry_run,
            backup,
        }))
    }
}

pub fn run_list(args: &ListArgs) -> Result<()> {
    debug!("List arguments: {:?}", args);
    info!("The list command is not yet implemented");
    Ok(())
}

pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    debug!("Validate arguments: {:?}", args);
    info!("The validate command is not yet implemented");
    Ok(())
}
