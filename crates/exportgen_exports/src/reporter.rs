use std::{
    io::{self, Write},
    path::{Component, Path, PathBuf},
};

use colored::Colorize;
use exportgen_core::ProjectAnalysis;
use log::{debug, trace};

use crate::types::ExportsRecord;

/// Display `path` relative to `cwd` when they share a root.
fn display_path(path: &Path, cwd: &Path) -> String {
    match make_relative(path, cwd) {
        Some(rel) => rel.to_string_lossy().to_string(),
        None => {
            trace!("Could not relativize {:?}, using original", path);
            path.to_string_lossy().to_string()
        }
    }
}

/// Create a relative path from `base` to `target`
fn make_relative(target: &Path, base: &Path) -> Option<PathBuf> {
    let mut target_components = target.components().peekable();
    let mut base_components = base.components().peekable();

    if target_components.peek() != base_components.peek() {
        return None;
    }

    while let (Some(t), Some(b)) = (target_components.peek(), base_components.peek()) {
        if t != b {
            break;
        }
        target_components.next();
        base_components.next();
    }

    let mut result = PathBuf::new();
    for _ in base_components {
        result.push("..");
    }
    for component in target_components {
        match component {
            Component::Normal(p) => result.push(p),
            Component::ParentDir => result.push(".."),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if result.as_os_str().is_empty() { Some(PathBuf::from(".")) } else { Some(result) }
}

pub fn print_summary<W: Write>(writer: &mut W, package: &str, summary: &str) -> io::Result<()> {
    writeln!(writer, "{} {}", "●".bright_blue(), package.bold())?;
    for line in summary.lines() {
        writeln!(writer, "  {}", line.dimmed())?;
    }
    Ok(())
}

/// Print the exports that would be written, as package.json JSON.
pub fn print_dry_run<W: Write>(writer: &mut W, package: &str, record: &ExportsRecord) -> io::Result<()> {
    debug!("Dry run for {}: {} exports", package, record.len());
    let json = serde_json::to_string_pretty(record).map_err(io::Error::other)?;
    writeln!(writer, "\n{} Dry run, exports for {}:", "⚠".yellow().bold(), package.bold())?;
    writeln!(writer, "{json}")?;
    writer.flush()
}

pub fn print_updated<W: Write>(writer: &mut W, package: &str, manifest: &Path, cwd: &Path) -> io::Result<()> {
    writeln!(
        writer,
        "{} Updated exports for {} ({})",
        "✓".green().bold(),
        package.bold(),
        display_path(manifest, cwd).blue()
    )?;
    writer.flush()
}

/// Print circular dependencies and export-name conflicts found by the analyzer.
pub fn print_diagnostics<W: Write>(
    writer: &mut W,
    analysis: &ProjectAnalysis,
    cwd: &Path,
) -> io::Result<()> {
    let cycles = &analysis.circular_dependencies;
    let conflicts = &analysis.export_conflicts;
    debug!("Printing {} cycles and {} conflicts", cycles.len(), conflicts.len());

    if !cycles.is_empty() {
        writeln!(
            writer,
            "{} {} circular {} detected",
            "⚠".yellow().bold(),
            cycles.len().to_string().yellow(),
            if cycles.len() == 1 { "dependency" } else { "dependencies" }
        )?;
        for cycle in cycles {
            let chain = cycle
                .chain
                .iter()
                .map(|f| display_path(f, cwd))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", "→".dimmed()));
            writeln!(writer, "{}  {}", "└──".dimmed(), chain)?;
        }
    }

    if !conflicts.is_empty() {
        writeln!(
            writer,
            "{} {} export name {} across files",
            "⚠".yellow().bold(),
            conflicts.len().to_string().yellow(),
            if conflicts.len() == 1 { "conflict" } else { "conflicts" }
        )?;
        for conflict in conflicts {
            writeln!(writer, "{}", conflict.export_name.bright_white().bold())?;
            for (idx, (file, kind)) in
                conflict.conflicting_files.iter().zip(&conflict.export_kinds).enumerate()
            {
                let prefix = if idx == conflict.conflicting_files.len() - 1 { "└──" } else { "├──" };
                writeln!(writer, "{}  {} ({})", prefix.dimmed(), display_path(file, cwd), kind)?;
            }
        }
    }

    writer.flush()
}

pub fn print_finished<W: Write>(
    writer: &mut W,
    elapsed_ms: u128,
    packages: usize,
    exports: usize,
) -> io::Result<()> {
    writeln!(
        writer,
        "\n{} Finished in {}ms on {} packages ({} exports).",
        "●".bright_blue(),
        elapsed_ms.to_string().cyan(),
        packages.to_string().cyan(),
        exports.to_string().cyan()
    )?;
    writer.flush()
}
