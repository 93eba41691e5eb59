use anyhow::{Result, bail};
use clap::Parser;
use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{
    error::GenerateError,
    scanner::{ScanMode, ScannerOptions},
    types::ExportGeneratorOptions,
};

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "generate")]
#[command(about = "Generate the package.json exports field from source files")]
pub struct GenerateArgs {
    /// Package name under packages/, or a path to a package directory
    #[arg(short, long)]
    pub package: Option<String>,

    /// Emit ESM-only paths instead of import/require pairs
    #[arg(long)]
    pub no_dual_format: bool,

    /// Print the generated exports without writing package.json
    #[arg(short, long)]
    pub dry_run: bool,

    /// Copy package.json to package.json.backup.<epoch-ms> before writing
    #[arg(short, long)]
    pub backup: bool,

    /// Only keep export keys matching one of these patterns (`*` is a wildcard)
    #[arg(short, long, num_args = 1..)]
    pub include: Option<Vec<String>>,

    /// Drop export keys matching any of these patterns
    #[arg(short, long, num_args = 1..)]
    pub exclude: Option<Vec<String>>,

    /// Custom key mappings as JSON, e.g. '{"./js": "./core/javascript"}'
    #[arg(short, long)]
    pub mappings: Option<String>,

    /// Configuration file (defaults to exports.config.* in the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Analyze source files instead of matching file names
    #[arg(long)]
    pub precise: bool,

    /// Fail instead of retrying with the fast scanner when analysis fails
    #[arg(long, requires = "precise")]
    pub no_fallback: bool,
}

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "list")]
#[command(about = "List the exports of a package")]
pub struct ListArgs {
    #[arg(short, long)]
    pub package: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "validate")]
#[command(about = "Validate the exports field of a package")]
pub struct ValidateArgs {
    #[arg(short, long)]
    pub package: Option<String>,

    /// Rewrite invalid entries
    #[arg(long)]
    pub fix: bool,
}

/// One layer of export settings. `None` means "not set by this layer".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
    /// Custom key to existing key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dual_format: Option<bool>,
    /// Key prefix to priority, lower sorts first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_priorities: Option<IndexMap<String, i64>>,
}

/// Root object of an `exports.config.*` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportsConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<ExportConfig>,
    /// Keyed by package name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<IndexMap<String, ExportConfig>>,
}

impl ExportsConfigFile {
    pub fn validate(&self) -> Result<()> {
        if self.global.is_none() && self.packages.is_none() {
            bail!(GenerateError::Config(
                "configuration must define 'global' or 'packages'".to_string()
            ));
        }
        let packages = self.packages.iter().flat_map(|p| p.values());
        for layer in self.global.iter().chain(packages) {
            if let Some(mappings) = &layer.mappings {
                check_mappings(mappings)?;
            }
        }
        Ok(())
    }

    pub fn package(&self, name: &str) -> Option<&ExportConfig> {
        self.packages.as_ref().and_then(|p| p.get(name))
    }
}

/// Merge a package layer on top of the global layer.
///
/// Pattern lists concatenate, tables merge with package keys winning,
/// `dualFormat` is overwritten only when the package sets it.
pub fn merge_config(global: Option<&ExportConfig>, package: Option<&ExportConfig>) -> ExportConfig {
    let mut merged = global.cloned().unwrap_or_default();
    let Some(package) = package else {
        return merged;
    };

    concat(&mut merged.include, package.include.as_ref());
    concat(&mut merged.exclude, package.exclude.as_ref());

    if let Some(mappings) = &package.mappings {
        merged.mappings.get_or_insert_default().extend(mappings.clone());
    }
    if let Some(priorities) = &package.export_priorities {
        merged.export_priorities.get_or_insert_default().extend(priorities.clone());
    }
    if package.dual_format.is_some() {
        merged.dual_format = package.dual_format;
    }

    merged
}

fn concat(target: &mut Option<Vec<String>>, extra: Option<&Vec<String>>) {
    if let Some(extra) = extra {
        target.get_or_insert_default().extend(extra.iter().cloned());
    }
}

/// Overlay CLI settings; every field the CLI sets replaces the file value.
pub fn apply_cli(config: ExportConfig, cli: &ExportConfig) -> ExportConfig {
    ExportConfig {
        include: cli.include.clone().or(config.include),
        exclude: cli.exclude.clone().or(config.exclude),
        mappings: cli.mappings.clone().or(config.mappings),
        dual_format: cli.dual_format.or(config.dual_format),
        export_priorities: config.export_priorities,
    }
}

/// Effective settings for one package: CLI > package > global > default.
pub fn resolve_package_config(
    file: Option<&ExportsConfigFile>,
    package_name: &str,
    cli: &ExportConfig,
) -> ExportConfig {
    let global = file.and_then(|f| f.global.as_ref());
    let package = file.and_then(|f| f.package(package_name));
    trace!("Config layers for {}: global={:?} package={:?}", package_name, global, package);

    let merged = apply_cli(merge_config(global, package), cli);
    debug!("Effective config for {}: {:?}", package_name, merged);
    merged
}

/// Check the CLI arguments and turn them into a config layer.
pub fn cli_overrides(args: &GenerateArgs) -> Result<ExportConfig> {
    for (flag, patterns) in [("--include", &args.include), ("--exclude", &args.exclude)] {
        if patterns.as_ref().is_some_and(|p| p.is_empty()) {
            bail!(GenerateError::Config(format!("{flag} requires at least one pattern")));
        }
    }

    let mappings = args.mappings.as_deref().map(parse_mappings).transpose()?;

    Ok(ExportConfig {
        include: args.include.clone(),
        exclude: args.exclude.clone(),
        mappings,
        dual_format: args.no_dual_format.then_some(false),
        export_priorities: None,
    })
}

pub fn parse_mappings(json: &str) -> Result<IndexMap<String, String>> {
    let mappings: IndexMap<String, String> = serde_json::from_str(json)
        .map_err(|err| GenerateError::Config(format!("invalid mappings JSON: {err}")))?;
    check_mappings(&mappings)?;
    Ok(mappings)
}

fn check_mappings(mappings: &IndexMap<String, String>) -> Result<()> {
    for (key, value) in mappings {
        if !key.starts_with("./") || !value.starts_with("./") {
            bail!(GenerateError::Config(format!(
                "mapping '{key}' -> '{value}' must use keys starting with './'"
            )));
        }
    }
    Ok(())
}

pub fn generator_options(config: &ExportConfig) -> ExportGeneratorOptions {
    ExportGeneratorOptions {
        dual_format: config.dual_format.unwrap_or(true),
        export_priorities: config.export_priorities.clone().unwrap_or_default(),
        ..Default::default()
    }
}

pub fn scanner_options(args: &GenerateArgs) -> ScannerOptions {
    ScannerOptions {
        mode: if args.precise { ScanMode::Precise } else { ScanMode::Fast },
        fallback_to_fast: !args.no_fallback,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Option<Vec<String>> {
        Some(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_merge_concatenates_patterns() {
        let global = ExportConfig { include: strings(&["a"]), ..Default::default() };
        let package = ExportConfig { include: strings(&["b"]), ..Default::default() };
        let merged = merge_config(Some(&global), Some(&package));
        assert_eq!(merged.include, strings(&["a", "b"]));
        assert_eq!(merged.exclude, None);
    }

    #[test]
    fn test_merge_tables_and_flags() {
        let global = ExportConfig {
            mappings: Some(IndexMap::from([
                ("./js".to_string(), "./core/javascript".to_string()),
                ("./ts".to_string(), "./core/typescript".to_string()),
            ])),
            dual_format: Some(true),
            export_priorities: Some(IndexMap::from([("./core".to_string(), 1)])),
            ..Default::default()
        };
        let package = ExportConfig {
            mappings: Some(IndexMap::from([("./ts".to_string(), "./core/ts".to_string())])),
            dual_format: Some(false),
            export_priorities: Some(IndexMap::from([("./presets".to_string(), 2)])),
            ..Default::default()
        };

        let merged = merge_config(Some(&global), Some(&package));
        let mappings = merged.mappings.unwrap();
        assert_eq!(mappings["./js"], "./core/javascript");
        assert_eq!(mappings["./ts"], "./core/ts");
        assert_eq!(merged.dual_format, Some(false));
        assert_eq!(merged.export_priorities.unwrap().len(), 2);

        let unset = ExportConfig::default();
        assert_eq!(merge_config(Some(&global), Some(&unset)).dual_format, Some(true));
    }

    #[test]
    fn test_merge_without_layers() {
        assert_eq!(merge_config(None, None), ExportConfig::default());
        let package = ExportConfig { exclude: strings(&["x"]), ..Default::default() };
        assert_eq!(merge_config(None, Some(&package)).exclude, strings(&["x"]));
    }

    #[test]
    fn test_cli_wins() {
        let file = ExportsConfigFile {
            global: Some(ExportConfig {
                include: strings(&["core"]),
                dual_format: Some(true),
                ..Default::default()
            }),
            packages: None,
        };
        let cli = ExportConfig {
            include: strings(&["presets"]),
            dual_format: Some(false),
            ..Default::default()
        };
        let resolved = resolve_package_config(Some(&file), "@scope/pkg", &cli);
        assert_eq!(resolved.include, strings(&["presets"]));
        assert_eq!(resolved.dual_format, Some(false));
    }

    #[test]
    fn test_package_section_is_looked_up_by_name() {
        let file: ExportsConfigFile = serde_json::from_str(
            r#"{"packages": {"@scope/pkg": {"exclude": ["test/*"], "exportPriorities": {"./core": 1}}}}"#,
        )
        .unwrap();
        let resolved = resolve_package_config(Some(&file), "@scope/pkg", &ExportConfig::default());
        assert_eq!(resolved.exclude, strings(&["test/*"]));
        assert_eq!(resolved.export_priorities.unwrap()["./core"], 1);

        let other = resolve_package_config(Some(&file), "other", &ExportConfig::default());
        assert_eq!(other, ExportConfig::default());
    }

    #[test]
    fn test_config_file_requires_a_section() {
        let empty: ExportsConfigFile = serde_json::from_str("{}").unwrap();
        let err = empty.validate().unwrap_err();
        assert!(matches!(err.downcast_ref::<GenerateError>(), Some(GenerateError::Config(_))));

        let global: ExportsConfigFile = serde_json::from_str(r#"{"global": {}}"#).unwrap();
        assert!(global.validate().is_ok());
    }

    #[test]
    fn test_config_file_mappings_need_relative_keys() {
        for json in [
            r#"{"global": {"mappings": {"js": "./core"}}}"#,
            r#"{"packages": {"core": {"mappings": {"./js": "core"}}}}"#,
        ] {
            let file: ExportsConfigFile = serde_json::from_str(json).unwrap();
            let err = file.validate().unwrap_err();
            assert!(
                matches!(err.downcast_ref::<GenerateError>(), Some(GenerateError::Config(_))),
                "{json}"
            );
        }

        let file: ExportsConfigFile =
            serde_json::from_str(r#"{"packages": {"core": {"mappings": {"./js": "./core"}}}}"#)
                .unwrap();
        assert!(file.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides() {
        let args = GenerateArgs {
            no_dual_format: true,
            include: strings(&["core"]),
            mappings: Some(r#"{"./js": "./core/javascript"}"#.to_string()),
            ..Default::default()
        };
        let cli = cli_overrides(&args).unwrap();
        assert_eq!(cli.dual_format, Some(false));
        assert_eq!(cli.include, strings(&["core"]));
        assert_eq!(cli.mappings.unwrap()["./js"], "./core/javascript");

        assert_eq!(cli_overrides(&GenerateArgs::default()).unwrap(), ExportConfig::default());
    }

    #[test]
    fn test_invalid_mappings() {
        for json in ["not json", r#"{"js": "./core"}"#, r#"{"./js": "core"}"#, r#"{"./js": 1}"#] {
            let args = GenerateArgs { mappings: Some(json.to_string()), ..Default::default() };
            let err = cli_overrides(&args).unwrap_err();
            assert!(
                matches!(err.downcast_ref::<GenerateError>(), Some(GenerateError::Config(_))),
                "{json}"
            );
        }
    }

    #[test]
    fn test_empty_pattern_list_rejected() {
        let args = GenerateArgs { exclude: Some(Vec::new()), ..Default::default() };
        assert!(cli_overrides(&args).is_err());
    }

    #[test]
    fn test_generator_and_scanner_options() {
        let options = generator_options(&ExportConfig::default());
        assert!(options.dual_format);
        assert!(options.export_priorities.is_empty());

        let options = generator_options(&ExportConfig { dual_format: Some(false), ..Default::default() });
        assert!(!options.dual_format);

        let args = GenerateArgs { precise: true, no_fallback: true, ..Default::default() };
        let scanner = scanner_options(&args);
        assert_eq!(scanner.mode, ScanMode::Precise);
        assert!(!scanner.fallback_to_fast);
        assert_eq!(scanner_options(&GenerateArgs::default()).mode, ScanMode::Fast);
    }

    #[test]
    fn test_parse_args() {
        let args = GenerateArgs::try_parse_from([
            "generate", "-p", "core", "--dry-run", "--include", "core", "presets", "--no-dual-format",
        ])
        .unwrap();
        assert_eq!(args.package.as_deref(), Some("core"));
        assert!(args.dry_run && args.no_dual_format);
        assert_eq!(args.include, strings(&["core", "presets"]));

        assert!(GenerateArgs::try_parse_from(["generate", "--no-fallback"]).is_err());
    }
}
